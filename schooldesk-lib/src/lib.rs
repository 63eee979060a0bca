//! School administration table engine
//!
//! Loads record collections (students, teachers, payments, ...) from a
//! PostgREST-style RPC backend or an in-memory fixture, and derives the rows
//! a table screen shows: filtered, searched, sorted and paginated, with a
//! selection that bulk actions apply to.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod response;
pub mod source;
pub mod view;

pub use response::CacheStatus;
pub use response::Response;

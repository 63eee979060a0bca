//! Error types

mod api;
mod auth;
mod bulk;
mod config;
mod field;

pub use api::*;
pub use auth::*;
pub use bulk::*;
pub use config::*;
pub use field::*;

/// Umbrella error returned by data sources, caches and the view controller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Credentials could not be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A row or record did not have the expected shape.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A bulk action was refused before reaching the backend.
    #[error(transparent)]
    Bulk(#[from] BulkError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Cached bytes could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Cache(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if retrying the same call could succeed.
    ///
    /// Only transport-level failures qualify; validation and shape errors
    /// will fail again with the same input.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_retryable(),
            _ => false,
        }
    }
}

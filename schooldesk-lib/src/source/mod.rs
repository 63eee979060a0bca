//! Data source adapters
//!
//! Everything the view knows about the backend goes through [`DataSource`]:
//! full record collections, reference lookup tables, and bulk mutations.
//!
//! # Adapters
//!
//! - [`RpcSource`] - PostgREST-style RPC functions over HTTP
//! - [`MemorySource`] - in-memory tables, loadable from a JSON fixture
//! - [`CachedSource`] - wraps any source with a [`ViewCache`](crate::cache::ViewCache)
//!
//! Paged backends implement [`PagedSource`] and get `fetch_all` for free by
//! draining [`Pages`].

mod cached;
mod memory;
mod pages;
mod retry;
mod rpc;

pub use cached::CachedSource;
pub use memory::MemorySource;
pub use pages::Pages;
pub use retry::RetryConfig;
pub use rpc::ReferenceFunction;
pub use rpc::RpcConfig;
pub use rpc::RpcSource;

use async_trait::async_trait;
use serde_json::Map;

use crate::cache::CacheKey;
use crate::error::Error;
use crate::model::Record;
use crate::model::RecordId;
use crate::model::ReferenceCollection;
use crate::model::ReferenceKind;
use crate::view::BulkAction;

/// Parameters of a collection fetch.
///
/// `table` names the logical collection (`students`, `payments`, ...);
/// `filters` are passed through to the backend untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchParams {
    pub table: String,
    pub filters: Map<String, serde_json::Value>,
}

impl FetchParams {
    /// Fetch every row of a table.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Map::new(),
        }
    }

    /// Adds a backend filter parameter (builder pattern).
    pub fn filter(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    /// The cache key for the collection these parameters produce.
    pub fn cache_key(&self) -> CacheKey {
        if self.filters.is_empty() {
            CacheKey::records(self.table.clone())
        } else {
            let filters = serde_json::Value::Object(self.filters.clone());
            CacheKey::records(format!("{}?{}", self.table, filters))
        }
    }
}

/// One network page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

/// A backend the view can read from and write to.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetches the complete collection. Implementations must never resolve
    /// with a partial collection.
    async fn fetch_all(&self, params: &FetchParams) -> Result<Vec<Record>, Error>;

    /// Fetches a reference lookup table.
    async fn fetch_reference(&self, kind: &ReferenceKind) -> Result<ReferenceCollection, Error>;

    /// Applies a bulk action to every id, all or nothing.
    async fn mutate(&self, action: &BulkAction, ids: &[RecordId]) -> Result<(), Error>;
}

/// A backend that serves collections in capped pages.
#[async_trait]
pub trait PagedSource: Send + Sync {
    /// The largest page the backend returns.
    fn page_size(&self) -> usize;

    /// Fetches one page at an offset.
    async fn fetch_page(&self, params: &FetchParams, page: PageRequest)
    -> Result<Vec<Record>, Error>;
}

//! Read-through cache in front of a data source

use std::sync::Arc;

use log::debug;

use super::DataSource;
use super::FetchParams;
use crate::cache::CacheKey;
use crate::cache::ViewCache;
use crate::error::Error;
use crate::model::Record;
use crate::model::RecordId;
use crate::model::ReferenceCollection;
use crate::model::ReferenceKind;
use crate::response::Response;
use crate::view::BulkAction;

/// A data source paired with the cache its view owns.
///
/// Reads are served from the cache when a live entry exists and written
/// back after a fresh fetch. Nothing is invalidated implicitly; callers
/// invalidate after mutations.
#[derive(Clone)]
pub struct CachedSource {
    source: Arc<dyn DataSource>,
    cache: ViewCache,
}

impl CachedSource {
    /// Wraps a source with a cache.
    pub fn new(source: impl DataSource + 'static, cache: ViewCache) -> Self {
        Self {
            source: Arc::new(source),
            cache,
        }
    }

    /// Wraps an already shared source.
    pub fn from_arc(source: Arc<dyn DataSource>, cache: ViewCache) -> Self {
        Self { source, cache }
    }

    /// Returns the cache.
    pub fn cache(&self) -> &ViewCache {
        &self.cache
    }

    /// Returns the underlying source.
    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Fetches a full record collection, from cache when possible.
    pub async fn records(&self, params: &FetchParams) -> Result<Response<Vec<Record>>, Error> {
        let key = params.cache_key();
        if let Some(hit) = self.cache.get_with_meta::<Vec<Record>>(&key).await? {
            debug!("cache hit for {}", key);
            return Ok(Response::cache_hit(hit.data, hit.created_at, hit.expires_at));
        }

        debug!("cache miss for {}", key);
        let records = self.source.fetch_all(params).await?;
        self.store(&key, records).await
    }

    /// Fetches a reference collection, from cache when possible.
    pub async fn reference(
        &self,
        kind: &ReferenceKind,
    ) -> Result<Response<ReferenceCollection>, Error> {
        let key = CacheKey::reference(kind.clone());
        if let Some(hit) = self.cache.get_with_meta::<ReferenceCollection>(&key).await? {
            return Ok(Response::cache_hit(hit.data, hit.created_at, hit.expires_at));
        }

        let collection = self.source.fetch_reference(kind).await?;
        self.store(&key, collection).await
    }

    /// Forwards a mutation to the source. The cache is left untouched.
    pub async fn mutate(&self, action: &BulkAction, ids: &[RecordId]) -> Result<(), Error> {
        self.source.mutate(action, ids).await
    }

    /// Drops the cached collection for these parameters.
    pub async fn invalidate_records(&self, params: &FetchParams) {
        self.cache.invalidate(&params.cache_key()).await;
    }

    /// Drops a cached reference collection.
    pub async fn invalidate_reference(&self, kind: &ReferenceKind) {
        self.cache.invalidate(&CacheKey::reference(kind.clone())).await;
    }

    async fn store<T: serde::Serialize + Sync>(
        &self,
        key: &CacheKey,
        data: T,
    ) -> Result<Response<T>, Error> {
        Ok(match self.cache.set(key, &data).await? {
            Some((cached_at, expires_at)) => Response::cache_miss(data, cached_at, expires_at),
            None => Response::new(data),
        })
    }
}

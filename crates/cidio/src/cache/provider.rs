//! Cache provider trait shared by the store tiers.

use async_trait::async_trait;
use bytes::Bytes;

use crate::cache::types::{AssetMetadata, CacheLookupResult, CacheResult};

/// A tier that can store and retrieve cached assets keyed by URL
#[async_trait]
pub trait AssetCacheProvider: Send + Sync {
    /// Check whether an entry exists for the given URL
    async fn contains(&self, url: &str) -> CacheResult<bool>;

    /// Get an entry from the cache
    async fn get(&self, url: &str) -> CacheLookupResult;

    /// Put an entry into the cache, replacing any previous body for the URL
    async fn put(&self, metadata: AssetMetadata, data: Bytes) -> CacheResult<()>;

    /// Remove an entry from the cache
    async fn remove(&self, url: &str) -> CacheResult<()>;

    /// Clear all entries
    async fn clear(&self) -> CacheResult<()>;
}

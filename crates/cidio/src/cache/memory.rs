//! In-memory cache tier built on Moka.

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use tracing::{debug, warn};

use crate::cache::provider::AssetCacheProvider;
use crate::cache::types::{AssetMetadata, CacheLookupResult, CacheResult};

#[derive(Clone)]
struct MemoryEntry {
    data: Bytes,
    metadata: AssetMetadata,
}

/// Byte-weighted memory front over the disk tier.
///
/// Media assets are treated as immutable once published, so entries carry
/// no TTL; Moka's size-based admission and eviction bound the footprint. A
/// zero budget effectively disables the tier.
#[derive(Clone)]
pub struct MemoryCache {
    cache: MokaCache<String, MemoryEntry>,
    max_size: u64,
}

impl MemoryCache {
    /// Create a new memory cache with the specified byte budget
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            .weigher(|_k, v: &MemoryEntry| v.data.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(max_size_bytes)
            .build();

        debug!(max_size = max_size_bytes, "Memory cache created");

        Self {
            cache,
            max_size: max_size_bytes,
        }
    }
}

#[async_trait::async_trait]
impl AssetCacheProvider for MemoryCache {
    async fn contains(&self, url: &str) -> CacheResult<bool> {
        Ok(self.cache.contains_key(url))
    }

    async fn get(&self, url: &str) -> CacheLookupResult {
        if let Some(entry) = self.cache.get(url).await {
            return Ok(Some((entry.data, entry.metadata)));
        }
        Ok(None)
    }

    async fn put(&self, metadata: AssetMetadata, data: Bytes) -> CacheResult<()> {
        // A single entry larger than the whole tier can never be admitted
        if data.len() as u64 > self.max_size {
            warn!(
                url = metadata.url.as_str(),
                size = data.len(),
                max_size = self.max_size,
                "Entry too large for memory cache, skipping"
            );
            return Ok(());
        }

        let url = metadata.url.clone();
        self.cache.insert(url, MemoryEntry { data, metadata }).await;
        Ok(())
    }

    async fn remove(&self, url: &str) -> CacheResult<()> {
        self.cache.invalidate(url).await;
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.cache.invalidate_all();
        debug!("Memory cache cleared");
        Ok(())
    }
}

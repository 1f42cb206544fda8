//! Two-tier asset store coordinating the memory front and the disk tier.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io;

use crate::DeliveryConfig;
use crate::cache::disk::{DiskCache, DiskEntry};
use crate::cache::memory::MemoryCache;
use crate::cache::provider::AssetCacheProvider;
use crate::cache::types::{
    AssetMetadata, CacheLookupResult, CacheResult, CacheStatsReport, HostStats,
};

/// The persistent cache store, owned exclusively by the cache worker.
///
/// Reads check the memory front first; disk hits are promoted into memory
/// for the next access. Writes land in both tiers. Enumeration, size
/// accounting and statistics come from the disk tier, which is the source
/// of truth.
#[derive(Clone)]
pub struct AssetStore {
    memory: Arc<MemoryCache>,
    disk: Arc<DiskCache>,
}

impl AssetStore {
    /// Open the store for the given configuration, creating the backing
    /// directory if needed. Without an explicit `cache_dir` the store lives
    /// under the system temp directory, named after the cache.
    pub async fn open(config: &DeliveryConfig) -> io::Result<Self> {
        let root = config
            .cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(&config.cache_name));

        let disk = DiskCache::new(root);
        disk.ensure_initialized().await?;

        Ok(Self {
            memory: Arc::new(MemoryCache::new(config.max_memory_cache_size)),
            disk: Arc::new(disk),
        })
    }

    /// Get an entry, memory tier first.
    pub async fn get(&self, url: &str) -> CacheLookupResult {
        if let Some((data, metadata)) = self.memory.get(url).await? {
            return Ok(Some((data, metadata)));
        }

        if let Some((data, metadata)) = self.disk.get(url).await? {
            // Promote for faster access next time
            let _ = self.memory.put(metadata.clone(), data.clone()).await;
            return Ok(Some((data, metadata)));
        }

        Ok(None)
    }

    /// Store an entry in both tiers.
    pub async fn put(&self, metadata: AssetMetadata, data: Bytes) -> CacheResult<()> {
        let _ = self.memory.put(metadata.clone(), data.clone()).await;
        self.disk.put(metadata, data).await
    }

    /// Remove an entry from both tiers.
    pub async fn remove(&self, url: &str) -> CacheResult<()> {
        let memory_result = self.memory.remove(url).await;
        let disk_result = self.disk.remove(url).await;

        disk_result.or(memory_result)
    }

    /// Clear both tiers.
    pub async fn clear(&self) -> CacheResult<()> {
        let memory_result = self.memory.clear().await;
        let disk_result = self.disk.clear().await;

        disk_result.or(memory_result)
    }

    /// Check whether an entry exists in either tier.
    pub async fn contains(&self, url: &str) -> CacheResult<bool> {
        if self.memory.contains(url).await? {
            return Ok(true);
        }
        self.disk.contains(url).await
    }

    /// Enumerate the persisted entries.
    pub async fn entries(&self) -> CacheResult<Vec<DiskEntry>> {
        self.disk.entries().await
    }

    /// Actual bytes held by the persistent tier.
    pub async fn total_size(&self) -> CacheResult<u64> {
        self.disk.total_size().await
    }

    /// Aggregate statistics over the persisted entries, grouped by host.
    pub async fn stats(&self, cache_name: &str) -> CacheResult<CacheStatsReport> {
        let entries = self.disk.entries().await?;

        let mut hosts: BTreeMap<String, HostStats> = BTreeMap::new();
        let mut total_size = 0u64;
        for entry in &entries {
            let host_entry = hosts.entry(entry.metadata.host()).or_default();
            host_entry.count += 1;
            host_entry.size += entry.metadata.size;
            total_size += entry.metadata.size;
        }

        Ok(CacheStatsReport {
            cache_name: cache_name.to_string(),
            entry_count: entries.len() as u64,
            total_size,
            hosts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(dir: &std::path::Path) -> AssetStore {
        let config = DeliveryConfig::builder()
            .with_cache_dir(dir.to_path_buf())
            .build();
        AssetStore::open(&config).await.unwrap()
    }

    fn metadata(url: &str, size: u64) -> AssetMetadata {
        AssetMetadata::new(url, size, Some("audio/mpeg".to_string()))
    }

    #[tokio::test]
    async fn disk_hits_are_promoted_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;

        store
            .put(metadata("https://a.example/x.mp3", 4), Bytes::from_static(b"data"))
            .await
            .unwrap();

        // Fresh store over the same directory: memory tier is cold
        let reopened = AssetStore {
            memory: Arc::new(MemoryCache::new(1024)),
            disk: store.disk.clone(),
        };
        assert!(!reopened.memory.contains("https://a.example/x.mp3").await.unwrap());

        let (body, _) = reopened
            .get("https://a.example/x.mp3")
            .await
            .unwrap()
            .expect("entry should be present");
        assert_eq!(body, Bytes::from_static(b"data"));
    }

    #[tokio::test]
    async fn stats_aggregate_by_host() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;

        store
            .put(metadata("https://a.example/1.mp3", 10), Bytes::from_static(b"x"))
            .await
            .unwrap();
        store
            .put(metadata("https://a.example/2.mp3", 20), Bytes::from_static(b"y"))
            .await
            .unwrap();
        store
            .put(metadata("https://b.example/3.mp4", 30), Bytes::from_static(b"z"))
            .await
            .unwrap();

        let stats = store.stats("test-cache").await.unwrap();
        assert_eq!(stats.cache_name, "test-cache");
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.total_size, 60);
        assert_eq!(stats.hosts["a.example"], HostStats { count: 2, size: 30 });
        assert_eq!(stats.hosts["b.example"], HostStats { count: 1, size: 30 });
    }

    #[tokio::test]
    async fn clear_empties_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;

        store
            .put(metadata("https://a.example/x.mp3", 4), Bytes::from_static(b"data"))
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert!(!store.contains("https://a.example/x.mp3").await.unwrap());
        assert!(store.entries().await.unwrap().is_empty());
    }
}

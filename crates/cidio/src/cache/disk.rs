//! Disk cache tier: one body file plus a `.meta` JSON sidecar per entry,
//! named by the SHA-256 of the entry URL. This is the tier that survives
//! restarts and the only one that supports enumeration.

use std::path::PathBuf;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use crate::cache::provider::AssetCacheProvider;
use crate::cache::types::{AssetMetadata, CacheLookupResult, CacheResult};

/// Filename-safe identifier for a cache key.
fn filename_for(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// A disk-tier entry as seen by enumeration: the persisted metadata plus
/// the actual byte count of the stored body.
#[derive(Debug, Clone)]
pub struct DiskEntry {
    pub metadata: AssetMetadata,
    pub bytes_on_disk: u64,
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    initialized: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl DiskCache {
    /// Create a new disk cache rooted at the specified directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            initialized: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    /// Initialize the cache directory
    pub(crate) async fn ensure_initialized(&self) -> io::Result<()> {
        use std::sync::atomic::Ordering;

        // Fast path - already initialized
        if self.initialized.load(Ordering::Relaxed) {
            return Ok(());
        }

        // Use compare_exchange to ensure only one task initializes
        if self
            .initialized
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            fs::create_dir_all(&self.root).await?;
            self.initialized.store(true, Ordering::Release);
        } else {
            // Another task is initializing, wait for it to complete
            while !self.initialized.load(Ordering::Acquire) {
                tokio::task::yield_now().await;
            }
        }

        Ok(())
    }

    fn body_path(&self, url: &str) -> PathBuf {
        self.root.join(filename_for(url))
    }

    fn meta_path(&self, url: &str) -> PathBuf {
        let mut path = self.body_path(url);
        path.set_extension("meta");
        path
    }

    /// Enumerate every complete entry on disk. Entries whose sidecar no
    /// longer parses are dropped from the listing and cleaned up in the
    /// background.
    pub async fn entries(&self) -> CacheResult<Vec<DiskEntry>> {
        self.ensure_initialized().await?;

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;

        while let Some(dirent) = dir.next_entry().await? {
            let meta_path = dirent.path();
            if meta_path.extension().and_then(|ext| ext.to_str()) != Some("meta") {
                continue;
            }

            let metadata: AssetMetadata = match fs::read(&meta_path).await {
                Ok(raw) => match serde_json::from_slice(&raw) {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!(path = %meta_path.display(), error = %e, "Dropping corrupt cache sidecar");
                        self.cleanup_pair(meta_path.with_extension(""), meta_path.clone());
                        continue;
                    }
                },
                Err(e) => {
                    warn!(path = %meta_path.display(), error = %e, "Failed to read cache sidecar");
                    continue;
                }
            };

            let body_path = meta_path.with_extension("");
            let bytes_on_disk = match fs::metadata(&body_path).await {
                Ok(stat) => stat.len(),
                // Sidecar without a body is an interrupted write
                Err(_) => {
                    self.cleanup_pair(body_path, meta_path);
                    continue;
                }
            };

            entries.push(DiskEntry {
                metadata,
                bytes_on_disk,
            });
        }

        Ok(entries)
    }

    /// Actual bytes held by the tier.
    pub async fn total_size(&self) -> CacheResult<u64> {
        let entries = self.entries().await?;
        Ok(entries.iter().map(|e| e.bytes_on_disk).sum())
    }

    /// Delete an invalid entry pair off the hot path.
    fn cleanup_pair(&self, body_path: PathBuf, meta_path: PathBuf) {
        tokio::spawn(async move {
            let _ = fs::remove_file(&body_path).await;
            let _ = fs::remove_file(&meta_path).await;
        });
    }
}

#[async_trait::async_trait]
impl AssetCacheProvider for DiskCache {
    async fn contains(&self, url: &str) -> CacheResult<bool> {
        self.ensure_initialized().await?;

        let body_exists = fs::try_exists(self.body_path(url)).await?;
        let meta_exists = fs::try_exists(self.meta_path(url)).await?;

        Ok(body_exists && meta_exists)
    }

    async fn get(&self, url: &str) -> CacheLookupResult {
        self.ensure_initialized().await?;

        let meta_path = self.meta_path(url);
        let raw = match fs::read(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!(path = %meta_path.display(), error = %e, "Failed to read cache sidecar");
                return Ok(None);
            }
        };

        let metadata: AssetMetadata = match serde_json::from_slice(&raw) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %meta_path.display(), error = %e, "Dropping corrupt cache sidecar");
                self.cleanup_pair(self.body_path(url), meta_path);
                return Ok(None);
            }
        };

        let body_path = self.body_path(url);
        match fs::read(&body_path).await {
            Ok(body) => Ok(Some((Bytes::from(body), metadata))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(path = %body_path.display(), error = %e, "Failed to read cached body");
                Ok(None)
            }
        }
    }

    async fn put(&self, metadata: AssetMetadata, data: Bytes) -> CacheResult<()> {
        self.ensure_initialized().await?;

        let raw = serde_json::to_vec(&metadata)
            .map_err(|e| io::Error::other(format!("failed to encode cache sidecar: {e}")))?;

        // Body first, sidecar last: a sidecar on disk marks a complete entry
        fs::write(self.body_path(&metadata.url), &data).await?;
        fs::write(self.meta_path(&metadata.url), raw).await?;

        debug!(url = metadata.url.as_str(), bytes = data.len(), "Asset persisted to disk cache");
        Ok(())
    }

    async fn remove(&self, url: &str) -> CacheResult<()> {
        self.ensure_initialized().await?;

        for path in [self.body_path(url), self.meta_path(url)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.ensure_initialized().await?;

        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(dirent) = dir.next_entry().await? {
            if dirent.file_type().await?.is_file() {
                fs::remove_file(dirent.path()).await?;
            }
        }

        debug!("Disk cache cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(url: &str, size: u64) -> AssetMetadata {
        AssetMetadata::new(url, size, Some("audio/mpeg".to_string()))
    }

    #[tokio::test]
    async fn put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf());
        let data = Bytes::from_static(b"persistent bytes");

        cache
            .put(metadata("https://a.example/x.mp3", 16), data.clone())
            .await
            .unwrap();

        let (body, meta) = cache
            .get("https://a.example/x.mp3")
            .await
            .unwrap()
            .expect("entry should be present");
        assert_eq!(body, data);
        assert_eq!(meta.url, "https://a.example/x.mp3");
        assert_eq!(meta.size, 16);
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = DiskCache::new(dir.path().to_path_buf());
            cache
                .put(metadata("https://a.example/x.mp3", 5), Bytes::from_static(b"01234"))
                .await
                .unwrap();
        }

        let reopened = DiskCache::new(dir.path().to_path_buf());
        assert!(reopened.contains("https://a.example/x.mp3").await.unwrap());

        let entries = reopened.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metadata.url, "https://a.example/x.mp3");
        assert_eq!(entries[0].bytes_on_disk, 5);
    }

    #[tokio::test]
    async fn enumeration_and_total_size() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf());

        cache
            .put(metadata("https://a.example/1.mp3", 3), Bytes::from_static(b"abc"))
            .await
            .unwrap();
        cache
            .put(metadata("https://a.example/2.mp3", 5), Bytes::from_static(b"abcde"))
            .await
            .unwrap();

        let entries = cache.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(cache.total_size().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn corrupt_sidecar_is_dropped_from_listing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf());

        cache
            .put(metadata("https://a.example/ok.mp3", 2), Bytes::from_static(b"ok"))
            .await
            .unwrap();
        cache
            .put(metadata("https://a.example/bad.mp3", 3), Bytes::from_static(b"bad"))
            .await
            .unwrap();
        std::fs::write(cache.meta_path("https://a.example/bad.mp3"), "{oops").unwrap();

        let entries = cache.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metadata.url, "https://a.example/ok.mp3");

        assert!(cache.get("https://a.example/bad.mp3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf());

        cache
            .put(metadata("https://a.example/1.mp3", 1), Bytes::from_static(b"a"))
            .await
            .unwrap();
        cache
            .put(metadata("https://a.example/2.mp3", 1), Bytes::from_static(b"b"))
            .await
            .unwrap();

        cache.remove("https://a.example/1.mp3").await.unwrap();
        assert!(!cache.contains("https://a.example/1.mp3").await.unwrap());

        // Removing an absent entry is not an error
        cache.remove("https://a.example/1.mp3").await.unwrap();

        cache.clear().await.unwrap();
        assert!(cache.entries().await.unwrap().is_empty());
        assert_eq!(cache.total_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn overwrite_keeps_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf());

        cache
            .put(metadata("https://a.example/x.mp3", 3), Bytes::from_static(b"old"))
            .await
            .unwrap();
        cache
            .put(
                metadata("https://a.example/x.mp3", 7),
                Bytes::from_static(b"newbody"),
            )
            .await
            .unwrap();

        let entries = cache.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].bytes_on_disk, 7);

        let (body, _) = cache
            .get("https://a.example/x.mp3")
            .await
            .unwrap()
            .expect("entry should be present");
        assert_eq!(body, Bytes::from_static(b"newbody"));
    }
}

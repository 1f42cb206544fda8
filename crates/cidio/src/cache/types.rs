//! Common types used across the caching system.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Classification of a cached asset, derived from its path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Audio,
    Video,
    Other,
}

const AUDIO_EXTENSIONS: [&str; 5] = [".mp3", ".flac", ".wav", ".m4a", ".ogg"];
const VIDEO_EXTENSIONS: [&str; 3] = [".mp4", ".webm", ".mov"];

impl AssetKind {
    pub fn from_path(path: &str) -> Self {
        let path = path.to_ascii_lowercase();
        if AUDIO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            Self::Audio
        } else if VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            Self::Video
        } else {
            Self::Other
        }
    }
}

/// Metadata persisted alongside each cached asset body.
///
/// An entry is never mutated in place: re-fetching the same URL overwrites
/// the stored body and metadata, but the entry identity (the URL) is
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// The stable request key
    pub url: String,
    /// Derived from the response content-length header, 0 when absent
    pub size: u64,
    /// Content type of the response, if advertised
    pub content_type: Option<String>,
    /// When the asset was stored, seconds since the epoch
    pub cached_at: u64,
}

impl AssetMetadata {
    pub fn new(url: impl Into<String>, size: u64, content_type: Option<String>) -> Self {
        Self {
            url: url.into(),
            size,
            content_type,
            cached_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    /// Hostname of the asset's origin, empty when the URL does not parse.
    pub fn host(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
            .unwrap_or_default()
    }

    pub fn kind(&self) -> AssetKind {
        match Url::parse(&self.url) {
            Ok(url) => AssetKind::from_path(url.path()),
            Err(_) => AssetKind::from_path(&self.url),
        }
    }
}

/// One row of a `cache_list` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub size: u64,
    pub host: String,
    pub kind: AssetKind,
}

impl From<&AssetMetadata> for CacheEntry {
    fn from(metadata: &AssetMetadata) -> Self {
        Self {
            url: metadata.url.clone(),
            size: metadata.size,
            host: metadata.host(),
            kind: metadata.kind(),
        }
    }
}

/// Per-host aggregate within a stats report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    pub count: u64,
    pub size: u64,
}

/// Aggregate statistics over the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub cache_name: String,
    pub entry_count: u64,
    pub total_size: u64,
    pub hosts: BTreeMap<String, HostStats>,
}

/// Result of a cache operation
pub type CacheResult<T> = std::result::Result<T, std::io::Error>;

/// A type representing the result of a cache lookup operation
pub type CacheLookupResult = CacheResult<Option<(Bytes, AssetMetadata)>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification_by_extension() {
        assert_eq!(AssetKind::from_path("/music/track.mp3"), AssetKind::Audio);
        assert_eq!(AssetKind::from_path("/music/TRACK.FLAC"), AssetKind::Audio);
        assert_eq!(AssetKind::from_path("/clips/video.mp4"), AssetKind::Video);
        assert_eq!(AssetKind::from_path("/page/index.html"), AssetKind::Other);
    }

    #[test]
    fn metadata_extracts_host_and_kind() {
        let metadata = AssetMetadata::new("https://assets.example.com/a/song.ogg", 42, None);
        assert_eq!(metadata.host(), "assets.example.com");
        assert_eq!(metadata.kind(), AssetKind::Audio);

        let entry = CacheEntry::from(&metadata);
        assert_eq!(entry.url, "https://assets.example.com/a/song.ogg");
        assert_eq!(entry.size, 42);
        assert_eq!(entry.host, "assets.example.com");
        assert_eq!(entry.kind, AssetKind::Audio);
    }
}

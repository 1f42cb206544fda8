//! Wire shapes for the cache command protocol.
//!
//! Every message is a JSON-serializable object with a mandatory `type`
//! discriminant. The command and response sets are closed sum types; an
//! unrecognized command tag lands in [`CacheCommand::Unknown`] and is
//! answered with `cache_error` instead of being silently dropped.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, CacheStatsReport};

/// Correlates a request with its reply across the message channel.
///
/// Ids are allocated by the sending handle; the worker echoes them back
/// unchanged, so concurrent commands of the same type can never
/// cross-deliver, even across multiple foreground contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub id: u64,
    #[serde(flatten)]
    pub payload: T,
}

/// Commands flowing from a foreground context to the cache worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheCommand {
    /// List every cached entry
    ListCache,
    /// Drop the entire store
    ClearCache,
    /// Drop a single entry by URL
    DeleteCacheItem { url: String },
    /// Trigger a size audit; produces no reply
    CheckCacheSize,
    /// Aggregate statistics over the store
    GetCacheStats,
    /// Worker version and effective interception configuration
    GetWorkerStatus,
    /// Fallback for unrecognized `type` tags
    #[serde(other)]
    Unknown,
}

/// Replies flowing from the cache worker back to the requesting context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheResponse {
    CacheList { payload: Vec<CacheEntry> },
    CacheCleared,
    CacheItemDeleted { url: String },
    CacheStats { stats: CacheStatsReport },
    WorkerStatus { status: WorkerStatusReport },
    /// A handler-level failure, carrying a human-readable description
    CacheError { error: String },
}

/// Payload of a `worker_status` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatusReport {
    pub version: String,
    pub cache_name: String,
    pub external_hosts: Vec<String>,
    pub cacheable_extensions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AssetKind;

    #[test]
    fn commands_serialize_with_type_tags() {
        let raw = serde_json::to_value(&CacheCommand::ListCache).unwrap();
        assert_eq!(raw["type"], "list_cache");

        let raw = serde_json::to_value(&CacheCommand::DeleteCacheItem {
            url: "https://a.example/x.mp3".to_string(),
        })
        .unwrap();
        assert_eq!(raw["type"], "delete_cache_item");
        assert_eq!(raw["url"], "https://a.example/x.mp3");
    }

    #[test]
    fn unknown_command_tag_falls_back() {
        let command: CacheCommand =
            serde_json::from_str(r#"{"type":"frobnicate_cache"}"#).unwrap();
        assert_eq!(command, CacheCommand::Unknown);
    }

    #[test]
    fn envelope_carries_id_next_to_type_tag() {
        let envelope = Envelope {
            id: 17,
            payload: CacheCommand::ClearCache,
        };

        let raw = serde_json::to_value(&envelope).unwrap();
        assert_eq!(raw["id"], 17);
        assert_eq!(raw["type"], "clear_cache");

        let parsed: Envelope<CacheCommand> = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn responses_round_trip() {
        let response = CacheResponse::CacheList {
            payload: vec![CacheEntry {
                url: "https://a.example/x.mp3".to_string(),
                size: 42,
                host: "a.example".to_string(),
                kind: AssetKind::Audio,
            }],
        };

        let raw = serde_json::to_string(&response).unwrap();
        let parsed: CacheResponse = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, response);

        let raw = serde_json::to_value(&CacheResponse::CacheCleared).unwrap();
        assert_eq!(raw["type"], "cache_cleared");

        let raw = serde_json::to_value(&CacheResponse::CacheError {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(raw["type"], "cache_error");
        assert_eq!(raw["error"], "boom");
    }
}

//! Persistence for the user gateway list.
//!
//! The persisted shape is a single JSON array of strings under a fixed
//! storage location. The list is validated on write by the registry, never
//! re-checked on read, so nothing else should mutate the stored value.

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::warn;

/// Default file name for the file-backed store.
pub const USER_GATEWAYS_FILE: &str = "user_ipfs_gateways.json";

/// Storage seam for the user gateway list.
///
/// `load` never fails: corrupt or missing data reads as "no data".
/// `save`/`clear` report failures to the caller, which logs and continues;
/// persistence is best-effort and the in-memory list stays authoritative
/// for the session.
pub trait GatewayStore: Send + Sync {
    fn load(&self) -> Vec<String>;

    /// Persist the full list, replacing whatever was stored before.
    fn save(&self, gateways: &[String]) -> io::Result<()>;

    /// Remove the persisted list entirely. Idempotent.
    fn clear(&self) -> io::Result<()>;
}

/// File-backed store holding the list as a JSON array of strings.
#[derive(Debug, Clone)]
pub struct FileGatewayStore {
    path: PathBuf,
}

impl FileGatewayStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under `dir` using the default file name.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(USER_GATEWAYS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GatewayStore for FileGatewayStore {
    fn load(&self) -> Vec<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read gateway list");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(gateways) => gateways,
            Err(e) => {
                // Corrupt JSON is "no data", not an error
                warn!(path = %self.path.display(), error = %e, "Stored gateway list is corrupt, ignoring");
                Vec::new()
            }
        }
    }

    fn save(&self, gateways: &[String]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(gateways)
            .map_err(|e| io::Error::other(format!("failed to encode gateway list: {e}")))?;
        std::fs::write(&self.path, raw)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryGatewayStore {
    inner: Mutex<Vec<String>>,
}

impl MemoryGatewayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GatewayStore for MemoryGatewayStore {
    fn load(&self) -> Vec<String> {
        self.inner.lock().clone()
    }

    fn save(&self, gateways: &[String]) -> io::Result<()> {
        *self.inner.lock() = gateways.to_vec();
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        self.inner.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGatewayStore::in_dir(dir.path());
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_json_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGatewayStore::in_dir(dir.path());
        std::fs::write(store.path(), "{not json!").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn wrong_shape_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGatewayStore::in_dir(dir.path());
        std::fs::write(store.path(), r#"{"gateways": []}"#).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGatewayStore::in_dir(dir.path());
        let gateways = vec![
            "https://a.example/ipfs/".to_string(),
            "https://b.example/ipfs/".to_string(),
        ];

        store.save(&gateways).unwrap();
        assert_eq!(store.load(), gateways);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGatewayStore::in_dir(dir.path());
        store.save(&["https://a.example/ipfs/".to_string()]).unwrap();

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());
    }
}

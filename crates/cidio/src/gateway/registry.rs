//! # Gateway Registry
//!
//! Holds the ordered, deduplicated list of candidate gateway origins:
//! user-added gateways (validated, persisted on every mutation) followed by
//! system gateways fetched once per registry lifetime from a configuration
//! endpoint, with a built-in fallback list when that fetch fails.

use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

use super::store::GatewayStore;

/// Required path suffix for every gateway URL.
pub const GATEWAY_PATH_SUFFIX: &str = "/ipfs/";

/// Well-known public gateways used when the configuration endpoint is
/// unavailable or returns nothing usable.
pub const FALLBACK_GATEWAYS: [&str; 3] = [
    "https://ipfs.io/ipfs/",
    "https://gateway.pinata.cloud/ipfs/",
    "https://cf-ipfs.com/ipfs/",
];

/// Why a candidate gateway URL was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GatewayValidationError {
    #[error("gateway URL must not be empty")]
    EmptyInput,

    #[error("gateway URL is not a valid absolute URL")]
    InvalidUrl,

    #[error("gateway URL must end with /ipfs/")]
    MissingSuffix,

    #[error("gateway is already registered")]
    Duplicate,
}

/// Registry of candidate gateways, ordered by priority.
///
/// The effective candidate order is the user list followed by the system
/// list, deduplicated with the first occurrence winning, so user gateways
/// always take precedence over system-provided ones.
pub struct GatewayRegistry {
    store: Box<dyn GatewayStore>,
    user: Vec<String>,
    system: OnceCell<Vec<String>>,
    client: Client,
    config_endpoint: String,
}

impl GatewayRegistry {
    /// Create a registry backed by the given store, loading whatever user
    /// list it currently holds.
    pub fn new(
        store: Box<dyn GatewayStore>,
        client: Client,
        config_endpoint: impl Into<String>,
    ) -> Self {
        let user = store.load();
        Self {
            store,
            user,
            system: OnceCell::new(),
            client,
            config_endpoint: config_endpoint.into(),
        }
    }

    /// The user-added gateways in priority order.
    pub fn user_gateways(&self) -> &[String] {
        &self.user
    }

    /// Validate and append a gateway to the user list.
    ///
    /// Validation order: non-empty after trimming, absolute URL, `/ipfs/`
    /// suffix, not already present (exact string match). A new gateway lands
    /// at the end of the user list and the list is persisted immediately.
    pub fn add_gateway(&mut self, candidate: &str) -> Result<(), GatewayValidationError> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(GatewayValidationError::EmptyInput);
        }

        if Url::parse(candidate).is_err() {
            return Err(GatewayValidationError::InvalidUrl);
        }

        if !candidate.ends_with(GATEWAY_PATH_SUFFIX) {
            return Err(GatewayValidationError::MissingSuffix);
        }

        if self.user.iter().any(|g| g == candidate) {
            return Err(GatewayValidationError::Duplicate);
        }

        self.user.push(candidate.to_string());
        self.persist();
        debug!(gateway = candidate, "User gateway added");
        Ok(())
    }

    /// Remove a gateway from the user list. Returns true if it was present.
    pub fn remove_gateway(&mut self, url: &str) -> bool {
        let Some(index) = self.user.iter().position(|g| g == url) else {
            return false;
        };

        self.user.remove(index);
        self.persist();
        debug!(gateway = url, "User gateway removed");
        true
    }

    /// Remove all user gateways. Idempotent.
    pub fn clear_user_gateways(&mut self) {
        self.user.clear();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear persisted gateway list");
        }
    }

    /// The system gateways, fetched from the configuration endpoint once per
    /// registry lifetime and memoized. Any failure (transport, bad status,
    /// malformed or missing payload) yields the built-in fallback list.
    pub async fn fetch_system_gateways(&self) -> &[String] {
        self.system
            .get_or_init(|| async { self.fetch_system_uncached().await })
            .await
    }

    /// The effective candidate list: user gateways followed by system
    /// gateways, deduplicated, first occurrence winning.
    pub async fn all_gateways(&self) -> Vec<String> {
        let system = self.fetch_system_gateways().await;

        let mut all: Vec<String> = Vec::with_capacity(self.user.len() + system.len());
        for gateway in self.user.iter().chain(system.iter()) {
            if !all.contains(gateway) {
                all.push(gateway.clone());
            }
        }
        all
    }

    async fn fetch_system_uncached(&self) -> Vec<String> {
        match self.request_config_gateways().await {
            Some(gateways) if !gateways.is_empty() => {
                debug!(count = gateways.len(), "System gateways loaded from config");
                gateways
            }
            _ => {
                debug!("Config endpoint unavailable, using fallback gateways");
                FALLBACK_GATEWAYS.iter().map(|g| g.to_string()).collect()
            }
        }
    }

    /// Pull the gateway list out of the configuration payload. The payload
    /// is a JSON object whose optional `ipfs_gateways` field holds a
    /// JSON-stringified array of URL strings.
    async fn request_config_gateways(&self) -> Option<Vec<String>> {
        if self.config_endpoint.is_empty() {
            return None;
        }

        let response = match self.client.get(&self.config_endpoint).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %self.config_endpoint, error = %e, "Failed to fetch system gateways");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(endpoint = %self.config_endpoint, status = %response.status(), "Config endpoint returned an error");
            return None;
        }

        let config: serde_json::Value = match response.json().await {
            Ok(config) => config,
            Err(e) => {
                warn!(endpoint = %self.config_endpoint, error = %e, "Config payload is not valid JSON");
                return None;
            }
        };

        let raw = config.get("ipfs_gateways")?.as_str()?;
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(gateways) => Some(gateways),
            Err(e) => {
                warn!(error = %e, "ipfs_gateways field is not a JSON array of strings");
                None
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.user) {
            // Best-effort: the in-memory list stays authoritative
            warn!(error = %e, "Failed to persist user gateway list");
        }
    }

    #[cfg(test)]
    pub(crate) fn seed_system_for_tests(&self, gateways: Vec<String>) {
        self.system
            .set(gateways)
            .expect("system gateways already initialized");
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("user", &self.user)
            .field("system", &self.system.get())
            .field("config_endpoint", &self.config_endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::store::{FileGatewayStore, GatewayStore, MemoryGatewayStore};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_client() -> Client {
        use std::sync::Once;
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = rustls::crypto::ring::default_provider().install_default();
        });
        Client::new()
    }

    fn registry() -> GatewayRegistry {
        GatewayRegistry::new(Box::new(MemoryGatewayStore::new()), test_client(), "")
    }

    // Minimal one-shot HTTP responder for config endpoint tests
    async fn spawn_config_endpoint(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{addr}/api/config")
    }

    #[test]
    fn add_gateway_validates_in_order() {
        let mut registry = registry();

        assert_eq!(
            registry.add_gateway("   "),
            Err(GatewayValidationError::EmptyInput)
        );
        assert_eq!(
            registry.add_gateway("not a url"),
            Err(GatewayValidationError::InvalidUrl)
        );
        assert_eq!(
            registry.add_gateway("https://example.com/"),
            Err(GatewayValidationError::MissingSuffix)
        );

        assert_eq!(registry.add_gateway("https://example.com/ipfs/"), Ok(()));
        assert_eq!(
            registry.add_gateway("https://example.com/ipfs/"),
            Err(GatewayValidationError::Duplicate)
        );
        assert_eq!(registry.user_gateways(), ["https://example.com/ipfs/"]);
    }

    #[test]
    fn add_gateway_trims_whitespace() {
        let mut registry = registry();
        assert_eq!(registry.add_gateway("  https://a.example/ipfs/ "), Ok(()));
        assert_eq!(registry.user_gateways(), ["https://a.example/ipfs/"]);
    }

    #[test]
    fn remove_gateway_reports_presence() {
        let mut registry = registry();
        registry.add_gateway("https://a.example/ipfs/").unwrap();

        assert!(registry.remove_gateway("https://a.example/ipfs/"));
        assert!(!registry.remove_gateway("https://a.example/ipfs/"));
        assert!(registry.user_gateways().is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut registry = registry();
        registry.add_gateway("https://a.example/ipfs/").unwrap();

        registry.clear_user_gateways();
        registry.clear_user_gateways();
        assert!(registry.user_gateways().is_empty());
    }

    #[test]
    fn mutations_persist_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGatewayStore::in_dir(dir.path());

        let mut registry =
            GatewayRegistry::new(Box::new(store.clone()), test_client(), "");
        registry.add_gateway("https://a.example/ipfs/").unwrap();
        registry.add_gateway("https://b.example/ipfs/").unwrap();
        registry.remove_gateway("https://a.example/ipfs/");

        // A fresh registry over the same store sees the surviving entry
        let reloaded = GatewayRegistry::new(Box::new(store), test_client(), "");
        assert_eq!(reloaded.user_gateways(), ["https://b.example/ipfs/"]);
    }

    #[tokio::test]
    async fn all_gateways_dedups_with_user_precedence() {
        let mut registry = registry();
        registry.add_gateway("https://mine.example/ipfs/").unwrap();
        registry.add_gateway("https://shared.example/ipfs/").unwrap();
        registry.seed_system_for_tests(vec![
            "https://shared.example/ipfs/".to_string(),
            "https://system.example/ipfs/".to_string(),
        ]);

        let all = registry.all_gateways().await;
        assert_eq!(
            all,
            [
                "https://mine.example/ipfs/",
                "https://shared.example/ipfs/",
                "https://system.example/ipfs/",
            ]
        );
    }

    #[tokio::test]
    async fn system_gateways_come_from_config_endpoint() {
        let endpoint = spawn_config_endpoint(
            r#"{"ipfs_gateways":"[\"https://cfg-a.example/ipfs/\",\"https://cfg-b.example/ipfs/\"]"}"#,
        )
        .await;

        let registry =
            GatewayRegistry::new(Box::new(MemoryGatewayStore::new()), test_client(), endpoint);
        let system = registry.fetch_system_gateways().await;
        assert_eq!(
            system,
            [
                "https://cfg-a.example/ipfs/",
                "https://cfg-b.example/ipfs/",
            ]
        );
    }

    #[tokio::test]
    async fn malformed_config_payload_falls_back() {
        let endpoint = spawn_config_endpoint(r#"{"ipfs_gateways":"not json"}"#).await;

        let registry =
            GatewayRegistry::new(Box::new(MemoryGatewayStore::new()), test_client(), endpoint);
        let system = registry.fetch_system_gateways().await;
        assert_eq!(system, FALLBACK_GATEWAYS);
    }

    #[tokio::test]
    async fn missing_endpoint_falls_back() {
        let registry = registry();
        let system = registry.fetch_system_gateways().await;
        assert_eq!(system, FALLBACK_GATEWAYS);
    }

    #[tokio::test]
    async fn system_fetch_is_memoized() {
        let endpoint = spawn_config_endpoint(
            r#"{"ipfs_gateways":"[\"https://cfg.example/ipfs/\"]"}"#,
        )
        .await;

        let registry =
            GatewayRegistry::new(Box::new(MemoryGatewayStore::new()), test_client(), endpoint);
        let first = registry.fetch_system_gateways().await.to_vec();
        let second = registry.fetch_system_gateways().await.to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn validation_failure_does_not_persist() {
        let store = MemoryGatewayStore::new();
        store
            .save(&["https://kept.example/ipfs/".to_string()])
            .unwrap();

        let mut registry = GatewayRegistry::new(Box::new(store), test_client(), "");
        assert!(registry.add_gateway("https://no-suffix.example/").is_err());
        assert_eq!(registry.user_gateways(), ["https://kept.example/ipfs/"]);
    }
}

//! # Cache Controller
//!
//! The background worker that owns the asset store. It intercepts eligible
//! asset requests and serves them cache-first with network fallback, and it
//! answers the command protocol. One logical worker runs per engine
//! instance; every incoming event is handled on its own task, so a slow
//! fetch never blocks other interceptions or commands.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{AssetMetadata, AssetStore, CacheEntry};
use crate::config::ENGINE_VERSION;
use crate::net::create_client;
use crate::worker::handle::DeliveryHandle;
use crate::worker::protocol::{CacheCommand, CacheResponse, Envelope, WorkerStatusReport};
use crate::{DeliveryConfig, DeliveryError};

/// A request routed through the delivery worker.
#[derive(Debug, Clone)]
pub struct AssetRequest {
    pub method: Method,
    pub url: String,
}

impl AssetRequest {
    /// Convenience constructor for the common GET case.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
        }
    }
}

/// Response surfaced back to the requesting context.
#[derive(Debug, Clone)]
pub struct AssetResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Bytes,
    /// True when served from the persistent cache rather than the network
    pub from_cache: bool,
}

/// Events delivered to the worker loop.
pub(crate) enum WorkerEvent {
    Command {
        envelope: Envelope<CacheCommand>,
        /// Reply channel of the requesting context
        reply_to: mpsc::Sender<Envelope<CacheResponse>>,
    },
    Fetch {
        request: AssetRequest,
        respond_to: oneshot::Sender<Result<AssetResponse, DeliveryError>>,
    },
}

/// The background cache worker.
pub struct CacheController {
    config: Arc<DeliveryConfig>,
    store: AssetStore,
    client: Client,
}

impl CacheController {
    /// Open the store, spawn the worker loop, and hand back the foreground
    /// handle for it.
    pub async fn spawn(config: DeliveryConfig) -> Result<DeliveryHandle, DeliveryError> {
        let client = create_client(&config)?;
        Self::spawn_with_client(config, client).await
    }

    /// Spawn with an externally constructed HTTP client.
    pub async fn spawn_with_client(
        config: DeliveryConfig,
        client: Client,
    ) -> Result<DeliveryHandle, DeliveryError> {
        let store = AssetStore::open(&config).await?;
        let (events_tx, events_rx) = mpsc::channel(32);
        let shutdown = CancellationToken::new();

        let controller = Self {
            config: Arc::new(config),
            store,
            client,
        };
        tokio::spawn(controller.run(events_rx, shutdown.clone()));

        Ok(DeliveryHandle::new(events_tx, shutdown))
    }

    async fn run(self, mut events: mpsc::Receiver<WorkerEvent>, shutdown: CancellationToken) {
        info!(
            cache = self.config.cache_name.as_str(),
            hosts = ?self.config.external_hosts,
            "Delivery worker started"
        );

        let controller = Arc::new(self);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Delivery worker shutting down");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let controller = Arc::clone(&controller);
                    tokio::spawn(async move { controller.dispatch(event).await });
                }
            }
        }
    }

    async fn dispatch(self: Arc<Self>, event: WorkerEvent) {
        match event {
            WorkerEvent::Fetch {
                request,
                respond_to,
            } => {
                let result = self.handle_request(request).await;
                // The requester may have gone away; nothing to do then
                let _ = respond_to.send(result);
            }
            WorkerEvent::Command { envelope, reply_to } => {
                if let Some(response) = self.handle_command(envelope.payload).await {
                    let _ = reply_to
                        .send(Envelope {
                            id: envelope.id,
                            payload: response,
                        })
                        .await;
                }
            }
        }
    }

    /// Serve one request: cache-first when the interception predicate
    /// matches, plain pass-through otherwise.
    async fn handle_request(&self, request: AssetRequest) -> Result<AssetResponse, DeliveryError> {
        if self.should_intercept(&request) {
            self.cache_first(&request).await
        } else {
            self.pass_through(&request).await
        }
    }

    /// A request is eligible only if it is a GET against one of the
    /// configured external asset hosts with a cacheable path extension.
    fn should_intercept(&self, request: &AssetRequest) -> bool {
        if request.method != Method::GET {
            return false;
        }

        let Ok(url) = url::Url::parse(&request.url) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        if !self.config.external_hosts.iter().any(|h| h == host) {
            return false;
        }

        let path = url.path().to_ascii_lowercase();
        self.config
            .cacheable_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
    }

    async fn cache_first(&self, request: &AssetRequest) -> Result<AssetResponse, DeliveryError> {
        match self.store.get(&request.url).await {
            Ok(Some((body, metadata))) => {
                debug!(url = request.url.as_str(), "Serving asset from cache");
                return Ok(AssetResponse {
                    status: StatusCode::OK,
                    content_type: metadata.content_type,
                    content_length: Some(metadata.size),
                    body,
                    from_cache: true,
                });
            }
            Ok(None) => {}
            Err(e) => {
                // A broken lookup downgrades to a miss
                warn!(url = request.url.as_str(), error = %e, "Cache lookup failed, falling back to network");
            }
        }

        debug!(url = request.url.as_str(), "Cache miss, fetching from network");
        let response = self.fetch_network(request).await?;

        // Only a plain 200 is eligible for storage; redirects, partial
        // content and errors are served but never cached
        if response.status == StatusCode::OK {
            let metadata = AssetMetadata::new(
                &request.url,
                response.content_length.unwrap_or(0),
                response.content_type.clone(),
            );
            let store = self.store.clone();
            // Bytes clones share the buffer: one copy for the caller, one
            // for the store. The caller does not wait for the write.
            let body = response.body.clone();
            tokio::spawn(async move {
                let url = metadata.url.clone();
                if let Err(e) = store.put(metadata, body).await {
                    warn!(url = url.as_str(), error = %e, "Failed to persist cached asset");
                }
            });
        } else {
            debug!(
                url = request.url.as_str(),
                status = %response.status,
                "Response not eligible for caching"
            );
        }

        Ok(response)
    }

    async fn pass_through(&self, request: &AssetRequest) -> Result<AssetResponse, DeliveryError> {
        self.fetch_network(request).await
    }

    async fn fetch_network(&self, request: &AssetRequest) -> Result<AssetResponse, DeliveryError> {
        let response = self
            .client
            .request(request.method.clone(), &request.url)
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response.bytes().await?;

        Ok(AssetResponse {
            status,
            content_type,
            content_length,
            body,
            from_cache: false,
        })
    }

    /// Answer one protocol command. `None` means the command defines no
    /// reply (the size audit).
    async fn handle_command(&self, command: CacheCommand) -> Option<CacheResponse> {
        match command {
            CacheCommand::ListCache => Some(match self.store.entries().await {
                Ok(entries) => CacheResponse::CacheList {
                    payload: entries
                        .iter()
                        .map(|entry| CacheEntry::from(&entry.metadata))
                        .collect(),
                },
                Err(e) => CacheResponse::CacheError {
                    error: format!("failed to list cache: {e}"),
                },
            }),
            CacheCommand::ClearCache => Some(match self.store.clear().await {
                Ok(()) => CacheResponse::CacheCleared,
                Err(e) => CacheResponse::CacheError {
                    error: format!("failed to clear cache: {e}"),
                },
            }),
            CacheCommand::DeleteCacheItem { url } => Some(match self.store.remove(&url).await {
                Ok(()) => CacheResponse::CacheItemDeleted { url },
                Err(e) => CacheResponse::CacheError {
                    error: format!("failed to delete cache item: {e}"),
                },
            }),
            CacheCommand::CheckCacheSize => {
                self.audit_cache_size().await;
                None
            }
            CacheCommand::GetCacheStats => {
                Some(match self.store.stats(&self.config.cache_name).await {
                    Ok(stats) => CacheResponse::CacheStats { stats },
                    Err(e) => CacheResponse::CacheError {
                        error: format!("failed to compute cache stats: {e}"),
                    },
                })
            }
            CacheCommand::GetWorkerStatus => Some(CacheResponse::WorkerStatus {
                status: WorkerStatusReport {
                    version: ENGINE_VERSION.to_string(),
                    cache_name: self.config.cache_name.clone(),
                    external_hosts: self.config.external_hosts.clone(),
                    cacheable_extensions: self.config.cacheable_extensions.clone(),
                },
            }),
            CacheCommand::Unknown => Some(CacheResponse::CacheError {
                error: "unknown command type".to_string(),
            }),
        }
    }

    /// Audit total cache size against the configured ceiling. When over
    /// budget, evict oldest entries first until the total is back under the
    /// 80% high-water mark. Eviction only ever happens here, never on the
    /// write path.
    async fn audit_cache_size(&self) {
        let mut entries = match self.store.entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Cache size audit failed");
                return;
            }
        };

        let total: u64 = entries.iter().map(|e| e.bytes_on_disk).sum();
        let ceiling = self.config.max_cache_size;
        info!(
            total_bytes = total,
            ceiling_bytes = ceiling,
            entry_count = entries.len(),
            "Cache size audit"
        );

        if total <= ceiling {
            return;
        }

        let high_water = ceiling / 10 * 8;
        entries.sort_by_key(|entry| entry.metadata.cached_at);

        let mut remaining = total;
        for entry in entries {
            if remaining <= high_water {
                break;
            }
            match self.store.remove(&entry.metadata.url).await {
                Ok(()) => {
                    remaining = remaining.saturating_sub(entry.bytes_on_disk);
                    debug!(
                        url = entry.metadata.url.as_str(),
                        bytes = entry.bytes_on_disk,
                        "Evicted cache entry"
                    );
                }
                Err(e) => {
                    warn!(url = entry.metadata.url.as_str(), error = %e, "Failed to evict cache entry");
                }
            }
        }

        info!(total_bytes = remaining, "Cache eviction completed");
    }
}

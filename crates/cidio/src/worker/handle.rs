//! Foreground handle to the cache worker.
//!
//! A handle is one foreground context: it owns a reply channel the worker
//! targets when answering this context's commands, and a pending-reply map
//! keyed by envelope id that routes each reply to its requester. Cloning a
//! handle shares the context; [`DeliveryHandle::new_context`] opens a fresh
//! one (another "tab" against the same worker).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::DeliveryError;
use crate::cache::{CacheEntry, CacheStatsReport};
use crate::worker::controller::{AssetRequest, AssetResponse, WorkerEvent};
use crate::worker::protocol::{CacheCommand, CacheResponse, Envelope, WorkerStatusReport};

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<CacheResponse>>>>;

/// Handle used by foreground code to talk to the cache worker.
#[derive(Clone)]
pub struct DeliveryHandle {
    events: mpsc::Sender<WorkerEvent>,
    reply_tx: mpsc::Sender<Envelope<CacheResponse>>,
    pending: PendingReplies,
    next_id: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl DeliveryHandle {
    pub(crate) fn new(events: mpsc::Sender<WorkerEvent>, shutdown: CancellationToken) -> Self {
        let (reply_tx, mut reply_rx) = mpsc::channel::<Envelope<CacheResponse>>(32);
        let pending: PendingReplies = Arc::default();

        // Demux task: route each reply envelope to the waiter parked under
        // its id
        let demux = Arc::clone(&pending);
        tokio::spawn(async move {
            while let Some(envelope) = reply_rx.recv().await {
                let Some(waiter) = demux.lock().remove(&envelope.id) else {
                    debug!(id = envelope.id, "Reply with no pending requester");
                    continue;
                };
                let _ = waiter.send(envelope.payload);
            }
        });

        Self {
            events,
            reply_tx,
            pending,
            next_id: Arc::new(AtomicU64::new(1)),
            shutdown,
        }
    }

    /// Open a fresh foreground context against the same worker, with its
    /// own reply channel and correlation space.
    pub fn new_context(&self) -> Self {
        Self::new(self.events.clone(), self.shutdown.clone())
    }

    /// Issue a request through the worker. Eligible asset requests are
    /// served cache-first; everything else passes through to the network.
    pub async fn fetch(&self, request: AssetRequest) -> Result<AssetResponse, DeliveryError> {
        let (respond_to, response) = oneshot::channel();
        self.events
            .send(WorkerEvent::Fetch {
                request,
                respond_to,
            })
            .await
            .map_err(|_| DeliveryError::WorkerGone("event channel closed".to_string()))?;

        response
            .await
            .map_err(|_| DeliveryError::WorkerGone("worker dropped the request".to_string()))?
    }

    /// List every cached entry.
    pub async fn list_cache(&self) -> Result<Vec<CacheEntry>, DeliveryError> {
        match self.request(CacheCommand::ListCache).await? {
            CacheResponse::CacheList { payload } => Ok(payload),
            other => Err(Self::unexpected(other)),
        }
    }

    /// Drop the entire store.
    pub async fn clear_cache(&self) -> Result<(), DeliveryError> {
        match self.request(CacheCommand::ClearCache).await? {
            CacheResponse::CacheCleared => Ok(()),
            other => Err(Self::unexpected(other)),
        }
    }

    /// Drop a single entry by URL.
    pub async fn delete_cache_item(&self, url: impl Into<String>) -> Result<(), DeliveryError> {
        let url = url.into();
        match self
            .request(CacheCommand::DeleteCacheItem { url })
            .await?
        {
            CacheResponse::CacheItemDeleted { .. } => Ok(()),
            other => Err(Self::unexpected(other)),
        }
    }

    /// Aggregate statistics over the store.
    pub async fn cache_stats(&self) -> Result<CacheStatsReport, DeliveryError> {
        match self.request(CacheCommand::GetCacheStats).await? {
            CacheResponse::CacheStats { stats } => Ok(stats),
            other => Err(Self::unexpected(other)),
        }
    }

    /// Worker version and effective interception configuration.
    pub async fn worker_status(&self) -> Result<WorkerStatusReport, DeliveryError> {
        match self.request(CacheCommand::GetWorkerStatus).await? {
            CacheResponse::WorkerStatus { status } => Ok(status),
            other => Err(Self::unexpected(other)),
        }
    }

    /// Ask the worker to audit total cache size against its ceiling.
    /// Fire-and-forget: the audit defines no reply.
    pub async fn check_cache_size(&self) -> Result<(), DeliveryError> {
        let envelope = Envelope {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            payload: CacheCommand::CheckCacheSize,
        };
        self.events
            .send(WorkerEvent::Command {
                envelope,
                reply_to: self.reply_tx.clone(),
            })
            .await
            .map_err(|_| DeliveryError::WorkerGone("event channel closed".to_string()))
    }

    /// Start the periodic size audit: one audit shortly after startup, then
    /// one per interval. Advisory telemetry driving the worker's
    /// over-budget eviction; the returned task ends with the worker.
    pub fn spawn_size_audit(&self, interval: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = timer.tick() => {
                        if handle.check_cache_size().await.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Stop the worker. Outstanding requests get `WorkerGone`.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn request(&self, command: CacheCommand) -> Result<CacheResponse, DeliveryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (waiter_tx, waiter_rx) = oneshot::channel();
        self.pending.lock().insert(id, waiter_tx);

        let event = WorkerEvent::Command {
            envelope: Envelope {
                id,
                payload: command,
            },
            reply_to: self.reply_tx.clone(),
        };
        if self.events.send(event).await.is_err() {
            self.pending.lock().remove(&id);
            return Err(DeliveryError::WorkerGone(
                "event channel closed".to_string(),
            ));
        }

        tokio::select! {
            result = waiter_rx => match result {
                Ok(response) => Ok(response),
                Err(_) => {
                    self.pending.lock().remove(&id);
                    Err(DeliveryError::WorkerGone(
                        "worker dropped the reply".to_string(),
                    ))
                }
            },
            _ = self.shutdown.cancelled() => {
                self.pending.lock().remove(&id);
                Err(DeliveryError::WorkerGone("worker shut down".to_string()))
            }
        }
    }

    fn unexpected(response: CacheResponse) -> DeliveryError {
        match response {
            CacheResponse::CacheError { error } => DeliveryError::Generic(error),
            other => DeliveryError::UnexpectedReply(format!("{other:?}")),
        }
    }
}

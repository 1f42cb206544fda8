//! # Gateway Resolver
//!
//! Turns a content identifier into a ready-to-use URL. Resolution probes
//! the registry's candidates strictly sequentially in priority order, each
//! probe bounded by its own timeout, and returns the first gateway that
//! answers. Sequential probing keeps load on the candidate origins bounded
//! and preserves first-priority-available semantics.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::registry::GatewayRegistry;
use crate::DeliveryError;

/// Progress callback invoked before each probe: (gateway, index, total).
pub type AttemptCallback = dyn Fn(&str, usize, usize) + Send + Sync;

/// Terminal failure of a single resolution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no gateways available")]
    NoGatewaysAvailable,

    /// Every candidate failed; carries no partial result. Callers should
    /// surface this as "content currently unreachable" rather than as a
    /// single-request network error.
    #[error("all gateways failed")]
    AllGatewaysFailed,
}

/// Options for a failover resolution
pub struct FailoverOptions {
    /// Budget for each individual probe. On expiry the in-flight request is
    /// cancelled and the candidate counts as failed.
    pub timeout: Duration,
    /// Invoked before each probe with the gateway, its index, and the total
    /// candidate count.
    pub on_attempt: Option<Box<AttemptCallback>>,
}

impl Default for FailoverOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            on_attempt: None,
        }
    }
}

impl std::fmt::Debug for FailoverOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverOptions")
            .field("timeout", &self.timeout)
            .field("on_attempt", &self.on_attempt.as_ref().map(|_| "…"))
            .finish()
    }
}

/// The outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGateway {
    /// Full URL for the content
    pub url: String,
    /// The gateway that served the successful probe
    pub gateway: String,
}

/// Resolver over a [`GatewayRegistry`]
#[derive(Debug, Clone)]
pub struct GatewayResolver {
    client: Client,
}

impl GatewayResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a URL for `cid` using the gateway at `index` in the effective
    /// list, falling back to the first gateway when the index is out of
    /// range. Fails only when the effective list is empty.
    pub async fn build_url(
        &self,
        registry: &GatewayRegistry,
        cid: &str,
        index: usize,
    ) -> Result<String, ResolveError> {
        let gateways = registry.all_gateways().await;
        let gateway = gateways
            .get(index)
            .or_else(|| gateways.first())
            .ok_or(ResolveError::NoGatewaysAvailable)?;

        Ok(format!("{gateway}{cid}"))
    }

    /// Probe the effective gateway list sequentially in priority order and
    /// return the first candidate that answers the existence probe.
    ///
    /// Each probe owns an independent timeout; a hung gateway costs at most
    /// `options.timeout` before the loop moves on, so total latency is
    /// bounded by `candidates × timeout`. Cancelling one probe never
    /// affects the next.
    pub async fn resolve_with_failover(
        &self,
        registry: &GatewayRegistry,
        cid: &str,
        options: &FailoverOptions,
    ) -> Result<ResolvedGateway, ResolveError> {
        let gateways = registry.all_gateways().await;
        let total = gateways.len();

        for (index, gateway) in gateways.iter().enumerate() {
            if let Some(on_attempt) = &options.on_attempt {
                on_attempt(gateway, index, total);
            }

            let url = format!("{gateway}{cid}");
            // Dropping the probe future on expiry aborts the in-flight
            // request, so a timed-out candidate holds no resources
            match tokio::time::timeout(options.timeout, self.probe(&url)).await {
                Ok(Ok(())) => {
                    debug!(gateway = gateway.as_str(), attempt = index, "Gateway probe succeeded");
                    return Ok(ResolvedGateway {
                        url,
                        gateway: gateway.clone(),
                    });
                }
                Ok(Err(e)) => {
                    warn!(gateway = gateway.as_str(), error = %e, "Gateway probe failed");
                }
                Err(_) => {
                    warn!(
                        gateway = gateway.as_str(),
                        timeout_ms = options.timeout.as_millis() as u64,
                        "Gateway probe timed out"
                    );
                }
            }
        }

        Err(ResolveError::AllGatewaysFailed)
    }

    /// Lightweight existence probe with HEAD semantics.
    async fn probe(&self, url: &str) -> Result<(), DeliveryError> {
        let response = self.client.head(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::StatusCode(status));
        }
        Ok(())
    }
}

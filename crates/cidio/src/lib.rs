//! # Cidio
//!
//! A library for delivering content-addressed media assets.
//! Resolves content identifiers to working gateway URLs and serves asset
//! fetches cache-first from a persistent store.
//!
//! ## Features
//!
//! - Validated, persisted registry of candidate gateways
//! - Sequential failover probing with per-candidate timeout and cancellation
//! - Background cache worker with host/extension interception rules
//! - Asynchronous command protocol with correlated request/reply envelopes
//! - Periodic size auditing with oldest-first eviction over budget

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod net;
pub mod proxy;
pub mod worker;

pub use builder::DeliveryConfigBuilder;
pub use cache::{AssetKind, AssetMetadata, AssetStore, CacheEntry, CacheStatsReport, HostStats};
pub use config::{CACHEABLE_EXTENSIONS, DeliveryConfig, ENGINE_VERSION};
pub use error::DeliveryError;

// Re-export gateway management types
pub use gateway::{
    FALLBACK_GATEWAYS, FailoverOptions, FileGatewayStore, GATEWAY_PATH_SUFFIX, GatewayRegistry,
    GatewayResolver, GatewayStore, GatewayValidationError, MemoryGatewayStore, ResolveError,
    ResolvedGateway, USER_GATEWAYS_FILE,
};

// Re-export the worker surface
pub use worker::{
    AssetRequest, AssetResponse, CacheCommand, CacheController, CacheResponse, DeliveryHandle,
    Envelope, WorkerStatusReport,
};

// Re-export client utilities
pub use net::create_client;
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};

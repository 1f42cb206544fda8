//! # Cache Worker
//!
//! The background controller that owns the asset store, the command
//! protocol it speaks, and the foreground handle used to reach it.

mod controller;
mod handle;
mod protocol;

pub use controller::{AssetRequest, AssetResponse, CacheController};
pub use handle::DeliveryHandle;
pub use protocol::{CacheCommand, CacheResponse, Envelope, WorkerStatusReport};

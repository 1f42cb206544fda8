use reqwest::StatusCode;

use crate::gateway::{GatewayValidationError, ResolveError};

// Custom error type for delivery operations
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Server returned status code {0}")]
    StatusCode(StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid proxy configuration: {0}")]
    Proxy(String),

    #[error("Gateway rejected: {0}")]
    Validation(#[from] GatewayValidationError),

    #[error("Content resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Delivery worker unavailable: {0}")]
    WorkerGone(String),

    #[error("Unexpected protocol reply: {0}")]
    UnexpectedReply(String),

    #[error("Generic delivery error: {0}")]
    Generic(String),
}

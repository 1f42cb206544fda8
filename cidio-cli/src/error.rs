use cidio_engine::{DeliveryError, GatewayValidationError, ResolveError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error(transparent)]
    Engine(#[from] DeliveryError),

    #[error("Invalid gateway: {0}")]
    Validation(#[from] GatewayValidationError),

    #[error("Content currently unreachable: {0}")]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

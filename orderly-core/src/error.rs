use orderly_shared::OrderId;
use serde::Serialize;
use thiserror::Error;

/// HTTP-agnostic result classification of an orchestrator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    NotFound,
    BadRequest,
    ServiceUnavailable,
    BadGateway,
    InternalError,
}

/// Failure of a remote dependency (inventory, product, notification, payment).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DependencyError {
    #[error("{service} circuit breaker is open")]
    CircuitOpen { service: String },

    #[error("{service} request failed: {message}")]
    Request { service: String, message: String },

    #[error("{service} returned status {status}")]
    Status { service: String, status: u16 },

    #[error("failed to decode {service} response: {message}")]
    Decode { service: String, message: String },

    #[error("{service}: all {attempts} attempts failed, last error: {last}")]
    RetriesExhausted {
        service: String,
        attempts: u32,
        last: String,
    },
}

impl DependencyError {
    pub fn service(&self) -> &str {
        match self {
            Self::CircuitOpen { service }
            | Self::Request { service, .. }
            | Self::Status { service, .. }
            | Self::Decode { service, .. }
            | Self::RetriesExhausted { service, .. } => service,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Database error: {0}")]
    Database(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache key not found: {0}")]
    NotFound(String),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache entry could not be (de)serialized: {0}")]
    Serialization(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to serialize event: {0}")]
    Serialization(String),

    #[error("Broker rejected event on {topic}: {message}")]
    Broker { topic: String, message: String },
}

/// Errors surfaced by the order workflows.
///
/// Cache and publish failures never appear here: the orchestrator recovers
/// from them locally.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Product {product_id} not available in requested quantity")]
    Unavailable {
        product_id: i64,
        message: Option<String>,
    },

    #[error("Failed to check inventory: {0}")]
    Inventory(#[source] DependencyError),

    #[error("Failed to fetch product price: {0}")]
    Pricing(#[source] DependencyError),

    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Failed to persist order: {0}")]
    Persistence(#[source] PersistenceError),
}

impl OrderError {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Validation(_) | Self::Unavailable { .. } => Outcome::BadRequest,
            Self::Inventory(_) => Outcome::ServiceUnavailable,
            Self::Pricing(_) => Outcome::BadGateway,
            Self::NotFound(_) => Outcome::NotFound,
            Self::Persistence(_) => Outcome::InternalError,
        }
    }
}

impl From<PersistenceError> for OrderError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(id) => Self::NotFound(id),
            other => Self::Persistence(other),
        }
    }
}

//! Event publication and consumption errors.

use thiserror::Error;

/// Errors that can occur while talking to the broker.
#[derive(Debug, Error)]
pub enum EventError {
    /// A producer or consumer client could not be constructed.
    #[error("Broker client creation failed: {0}")]
    ClientCreation(String),

    /// The order could not be encoded or a payload could not be decoded.
    #[error("Event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The broker rejected or failed to acknowledge a record.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Polling the broker for the next record failed.
    #[error("Poll failed: {0}")]
    Poll(String),

    /// Storing the consumed offset failed.
    #[error("Offset commit failed: {0}")]
    Commit(String),

    /// Processing a decoded event failed.
    #[error("Event handler error: {0}")]
    Handler(String),

    /// An error reported by the Kafka client.
    #[cfg(feature = "kafka")]
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// Result type for event operations.
pub type Result<T> = std::result::Result<T, EventError>;

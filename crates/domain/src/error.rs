//! Domain error types.

use common::OrderId;
use order_store::OrderStoreError;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request failed one or more field rules.
    ///
    /// Holds the identifiers of the offending fields in rule order.
    #[error("Validation failed: {}", .0.join(","))]
    Validation(Vec<String>),

    /// No live order exists with the given id.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The store failed to read or write the order.
    #[error("Order store error: {0}")]
    Store(OrderStoreError),
}

impl From<OrderStoreError> for DomainError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::NotFound(id) => DomainError::NotFound(id),
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

use thiserror::Error;

use crate::OrderId;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// No live order exists with the given id.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// A row violated one of the schema's check constraints.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A column held a value the aggregate model cannot represent.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;

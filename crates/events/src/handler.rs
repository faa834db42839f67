//! Hook invoked for every decoded order event.

use async_trait::async_trait;
use common::Order;

use crate::Result;

/// Processes order events decoded by the consumer.
///
/// Delivery is at-least-once: after a restart the same order may be seen
/// again, so implementations should be idempotent per order id.
#[async_trait]
pub trait OrderEventHandler: Send + Sync {
    /// Handles one decoded order.
    async fn handle(&self, key: Option<&str>, order: Order) -> Result<()>;
}

/// Handler that only records the event in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOrderEvents;

#[async_trait]
impl OrderEventHandler for LogOrderEvents {
    async fn handle(&self, key: Option<&str>, order: Order) -> Result<()> {
        tracing::info!(
            key = key.unwrap_or_default(),
            order_id = %order.id,
            user_id = %order.user_id,
            status = %order.status,
            total_amount = %order.total_amount,
            items = order.item_count(),
            "consumed order event"
        );
        Ok(())
    }
}

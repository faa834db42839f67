//! Broker client abstraction.
//!
//! A broker hands out short-lived producer clients and long-lived consumer
//! clients subscribed to one topic under a consumer group.

use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;

use crate::Result;

/// A record to append to a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub topic: String,
    pub partition: i32,
    pub key: String,
    pub payload: Vec<u8>,
}

/// Acknowledgment that a record was durably appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: String,
}

/// A record read from a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

/// Producer side of a broker connection.
#[async_trait]
pub trait ProducerClient: Send + Sync {
    /// Sends a record and waits for its delivery report.
    async fn send(&self, record: OutboundRecord) -> Result<DeliveryReport>;

    /// Waits at most `timeout` for outstanding records to be delivered.
    async fn flush(&self, timeout: Duration) -> Result<()>;
}

/// Consumer side of a broker connection, subscribed to a single topic.
#[async_trait]
pub trait ConsumerClient: Send {
    /// Waits, without bound, for the next record.
    async fn poll(&mut self) -> Result<InboundRecord>;

    /// Marks `record` as processed for the consumer group.
    async fn commit(&mut self, record: &InboundRecord) -> Result<()>;
}

/// Factory for broker clients.
pub trait EventBroker: Send + Sync {
    /// Builds a new producer client.
    fn create_producer(&self) -> Result<Box<dyn ProducerClient>>;

    /// Builds a consumer client for `group` subscribed to `topic`.
    fn subscribe(&self, group: &str, topic: &str) -> Result<Box<dyn ConsumerClient>>;
}

/// Chooses the partition for an order's events: `order_id mod partitions`.
///
/// All events of one order land on the same partition, which keeps them in
/// publish order for consumers.
pub fn partition_for(order_id: OrderId, partitions: i32) -> i32 {
    let partitions = i64::from(partitions.max(1));
    // rem_euclid keeps the result in 0..partitions, which always fits an i32.
    order_id.as_i64().rem_euclid(partitions) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_is_id_mod_partition_count() {
        for id in 0..5 {
            assert_eq!(partition_for(OrderId::new(id), 5), id as i32);
        }
        assert_eq!(partition_for(OrderId::new(5), 5), 0);
        assert_eq!(partition_for(OrderId::new(12), 5), 2);
    }

    #[test]
    fn same_order_always_maps_to_same_partition() {
        let id = OrderId::new(1234);
        assert_eq!(partition_for(id, 5), partition_for(id, 5));
    }

    #[test]
    fn degenerate_partition_count_falls_back_to_single_partition() {
        assert_eq!(partition_for(OrderId::new(9), 0), 0);
        assert_eq!(partition_for(OrderId::new(9), -3), 0);
    }
}

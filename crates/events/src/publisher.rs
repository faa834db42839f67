//! Publishes persisted orders to the order topic.

use std::sync::Arc;
use std::time::Duration;

use common::Order;
use tokio::task::JoinHandle;

use crate::broker::{DeliveryReport, EventBroker, OutboundRecord, partition_for};
use crate::config::EventsConfig;
use crate::Result;

/// Hands orders to the broker as JSON records keyed by order id.
///
/// A producer client is built for every publish, flushed with a bounded wait
/// and dropped afterwards. Nothing is retried.
#[derive(Clone)]
pub struct OrderPublisher {
    broker: Arc<dyn EventBroker>,
    topic: String,
    partitions: i32,
    flush_timeout: Duration,
}

impl OrderPublisher {
    /// Creates a publisher for the configured topic.
    pub fn new(broker: Arc<dyn EventBroker>, config: &EventsConfig) -> Self {
        Self {
            broker,
            topic: config.topic.clone(),
            partitions: config.partitions,
            flush_timeout: config.flush_timeout,
        }
    }

    /// Returns the topic events are published to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Builds the record for an order.
    pub fn record_for(&self, order: &Order) -> Result<OutboundRecord> {
        Ok(OutboundRecord {
            topic: self.topic.clone(),
            partition: partition_for(order.id, self.partitions),
            key: order.id.to_string(),
            payload: serde_json::to_vec(order)?,
        })
    }

    /// Publishes an order and waits for the delivery report.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, topic = %self.topic))]
    pub async fn publish(&self, order: &Order) -> Result<DeliveryReport> {
        let producer = self.broker.create_producer().inspect_err(|e| {
            tracing::error!(error = %e, "failed to create producer");
        })?;

        let record = self.record_for(order).inspect_err(|e| {
            tracing::error!(error = %e, "failed to serialize order");
        })?;

        let delivery = producer.send(record).await;
        match &delivery {
            Ok(report) => tracing::info!(
                key = %report.key,
                partition = report.partition,
                offset = report.offset,
                "published order event"
            ),
            Err(e) => tracing::error!(error = %e, "failed to deliver order event"),
        }

        if let Err(e) = producer.flush(self.flush_timeout).await {
            tracing::warn!(error = %e, "producer flush did not complete");
        }

        delivery
    }

    /// Publishes an order on a detached task.
    ///
    /// The outcome only reaches logs and metrics; the caller never waits on
    /// the broker. The handle is returned for callers that want to observe
    /// completion, dropping it leaves the task running.
    pub fn publish_detached(&self, order: Order) -> JoinHandle<()> {
        let publisher = self.clone();
        tokio::spawn(async move {
            match publisher.publish(&order).await {
                Ok(_) => metrics::counter!("order_events_published_total").increment(1),
                Err(e) => {
                    metrics::counter!("order_events_publish_failed_total").increment(1);
                    tracing::warn!(order_id = %order.id, error = %e, "order event dropped");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventError, InMemoryBroker};
    use chrono::Utc;
    use common::{Money, OrderId, OrderItem, OrderItemId, OrderStatus, ProductId, UserId};
    use rust_decimal_macros::dec;

    fn order(id: i64) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(1),
            status: OrderStatus::New,
            total_amount: Money::new(dec!(19.98)),
            order_items: vec![OrderItem {
                id: OrderItemId::new(id * 10),
                product_id: ProductId::new(7),
                quantity: 2,
                unit_price: Money::new(dec!(9.99)),
            }],
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn publisher(broker: &InMemoryBroker) -> OrderPublisher {
        OrderPublisher::new(Arc::new(broker.clone()), &EventsConfig::default())
    }

    #[tokio::test]
    async fn publish_keys_by_order_id_and_partitions_by_modulo() {
        let broker = InMemoryBroker::new(5);
        let publisher = publisher(&broker);

        for id in 0..5 {
            let report = publisher.publish(&order(id)).await.unwrap();
            assert_eq!(report.partition, (id % 5) as i32);
            assert_eq!(report.key, id.to_string());
            assert_eq!(report.topic, "orders");
        }
    }

    #[tokio::test]
    async fn payload_is_the_json_order() {
        let broker = InMemoryBroker::new(5);
        let publisher = publisher(&broker);
        let sent = order(7);

        publisher.publish(&sent).await.unwrap();

        let records = broker.records("orders").await;
        assert_eq!(records.len(), 1);
        let decoded: Order = serde_json::from_slice(&records[0].payload).unwrap();
        assert_eq!(decoded, sent);
        assert_eq!(records[0].partition, 2);
    }

    #[tokio::test]
    async fn same_order_lands_on_same_partition_in_order() {
        let broker = InMemoryBroker::new(5);
        let publisher = publisher(&broker);

        let mut shipped = order(3);
        publisher.publish(&shipped).await.unwrap();
        shipped.status = OrderStatus::Shipped;
        publisher.publish(&shipped).await.unwrap();

        let records = broker.records("orders").await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.partition == 3));
        let last: Order = serde_json::from_slice(&records[1].payload).unwrap();
        assert_eq!(last.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn client_creation_failure_aborts_publish() {
        let broker = InMemoryBroker::new(5);
        broker.set_fail_on_connect(true);

        let result = publisher(&broker).publish(&order(1)).await;
        assert!(matches!(result, Err(EventError::ClientCreation(_))));
        assert!(broker.records("orders").await.is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_is_returned_not_retried() {
        let broker = InMemoryBroker::new(5);
        broker.set_fail_on_send(true);

        let result = publisher(&broker).publish(&order(1)).await;
        assert!(matches!(result, Err(EventError::Delivery(_))));
        assert!(broker.records("orders").await.is_empty());
    }

    #[tokio::test]
    async fn detached_publish_swallows_failures() {
        let broker = InMemoryBroker::new(5);
        broker.set_fail_on_send(true);

        let handle = publisher(&broker).publish_detached(order(1));
        handle.await.unwrap();
        assert!(broker.records("orders").await.is_empty());
    }

    #[tokio::test]
    async fn detached_publish_delivers() {
        let broker = InMemoryBroker::new(5);

        publisher(&broker).publish_detached(order(4)).await.unwrap();

        let records = broker.records("orders").await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.as_deref(), Some("4"));
    }
}

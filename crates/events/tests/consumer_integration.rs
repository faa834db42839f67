//! End-to-end publish and consume over the in-memory broker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{Money, Order, OrderId, OrderItem, OrderItemId, OrderStatus, ProductId, UserId};
use events::{
    EventBroker, EventError, EventsConfig, InMemoryBroker, OrderConsumer, OrderEventHandler,
    OrderPublisher, OutboundRecord,
};
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

#[derive(Default)]
struct RecordingHandler {
    seen: Mutex<Vec<(Option<String>, Order)>>,
    fail: bool,
}

impl RecordingHandler {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    async fn ids(&self) -> Vec<i64> {
        self.seen
            .lock()
            .await
            .iter()
            .map(|(_, order)| order.id.as_i64())
            .collect()
    }

    async fn wait_for(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.seen.lock().await.len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("handler did not receive the expected events");
    }
}

#[async_trait]
impl OrderEventHandler for RecordingHandler {
    async fn handle(&self, key: Option<&str>, order: Order) -> events::Result<()> {
        self.seen
            .lock()
            .await
            .push((key.map(str::to_string), order));
        if self.fail {
            return Err(EventError::Handler("downstream unavailable".to_string()));
        }
        Ok(())
    }
}

fn order(id: i64) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId::new(id),
        user_id: UserId::new(1),
        status: OrderStatus::New,
        total_amount: Money::new(dec!(24.97)),
        order_items: vec![
            OrderItem {
                id: OrderItemId::new(id * 10),
                product_id: ProductId::new(1),
                quantity: 1,
                unit_price: Money::new(dec!(4.99)),
            },
            OrderItem {
                id: OrderItemId::new(id * 10 + 1),
                product_id: ProductId::new(2),
                quantity: 2,
                unit_price: Money::new(dec!(9.99)),
            },
        ],
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn setup(handler: Arc<RecordingHandler>) -> (InMemoryBroker, OrderPublisher, OrderConsumer) {
    let broker = InMemoryBroker::default();
    let config = EventsConfig::default();
    let publisher = OrderPublisher::new(Arc::new(broker.clone()), &config);
    let consumer = OrderConsumer::new(Arc::new(broker.clone()), &config, handler);
    (broker, publisher, consumer)
}

#[tokio::test]
async fn test_published_orders_reach_the_handler() {
    let handler = Arc::new(RecordingHandler::default());
    let (_, publisher, consumer) = setup(Arc::clone(&handler));

    assert!(consumer.start().await.unwrap());
    for id in 1..=3 {
        publisher.publish(&order(id)).await.unwrap();
    }

    handler.wait_for(3).await;
    let mut ids = handler.ids().await;
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);

    let seen = handler.seen.lock().await;
    let (key, decoded) = seen.iter().find(|(_, o)| o.id.as_i64() == 2).unwrap();
    assert_eq!(key.as_deref(), Some("2"));
    assert_eq!(decoded.total_amount, Money::new(dec!(24.97)));
    assert_eq!(decoded.order_items, order(2).order_items);
    drop(seen);

    consumer.shutdown().await;
}

#[tokio::test]
async fn test_events_published_before_start_are_consumed_from_earliest() {
    let handler = Arc::new(RecordingHandler::default());
    let (_, publisher, consumer) = setup(Arc::clone(&handler));

    publisher.publish(&order(4)).await.unwrap();
    assert!(consumer.start().await.unwrap());

    handler.wait_for(1).await;
    assert_eq!(handler.ids().await, vec![4]);

    consumer.shutdown().await;
}

#[tokio::test]
async fn test_undecodable_payload_is_skipped_and_committed() {
    let handler = Arc::new(RecordingHandler::default());
    let (broker, publisher, consumer) = setup(Arc::clone(&handler));

    let producer = broker.create_producer().unwrap();
    producer
        .send(OutboundRecord {
            topic: "orders".to_string(),
            partition: 0,
            key: "garbage".to_string(),
            payload: b"{not json".to_vec(),
        })
        .await
        .unwrap();
    publisher.publish(&order(5)).await.unwrap();

    assert!(consumer.start().await.unwrap());
    handler.wait_for(1).await;

    // Give the loop a moment to commit after the handler returns.
    tokio::time::sleep(Duration::from_millis(50)).await;
    consumer.shutdown().await;

    assert_eq!(handler.ids().await, vec![5]);
    assert_eq!(
        broker
            .committed_offset("order-consumer-group", "orders", 0)
            .await,
        2
    );
}

#[tokio::test]
async fn test_handler_failure_does_not_stop_the_loop() {
    let handler = Arc::new(RecordingHandler::failing());
    let (_, publisher, consumer) = setup(Arc::clone(&handler));

    assert!(consumer.start().await.unwrap());
    publisher.publish(&order(1)).await.unwrap();
    publisher.publish(&order(2)).await.unwrap();

    handler.wait_for(2).await;
    assert!(consumer.is_running().await);

    consumer.shutdown().await;
}

#[tokio::test]
async fn test_restart_resumes_after_committed_offset() {
    let handler = Arc::new(RecordingHandler::default());
    let (_, publisher, consumer) = setup(Arc::clone(&handler));

    assert!(consumer.start().await.unwrap());
    publisher.publish(&order(5)).await.unwrap();
    handler.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    consumer.shutdown().await;

    publisher.publish(&order(10)).await.unwrap();
    assert!(consumer.start().await.unwrap());
    handler.wait_for(2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    consumer.shutdown().await;

    // Order 5 was committed before the restart and is not replayed.
    assert_eq!(handler.ids().await, vec![5, 10]);
}

#[tokio::test]
async fn test_stopped_consumer_ignores_new_events() {
    let handler = Arc::new(RecordingHandler::default());
    let (broker, publisher, consumer) = setup(Arc::clone(&handler));

    assert!(consumer.start().await.unwrap());
    consumer.shutdown().await;

    publisher.publish(&order(3)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(handler.ids().await.is_empty());
    assert_eq!(broker.records("orders").await.len(), 1);
}

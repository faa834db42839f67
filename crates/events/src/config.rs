//! Broker, topic and consumer group settings.

use std::time::Duration;

/// Default broker address.
pub const DEFAULT_BROKER: &str = "localhost:9092";
/// Default topic for order events.
pub const DEFAULT_TOPIC: &str = "orders";
/// Default consumer group.
pub const DEFAULT_CONSUMER_GROUP: &str = "order-consumer-group";
/// Default number of partitions order events are spread over.
pub const DEFAULT_PARTITIONS: i32 = 5;
/// Default bound on the producer flush after each publish.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(15);

/// Settings shared by the publisher and the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsConfig {
    pub broker: String,
    pub topic: String,
    pub consumer_group: String,
    pub partitions: i32,
    pub flush_timeout: Duration,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            broker: DEFAULT_BROKER.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            consumer_group: DEFAULT_CONSUMER_GROUP.to_string(),
            partitions: DEFAULT_PARTITIONS,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }
}

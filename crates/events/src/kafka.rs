//! Kafka-backed broker clients.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use crate::broker::{
    ConsumerClient, DeliveryReport, EventBroker, InboundRecord, OutboundRecord, ProducerClient,
};
use crate::{EventError, Result};

/// Connects to a Kafka cluster through librdkafka.
#[derive(Debug, Clone)]
pub struct KafkaBroker {
    bootstrap_servers: String,
    message_timeout: Duration,
}

impl KafkaBroker {
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            message_timeout: Duration::from_secs(5),
        }
    }

    /// Sets how long the producer keeps retrying a record before failing it.
    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    fn base_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        config
    }
}

impl EventBroker for KafkaBroker {
    fn create_producer(&self) -> Result<Box<dyn ProducerClient>> {
        let producer: FutureProducer = self
            .base_config()
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            )
            .create()
            .map_err(|e| EventError::ClientCreation(e.to_string()))?;

        Ok(Box::new(KafkaProducer { producer }))
    }

    fn subscribe(&self, group: &str, topic: &str) -> Result<Box<dyn ConsumerClient>> {
        let consumer: StreamConsumer = self
            .base_config()
            .set("group.id", group)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .create()
            .map_err(|e| EventError::ClientCreation(e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| EventError::ClientCreation(e.to_string()))?;

        Ok(Box::new(KafkaConsumer { consumer }))
    }
}

struct KafkaProducer {
    producer: FutureProducer,
}

#[async_trait]
impl ProducerClient for KafkaProducer {
    async fn send(&self, record: OutboundRecord) -> Result<DeliveryReport> {
        let delivery = self
            .producer
            .send(
                FutureRecord::to(&record.topic)
                    .partition(record.partition)
                    .key(record.key.as_str())
                    .payload(record.payload.as_slice()),
                Timeout::Never,
            )
            .await;

        match delivery {
            Ok((partition, offset)) => Ok(DeliveryReport {
                topic: record.topic,
                partition,
                offset,
                key: record.key,
            }),
            Err((e, _)) => Err(EventError::Delivery(e.to_string())),
        }
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        let producer = self.producer.clone();
        // librdkafka's flush blocks the calling thread.
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| EventError::Delivery(e.to_string()))??;
        Ok(())
    }
}

struct KafkaConsumer {
    consumer: StreamConsumer,
}

#[async_trait]
impl ConsumerClient for KafkaConsumer {
    async fn poll(&mut self) -> Result<InboundRecord> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| EventError::Poll(e.to_string()))?;

        Ok(InboundRecord {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message
                .key()
                .map(|key| String::from_utf8_lossy(key).into_owned()),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    async fn commit(&mut self, record: &InboundRecord) -> Result<()> {
        let offsets = next_offsets(record)?;
        self.consumer
            .store_offsets(&offsets)
            .map_err(|e| EventError::Commit(e.to_string()))
    }
}

/// The position to resume from after `record`, stored verbatim.
///
/// `store_offsets` takes the next offset to read, unlike `store_offset`
/// which adds one itself. Auto-commit ships whatever is stored.
fn next_offsets(record: &InboundRecord) -> Result<TopicPartitionList> {
    let mut offsets = TopicPartitionList::new();
    offsets
        .add_partition_offset(
            &record.topic,
            record.partition,
            Offset::Offset(record.offset + 1),
        )
        .map_err(|e| EventError::Commit(e.to_string()))?;
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(partition: i32, offset: i64) -> InboundRecord {
        InboundRecord {
            topic: "orders".to_string(),
            partition,
            offset,
            key: Some("3".to_string()),
            payload: Vec::new(),
        }
    }

    #[test]
    fn stores_the_offset_right_after_the_handled_record() {
        let offsets = next_offsets(&record(3, 41)).unwrap();

        assert_eq!(offsets.count(), 1);
        let stored = offsets.find_partition("orders", 3).unwrap();
        assert_eq!(stored.offset(), Offset::Offset(42));
    }

    #[test]
    fn first_record_resumes_at_one() {
        let offsets = next_offsets(&record(0, 0)).unwrap();
        assert_eq!(
            offsets.find_partition("orders", 0).unwrap().offset(),
            Offset::Offset(1)
        );
    }
}

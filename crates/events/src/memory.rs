//! In-memory partitioned broker.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};

use crate::broker::{
    ConsumerClient, DeliveryReport, EventBroker, InboundRecord, OutboundRecord, ProducerClient,
};
use crate::{EventError, Result};

#[derive(Debug, Clone)]
struct StoredRecord {
    key: String,
    payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct BrokerState {
    /// topic -> partition -> records; the index of a record is its offset.
    topics: HashMap<String, Vec<Vec<StoredRecord>>>,
    /// (group, topic, partition) -> next offset to deliver.
    committed: HashMap<(String, String, i32), i64>,
}

struct Shared {
    state: Mutex<BrokerState>,
    partitions: i32,
    /// Bumped on every append so idle consumers wake up.
    appended: watch::Sender<u64>,
    fail_on_connect: AtomicBool,
    fail_on_send: AtomicBool,
}

/// In-memory broker with partitioned topics and consumer-group offsets.
///
/// Topics are created on first write with the broker's partition count.
/// Consumers of a new group start from the earliest offset.
#[derive(Clone)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    /// Creates a broker whose topics have `partitions` partitions.
    pub fn new(partitions: i32) -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BrokerState::default()),
                partitions: partitions.max(1),
                appended,
                fail_on_connect: AtomicBool::new(false),
                fail_on_send: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the partition count used for new topics.
    pub fn partitions(&self) -> i32 {
        self.shared.partitions
    }

    /// Configures client construction to fail.
    pub fn set_fail_on_connect(&self, fail: bool) {
        self.shared.fail_on_connect.store(fail, Ordering::SeqCst);
    }

    /// Configures every send to be rejected by the broker.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.shared.fail_on_send.store(fail, Ordering::SeqCst);
    }

    /// Returns every record of a topic, partition by partition.
    pub async fn records(&self, topic: &str) -> Vec<InboundRecord> {
        let state = self.shared.state.lock().await;
        let Some(partitions) = state.topics.get(topic) else {
            return Vec::new();
        };

        partitions
            .iter()
            .enumerate()
            .flat_map(|(partition, records)| {
                records
                    .iter()
                    .enumerate()
                    .map(move |(offset, record)| InboundRecord {
                        topic: topic.to_string(),
                        partition: partition as i32,
                        offset: offset as i64,
                        key: Some(record.key.clone()),
                        payload: record.payload.clone(),
                    })
            })
            .collect()
    }

    /// Returns the next offset the group will receive on a partition.
    pub async fn committed_offset(&self, group: &str, topic: &str, partition: i32) -> i64 {
        let state = self.shared.state.lock().await;
        state
            .committed
            .get(&(group.to_string(), topic.to_string(), partition))
            .copied()
            .unwrap_or(0)
    }

    fn check_connect(&self) -> Result<()> {
        if self.shared.fail_on_connect.load(Ordering::SeqCst) {
            return Err(EventError::ClientCreation(
                "broker unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PARTITIONS)
    }
}

impl EventBroker for InMemoryBroker {
    fn create_producer(&self) -> Result<Box<dyn ProducerClient>> {
        self.check_connect()?;
        Ok(Box::new(InMemoryProducer {
            shared: Arc::clone(&self.shared),
        }))
    }

    fn subscribe(&self, group: &str, topic: &str) -> Result<Box<dyn ConsumerClient>> {
        self.check_connect()?;
        Ok(Box::new(InMemoryConsumer {
            appended: self.shared.appended.subscribe(),
            shared: Arc::clone(&self.shared),
            group: group.to_string(),
            topic: topic.to_string(),
            positions: HashMap::new(),
            next_partition: 0,
        }))
    }
}

struct InMemoryProducer {
    shared: Arc<Shared>,
}

#[async_trait]
impl ProducerClient for InMemoryProducer {
    async fn send(&self, record: OutboundRecord) -> Result<DeliveryReport> {
        if self.shared.fail_on_send.load(Ordering::SeqCst) {
            return Err(EventError::Delivery("broker rejected record".to_string()));
        }

        let mut state = self.shared.state.lock().await;
        let partitions = state
            .topics
            .entry(record.topic.clone())
            .or_insert_with(|| vec![Vec::new(); self.shared.partitions as usize]);

        let log = usize::try_from(record.partition)
            .ok()
            .and_then(|p| partitions.get_mut(p))
            .ok_or_else(|| {
                EventError::Delivery(format!(
                    "unknown partition {} for topic {}",
                    record.partition, record.topic
                ))
            })?;

        let offset = log.len() as i64;
        log.push(StoredRecord {
            key: record.key.clone(),
            payload: record.payload,
        });
        drop(state);

        self.shared.appended.send_modify(|seq| *seq += 1);

        Ok(DeliveryReport {
            topic: record.topic,
            partition: record.partition,
            offset,
            key: record.key,
        })
    }

    async fn flush(&self, _timeout: Duration) -> Result<()> {
        // Sends are acknowledged synchronously; nothing is ever queued.
        Ok(())
    }
}

struct InMemoryConsumer {
    shared: Arc<Shared>,
    appended: watch::Receiver<u64>,
    group: String,
    topic: String,
    /// partition -> next offset to fetch for this client.
    positions: HashMap<i32, i64>,
    next_partition: i32,
}

impl InMemoryConsumer {
    async fn try_next(&mut self) -> Option<InboundRecord> {
        let state = self.shared.state.lock().await;
        let partitions = state.topics.get(&self.topic)?;
        let count = partitions.len() as i32;

        // Round-robin across partitions so one busy partition cannot starve the rest.
        for step in 0..count {
            let partition = (self.next_partition + step) % count;
            let committed = state
                .committed
                .get(&(self.group.clone(), self.topic.clone(), partition))
                .copied()
                .unwrap_or(0);
            let position = self.positions.entry(partition).or_insert(committed);

            if let Some(record) = partitions[partition as usize].get(*position as usize) {
                let inbound = InboundRecord {
                    topic: self.topic.clone(),
                    partition,
                    offset: *position,
                    key: Some(record.key.clone()),
                    payload: record.payload.clone(),
                };
                *position += 1;
                self.next_partition = (partition + 1) % count;
                return Some(inbound);
            }
        }

        None
    }
}

#[async_trait]
impl ConsumerClient for InMemoryConsumer {
    async fn poll(&mut self) -> Result<InboundRecord> {
        loop {
            // Mark the current sequence as seen before looking, so an append
            // racing with the lookup still wakes the wait below.
            self.appended.borrow_and_update();

            if let Some(record) = self.try_next().await {
                return Ok(record);
            }

            self.appended
                .changed()
                .await
                .map_err(|e| EventError::Poll(e.to_string()))?;
        }
    }

    async fn commit(&mut self, record: &InboundRecord) -> Result<()> {
        let mut state = self.shared.state.lock().await;
        let next = record.offset + 1;
        let committed = state
            .committed
            .entry((self.group.clone(), record.topic.clone(), record.partition))
            .or_insert(0);
        *committed = (*committed).max(next);
        Ok(())
    }
}

//! Background consumer of order events with a start/stop lifecycle.

use std::sync::Arc;

use common::Order;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::broker::{ConsumerClient, EventBroker, InboundRecord};
use crate::config::EventsConfig;
use crate::handler::OrderEventHandler;
use crate::Result;

enum ConsumerState {
    Stopped,
    Running {
        stop: watch::Sender<bool>,
        task: JoinHandle<()>,
    },
}

/// Consumes order events on a background task.
///
/// Lifecycle is `Stopped -> Running -> Stopped`. Transitions are serialized
/// by a mutex; starting a running consumer or stopping a stopped one changes
/// nothing and reports `false`.
pub struct OrderConsumer {
    broker: Arc<dyn EventBroker>,
    topic: String,
    group: String,
    handler: Arc<dyn OrderEventHandler>,
    state: Mutex<ConsumerState>,
}

impl OrderConsumer {
    /// Creates a stopped consumer for the configured topic and group.
    pub fn new(
        broker: Arc<dyn EventBroker>,
        config: &EventsConfig,
        handler: Arc<dyn OrderEventHandler>,
    ) -> Self {
        Self {
            broker,
            topic: config.topic.clone(),
            group: config.consumer_group.clone(),
            handler,
            state: Mutex::new(ConsumerState::Stopped),
        }
    }

    /// Returns true while the consume loop is running.
    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, ConsumerState::Running { .. })
    }

    /// Subscribes and launches the consume loop.
    ///
    /// Returns `Ok(false)` without side effects if already running. Fails if
    /// the consumer client cannot be built or subscribed, leaving the
    /// consumer stopped.
    #[tracing::instrument(skip(self), fields(topic = %self.topic, group = %self.group))]
    pub async fn start(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        if matches!(*state, ConsumerState::Running { .. }) {
            tracing::warn!("order consumer is already running");
            return Ok(false);
        }

        let client = self
            .broker
            .subscribe(&self.group, &self.topic)
            .inspect_err(|e| tracing::error!(error = %e, "failed to create order consumer"))?;

        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(consume_loop(client, Arc::clone(&self.handler), stop_rx));
        *state = ConsumerState::Running { stop, task };

        tracing::info!("order consumer started");
        Ok(true)
    }

    /// Signals the consume loop to exit.
    ///
    /// Returns `false` without side effects if not running. The loop finishes
    /// the record it is processing, if any, before exiting.
    #[tracing::instrument(skip(self), fields(topic = %self.topic, group = %self.group))]
    pub async fn stop(&self) -> bool {
        self.take_running().await.is_some()
    }

    /// Stops the consumer and waits for the loop to exit.
    pub async fn shutdown(&self) {
        let Some(task) = self.take_running().await else {
            return;
        };
        if let Err(e) = task.await {
            tracing::error!(error = %e, "order consumer task failed");
        }
    }

    async fn take_running(&self) -> Option<JoinHandle<()>> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, ConsumerState::Stopped) {
            ConsumerState::Running { stop, task } => {
                // The loop may already be gone; a closed channel is fine.
                let _ = stop.send(true);
                tracing::info!("order consumer stopped");
                Some(task)
            }
            ConsumerState::Stopped => {
                tracing::warn!("order consumer is not running");
                None
            }
        }
    }
}

async fn consume_loop(
    mut client: Box<dyn ConsumerClient>,
    handler: Arc<dyn OrderEventHandler>,
    mut stop: watch::Receiver<bool>,
) {
    tracing::info!("order consumer listening");

    loop {
        let polled = tokio::select! {
            biased;
            _ = stop.changed() => break,
            polled = client.poll() => polled,
        };

        match polled {
            Ok(record) => process(client.as_mut(), handler.as_ref(), record).await,
            // The client reconnects on its own; no backoff at this layer.
            Err(e) => tracing::error!(error = %e, "order consumer poll failed"),
        }
    }

    tracing::info!("order consumer loop exited");
}

async fn process(
    client: &mut dyn ConsumerClient,
    handler: &dyn OrderEventHandler,
    record: InboundRecord,
) {
    match serde_json::from_slice::<Order>(&record.payload) {
        Ok(order) => {
            metrics::counter!("order_events_consumed_total").increment(1);
            tracing::debug!(
                partition = record.partition,
                offset = record.offset,
                order_id = %order.id,
                "decoded order event"
            );
            if let Err(e) = handler.handle(record.key.as_deref(), order).await {
                tracing::error!(
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "order event handler failed"
                );
            }
        }
        Err(e) => {
            // No dead-letter topic: the record is skipped.
            metrics::counter!("order_events_decode_failed_total").increment(1);
            tracing::error!(
                partition = record.partition,
                offset = record.offset,
                error = %e,
                "failed to decode order event"
            );
        }
    }

    if let Err(e) = client.commit(&record).await {
        tracing::warn!(
            partition = record.partition,
            offset = record.offset,
            error = %e,
            "failed to commit order event offset"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventError, InMemoryBroker, LogOrderEvents};

    fn consumer(broker: &InMemoryBroker) -> OrderConsumer {
        OrderConsumer::new(
            Arc::new(broker.clone()),
            &EventsConfig::default(),
            Arc::new(LogOrderEvents),
        )
    }

    #[tokio::test]
    async fn start_twice_reports_already_running() {
        let broker = InMemoryBroker::default();
        let consumer = consumer(&broker);

        assert!(consumer.start().await.unwrap());
        assert!(!consumer.start().await.unwrap());
        assert!(consumer.is_running().await);

        consumer.shutdown().await;
    }

    #[tokio::test]
    async fn stop_when_stopped_is_a_no_op() {
        let broker = InMemoryBroker::default();
        let consumer = consumer(&broker);

        assert!(!consumer.stop().await);
        assert!(consumer.start().await.unwrap());
        assert!(consumer.stop().await);
        assert!(!consumer.stop().await);
        assert!(!consumer.is_running().await);
    }

    #[tokio::test]
    async fn failed_subscribe_leaves_consumer_stopped() {
        let broker = InMemoryBroker::default();
        broker.set_fail_on_connect(true);
        let consumer = consumer(&broker);

        let result = consumer.start().await;
        assert!(matches!(result, Err(EventError::ClientCreation(_))));
        assert!(!consumer.is_running().await);

        broker.set_fail_on_connect(false);
        assert!(consumer.start().await.unwrap());
        consumer.shutdown().await;
    }

    #[tokio::test]
    async fn can_restart_after_stop() {
        let broker = InMemoryBroker::default();
        let consumer = consumer(&broker);

        assert!(consumer.start().await.unwrap());
        consumer.shutdown().await;
        assert!(consumer.start().await.unwrap());
        assert!(consumer.is_running().await);
        consumer.shutdown().await;
    }
}

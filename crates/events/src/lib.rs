//! Order events over a partitioned broker.
//!
//! [`OrderPublisher`] writes each persisted order as a JSON record keyed by
//! the order id, on partition `id mod partitions`. [`OrderConsumer`] reads the
//! topic under a consumer group and hands decoded orders to an
//! [`OrderEventHandler`].
//!
//! The broker is abstracted behind [`EventBroker`]. [`InMemoryBroker`] is
//! always available; `KafkaBroker` needs the `kafka` feature.

pub mod broker;
pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod publisher;

pub use broker::{
    ConsumerClient, DeliveryReport, EventBroker, InboundRecord, OutboundRecord, ProducerClient,
    partition_for,
};
pub use config::EventsConfig;
pub use consumer::OrderConsumer;
pub use error::{EventError, Result};
pub use handler::{LogOrderEvents, OrderEventHandler};
#[cfg(feature = "kafka")]
pub use kafka::KafkaBroker;
pub use memory::InMemoryBroker;
pub use publisher::OrderPublisher;

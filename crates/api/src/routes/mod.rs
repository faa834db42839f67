pub mod consumer;
pub mod health;
pub mod metrics;
pub mod orders;

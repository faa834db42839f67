//! Order domain: request validation and the create, persist and publish
//! workflow.
//!
//! [`OrderService`] is the entry point. It validates requests against the
//! rule tables in [`validation`], persists through an
//! [`order_store::OrderStore`] and publishes created orders through an
//! [`events::OrderPublisher`].

pub mod commands;
pub mod error;
pub mod service;
pub mod validation;

pub use commands::{CreateOrder, OrderItemRequest, UpdateOrderStatus};
pub use error::{DomainError, Result};
pub use service::OrderService;
pub use validation::{Rule, create_violations, validate_create, validate_update};

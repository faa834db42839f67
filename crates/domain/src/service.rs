//! Order service: validate, persist, then publish.

use common::{Order, OrderId};
use events::OrderPublisher;
use order_store::OrderStore;

use crate::commands::{CreateOrder, UpdateOrderStatus};
use crate::error::{DomainError, Result};
use crate::validation::{validate_create, validate_update};

/// Service for managing orders.
///
/// Wraps an [`OrderStore`] and an [`OrderPublisher`]. Creating an order
/// publishes it on a detached task once it has been persisted; the caller
/// never waits for the broker.
pub struct OrderService<S: OrderStore> {
    store: S,
    publisher: OrderPublisher,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates a new order service.
    pub fn new(store: S, publisher: OrderPublisher) -> Self {
        Self { store, publisher }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the publisher used for order events.
    pub fn publisher(&self) -> &OrderPublisher {
        &self.publisher
    }

    /// Validates and persists a new order, then publishes it.
    ///
    /// Returns the stored order with its generated ids. A publish failure
    /// never fails the request.
    #[tracing::instrument(skip(self, request), fields(user_id = ?request.user_id))]
    pub async fn create_order(&self, request: CreateOrder) -> Result<Order> {
        let new_order = validate_create(&request).inspect_err(|e| {
            tracing::info!(error = %e, "rejected create order request");
        })?;

        let order = self.store.create(new_order).await.inspect_err(|e| {
            tracing::error!(error = %e, "failed to create order");
        })?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            total_amount = %order.total_amount,
            items = order.item_count(),
            "order created"
        );

        self.publisher.publish_detached(order.clone());
        Ok(order)
    }

    /// Loads an order by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .get(id)
            .await?
            .ok_or(DomainError::NotFound(id))
    }

    /// Loads every live order.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list().await?)
    }

    /// Replaces the status of an existing order.
    ///
    /// The status is validated before the order is looked up, so an invalid
    /// body is reported even for a missing order.
    #[tracing::instrument(skip(self, request))]
    pub async fn update_status(&self, id: OrderId, request: UpdateOrderStatus) -> Result<Order> {
        let status = validate_update(&request)?;

        let mut order = self.get_order(id).await?;
        let previous = order.status;
        order.status = status;

        let updated = self.store.update(&order).await?;
        tracing::info!(order_id = %id, from = %previous, to = %status, "order status updated");
        Ok(updated)
    }

    /// Soft-deletes an order and its items.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<()> {
        self.store.delete(id).await?;
        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }
}

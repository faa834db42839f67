use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::OrderItemId;
use tokio::sync::RwLock;

use crate::{
    NewOrder, Order, OrderId, OrderItem, OrderStoreError, Result,
    store::{OrderStore, check_constraints},
};

#[derive(Debug, Default)]
struct State {
    orders: BTreeMap<OrderId, Order>,
    last_order_id: i64,
    last_item_id: i64,
}

/// In-memory order store implementation.
///
/// Provides the same interface and constraint checks as the PostgreSQL
/// implementation. Deleted orders are kept with `deleted_at` set and hidden
/// from every read.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored rows, deleted ones included.
    pub async fn row_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all orders and resets id sequences.
    pub async fn clear(&self) {
        *self.state.write().await = State::default();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    #[tracing::instrument(skip(self, order), fields(user_id = %order.user_id, items = order.order_items.len()))]
    async fn create(&self, order: NewOrder) -> Result<Order> {
        // Checked before any id is consumed so failed creates leave no trace.
        check_constraints(&order)?;

        let mut state = self.state.write().await;
        let now = Utc::now();

        state.last_order_id += 1;
        let id = OrderId::new(state.last_order_id);

        let mut items = Vec::with_capacity(order.order_items.len());
        for item in order.order_items {
            state.last_item_id += 1;
            items.push(OrderItem {
                id: OrderItemId::new(state.last_item_id),
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        let stored = Order {
            id,
            user_id: order.user_id,
            status: order.status,
            total_amount: order.total_amount,
            order_items: items,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.orders.insert(id, stored.clone());

        Ok(stored)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .get(&id)
            .filter(|order| !order.is_deleted())
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|order| !order.is_deleted())
            .cloned()
            .collect())
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn update(&self, order: &Order) -> Result<Order> {
        let mut state = self.state.write().await;
        let stored = state
            .orders
            .get_mut(&order.id)
            .filter(|stored| !stored.is_deleted())
            .ok_or(OrderStoreError::NotFound(order.id))?;

        stored.status = order.status;
        stored.total_amount = order.total_amount;
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .orders
            .get_mut(&id)
            .filter(|stored| !stored.is_deleted())
            .ok_or(OrderStoreError::NotFound(id))?;

        stored.deleted_at = Some(Utc::now());
        Ok(())
    }
}

use async_trait::async_trait;

use crate::{Money, NewOrder, NewOrderItem, Order, OrderId, OrderStoreError, Result};

/// Persistence gateway for the order aggregate.
///
/// An order and its items are always written and read as one unit. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order and all of its items atomically.
    ///
    /// Returns the stored aggregate with its generated identifiers. On failure
    /// nothing is observable to subsequent reads.
    async fn create(&self, order: NewOrder) -> Result<Order>;

    /// Loads a live order with its items in insertion order.
    ///
    /// Returns None if no order exists or it has been deleted.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads every live order, ordered by id.
    async fn list(&self) -> Result<Vec<Order>>;

    /// Replaces the mutable fields of an existing order.
    ///
    /// Items are not touched. Fails with `NotFound` if the order is gone.
    async fn update(&self, order: &Order) -> Result<Order>;

    /// Soft-deletes an order together with its items.
    ///
    /// Fails with `NotFound` if no live order has the given id.
    async fn delete(&self, id: OrderId) -> Result<()>;
}

/// Checks the row-level constraints the schema enforces.
///
/// Mirrors the `CHECK` clauses of the `orders` and `order_items` tables so
/// that every store rejects the same rows.
pub fn check_constraints(order: &NewOrder) -> Result<()> {
    for item in &order.order_items {
        check_item(item)?;
    }

    if order.total_amount < Money::MIN_UNIT_PRICE {
        return Err(OrderStoreError::ConstraintViolation(format!(
            "total_amount {} is below {}",
            order.total_amount,
            Money::MIN_UNIT_PRICE
        )));
    }

    Ok(())
}

fn check_item(item: &NewOrderItem) -> Result<()> {
    if item.quantity == 0 {
        return Err(OrderStoreError::ConstraintViolation(
            "quantity must be greater than 0".to_string(),
        ));
    }
    if i32::try_from(item.quantity).is_err() {
        return Err(OrderStoreError::ConstraintViolation(format!(
            "quantity {} exceeds {}",
            item.quantity,
            i32::MAX
        )));
    }
    if item.unit_price < Money::MIN_UNIT_PRICE {
        return Err(OrderStoreError::ConstraintViolation(format!(
            "unit_price {} is below {}",
            item.unit_price,
            Money::MIN_UNIT_PRICE
        )));
    }
    Ok(())
}

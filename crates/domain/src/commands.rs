//! Inbound order requests as parsed from JSON.
//!
//! Every field is optional so that a structurally valid body with missing or
//! out-of-range values reaches validation instead of failing to parse.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to create an order with its items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOrder {
    pub user_id: Option<i64>,
    pub status: Option<String>,
    pub order_items: Option<Vec<OrderItemRequest>>,
}

/// One requested line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderItemRequest {
    pub product_id: Option<i64>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

impl OrderItemRequest {
    pub fn new(product_id: i64, quantity: i64, unit_price: Decimal) -> Self {
        Self {
            product_id: Some(product_id),
            quantity: Some(quantity),
            unit_price: Some(unit_price),
        }
    }
}

impl CreateOrder {
    /// Creates a fully populated request.
    pub fn new(user_id: i64, status: impl Into<String>, order_items: Vec<OrderItemRequest>) -> Self {
        Self {
            user_id: Some(user_id),
            status: Some(status.into()),
            order_items: Some(order_items),
        }
    }
}

/// Request to replace an order's status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOrderStatus {
    pub status: Option<String>,
}

impl UpdateOrderStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
        }
    }
}

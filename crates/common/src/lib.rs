//! Order aggregate model shared by the store, the event stream and the HTTP layer.

pub mod order;
pub mod types;

pub use order::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, UnknownStatus, total_amount,
};
pub use types::{Money, OrderId, OrderItemId, ProductId, UserId};

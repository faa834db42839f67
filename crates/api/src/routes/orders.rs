//! Order CRUD endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Order, OrderId};
use domain::{CreateOrder, OrderService, UpdateOrderStatus};
use events::OrderConsumer;
use order_store::OrderStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::users::{User, UserDirectory, find_or_default};

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub order_service: OrderService<S>,
    pub consumer: OrderConsumer,
    pub users: Arc<dyn UserDirectory>,
}

/// An order together with its owner's details.
#[derive(Serialize)]
pub struct OrderWithUser {
    pub order: Order,
    pub user: User,
}

/// POST /orders: validate, persist and publish a new order.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateOrder>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(request) = body?;
    let order = state.order_service.create_order(request).await?;
    Ok(Json(order))
}

/// GET /orders: list every live order.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.order_service.list_orders().await?))
}

/// GET /orders/{id}: load an order and its owner.
///
/// The user lookup is best-effort; a failed lookup yields an empty user.
#[tracing::instrument(skip(state, id))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<OrderWithUser>, ApiError> {
    let Path(id) = id?;
    let order = state.order_service.get_order(OrderId::new(id)).await?;
    let user = find_or_default(state.users.as_ref(), order.user_id).await;
    Ok(Json(OrderWithUser { order, user }))
}

/// PUT /orders/{id}: replace an order's status.
#[tracing::instrument(skip(state, id, body))]
pub async fn update<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateOrderStatus>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = id?;
    let Json(request) = body?;
    let order = state
        .order_service
        .update_status(OrderId::new(id), request)
        .await?;
    Ok(Json(order))
}

/// DELETE /orders/{id}: soft-delete an order.
#[tracing::instrument(skip(state, id))]
pub async fn delete<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.order_service.delete_order(OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

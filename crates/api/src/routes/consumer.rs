//! Start and stop controls for the order event consumer.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use order_store::OrderStore;
use serde::Serialize;

use super::orders::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ConsumerResponse {
    pub message: &'static str,
}

/// GET /orders/consumer/start
#[tracing::instrument(skip(state))]
pub async fn start<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ConsumerResponse>, ApiError> {
    let message = if state.consumer.start().await? {
        "Order consumer started successfully"
    } else {
        "Order consumer is already running"
    };
    Ok(Json(ConsumerResponse { message }))
}

/// GET /orders/consumer/stop
#[tracing::instrument(skip(state))]
pub async fn stop<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<ConsumerResponse> {
    let message = if state.consumer.stop().await {
        "Order consumer stopped successfully"
    } else {
        "Order consumer is not running"
    };
    Json(ConsumerResponse { message })
}

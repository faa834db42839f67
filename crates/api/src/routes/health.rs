//! Liveness endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use order_store::OrderStore;
use serde::Serialize;

use super::orders::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub consumer: &'static str,
}

/// GET /health: reports liveness and whether the event consumer runs.
pub async fn check<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    let consumer = if state.consumer.is_running().await {
        "running"
    } else {
        "stopped"
    };
    Json(HealthResponse {
        status: "ok",
        consumer,
    })
}

//! HTTP API server for orders and the order event consumer.
//!
//! Provides REST endpoints for order management and consumer control, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod users;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::get;
use domain::OrderService;
use events::{EventBroker, EventsConfig, LogOrderEvents, OrderConsumer, OrderPublisher};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;
use users::UserDirectory;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .put(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route("/orders/consumer/start", get(routes::consumer::start::<S>))
        .route("/orders/consumer/stop", get(routes::consumer::stop::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %uuid::Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

/// Wires the order service, publisher and consumer over a store and broker.
///
/// The consumer starts stopped and logs every event it receives.
pub fn create_state<S: OrderStore + 'static>(
    store: S,
    broker: Arc<dyn EventBroker>,
    events: &EventsConfig,
    users: Arc<dyn UserDirectory>,
) -> Arc<AppState<S>> {
    let publisher = OrderPublisher::new(Arc::clone(&broker), events);
    let consumer = OrderConsumer::new(broker, events, Arc::new(LogOrderEvents));

    Arc::new(AppState {
        order_service: OrderService::new(store, publisher),
        consumer,
        users,
    })
}

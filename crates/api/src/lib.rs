//! HTTP transport for the seat booking engine.
//!
//! Exposes show setup, seat holds, order drafts and confirmation as REST
//! endpoints, with structured logging (tracing) and Prometheus metrics.
//! Callers identify their session with the `x-owner-token` header.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use booking::{BookingEngine, Clock, EngineConfig, InMemoryOrderStore, OrderStore};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/shows", post(routes::shows::register::<S>))
        .route("/shows/{show_id}/seats", get(routes::shows::seats::<S>))
        .route("/shows/{show_id}/holds", post(routes::holds::create::<S>))
        .route(
            "/holds/{id}",
            get(routes::holds::get::<S>).delete(routes::holds::release::<S>),
        )
        .route("/holds/{id}/extend", post(routes::holds::extend::<S>))
        .route(
            "/drafts/{id}",
            put(routes::drafts::put::<S>)
                .patch(routes::drafts::patch::<S>)
                .get(routes::drafts::get::<S>),
        )
        .route("/drafts/{id}/confirm", post(routes::drafts::confirm::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Registers help text for the engine's metrics with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!("holds_created_total", "Seat holds created");
    metrics::describe_counter!(
        "hold_conflicts_total",
        "Hold requests rejected because a seat was taken"
    );
    metrics::describe_counter!("holds_released_total", "Holds released by their owner");
    metrics::describe_counter!("holds_expired_total", "Holds expired by TTL");
    metrics::describe_counter!("orders_confirmed_total", "Orders confirmed");
    metrics::describe_histogram!(
        "order_confirm_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent confirming an order"
    );
    metrics::describe_counter!("sweep_runs_total", "Expiry sweep passes");
    metrics::describe_counter!("sweep_errors_total", "Holds the sweeper failed to expire");
    metrics::describe_counter!(
        "lazy_expiry_errors_total",
        "Due holds that could not be expired on access"
    );
}

/// Creates application state backed by the in-memory order store.
pub fn create_default_state(
    config: EngineConfig,
    clock: Arc<dyn Clock>,
) -> Arc<AppState<InMemoryOrderStore>> {
    Arc::new(AppState {
        engine: BookingEngine::new(InMemoryOrderStore::new(), clock, config),
    })
}

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{distillations, handlers, metrics, queue};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(metrics::export))
        // Distillations
        .route("/distillations", post(distillations::create_distillation))
        .route("/distillations", get(distillations::list_distillations))
        .route("/distillations/{id}", get(distillations::get_distillation))
        .route("/distillations/{id}", delete(distillations::delete_distillation))
        .route("/distillations/{id}/stop", post(distillations::stop_distillation))
        .route("/distillations/{id}/retry", post(distillations::retry_distillation))
        .route("/distillations/{id}/logs", get(distillations::get_logs))
        // Admission queue
        .route("/queue", get(queue::get_status))
        .route("/queue/concurrency", put(queue::set_concurrency))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
}

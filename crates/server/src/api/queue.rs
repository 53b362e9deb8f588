//! Admission queue API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use alembic_core::OrchestratorStatus;

use crate::state::AppState;

/// Request body for changing the concurrency limit
#[derive(Debug, Deserialize)]
pub struct SetConcurrencyBody {
    /// New limit; clamped to [1, 10]
    pub limit: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct QueueErrorResponse {
    pub error: String,
}

/// Get orchestrator and queue status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<OrchestratorStatus> {
    Json(state.orchestrator().status())
}

/// Change the concurrency limit. Running distillations are unaffected.
pub async fn set_concurrency(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetConcurrencyBody>,
) -> impl IntoResponse {
    if body.limit == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(QueueErrorResponse {
                error: "limit must be at least 1".to_string(),
            }),
        )
            .into_response();
    }

    state.orchestrator().set_concurrency(body.limit);
    Json(state.orchestrator().status()).into_response()
}

//! Distillation API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use alembic_core::{
    classify_url, Distillation, DistillationFilter, DistillationStatus, ExtractionMetadata,
    FileSource, LogEntry, OrchestratorError, SourceDescriptor, StoreError,
};

use crate::state::AppState;

/// Maximum allowed limit for list queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for list queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a distillation
#[derive(Debug, Deserialize)]
pub struct CreateDistillationBody {
    /// URL to distill (web page, YouTube video or playlist)
    pub url: Option<String>,
    /// Uploaded file descriptor (alternative to url)
    pub file: Option<FileBody>,
}

/// File descriptor in request body
#[derive(Debug, Deserialize)]
pub struct FileBody {
    /// Original file name
    pub name: String,
    /// Media type as reported at upload
    pub media_type: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Server-local path to the stored file
    pub path: Option<String>,
}

/// Query parameters for listing distillations
#[derive(Debug, Deserialize)]
pub struct ListDistillationsParams {
    /// Filter by status
    pub status: Option<String>,
    /// Filter by source kind
    pub kind: Option<String>,
    /// Maximum number of records to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Response for distillation operations
#[derive(Debug, Serialize)]
pub struct DistillationResponse {
    pub id: String,
    pub status: DistillationStatus,
    pub source: SourceDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_step: Option<String>,
    pub queued_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_metadata: Option<ExtractionMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Distillation> for DistillationResponse {
    fn from(record: Distillation) -> Self {
        Self {
            id: record.id,
            status: record.status,
            source: record.source,
            processing_step: record.processing_step,
            queued_at: record.queued_at.to_rfc3339(),
            started_at: record.started_at.map(|t| t.to_rfc3339()),
            completed_at: record.completed_at.map(|t| t.to_rfc3339()),
            content: record.content,
            extraction_metadata: record.extraction_metadata,
            word_count: record.word_count,
            processing_time_ms: record.processing_time_ms,
            error: record.error,
        }
    }
}

/// Response for listing distillations
#[derive(Debug, Serialize)]
pub struct ListDistillationsResponse {
    pub distillations: Vec<DistillationResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// One log entry in the logs response
#[derive(Debug, Serialize)]
pub struct LogEntryResponse {
    pub timestamp: String,
    pub level: alembic_core::LogLevel,
    pub message: String,
}

impl From<LogEntry> for LogEntryResponse {
    fn from(entry: LogEntry) -> Self {
        Self {
            timestamp: entry.timestamp.to_rfc3339(),
            level: entry.level,
            message: entry.message,
        }
    }
}

/// Response for stop requests
#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct DistillationErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(DistillationErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn orchestrator_error(err: OrchestratorError) -> axum::response::Response {
    match &err {
        OrchestratorError::NotFound(_) => error_response(StatusCode::NOT_FOUND, err.to_string()),
        OrchestratorError::InvalidSource(_) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        OrchestratorError::NotRetryable { .. } => {
            error_response(StatusCode::CONFLICT, err.to_string())
        }
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new distillation from a URL or a file descriptor
pub async fn create_distillation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateDistillationBody>,
) -> axum::response::Response {
    let source = match (body.url, body.file) {
        (Some(url), None) => {
            let kind = classify_url(&url);
            SourceDescriptor::url(url, kind)
        }
        (None, Some(file)) => SourceDescriptor::file(FileSource {
            name: file.name,
            media_type: file.media_type,
            size_bytes: file.size_bytes,
            path: file.path,
        }),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "exactly one of url or file is required",
            )
        }
    };

    match state.orchestrator().submit(source) {
        Ok(record) => (
            StatusCode::CREATED,
            Json(DistillationResponse::from(record)),
        )
            .into_response(),
        Err(e) => orchestrator_error(e),
    }
}

/// Get a distillation by ID
pub async fn get_distillation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.store().get(&id) {
        Ok(Some(record)) => Json(DistillationResponse::from(record)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Distillation not found: {}", id),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// List distillations with optional filters
pub async fn list_distillations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListDistillationsParams>,
) -> axum::response::Response {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = DistillationFilter::new().with_limit(limit).with_offset(offset);

    if let Some(ref status) = params.status {
        match status.parse::<DistillationStatus>() {
            Ok(status) => filter = filter.with_status(status),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        }
    }

    if let Some(ref kind) = params.kind {
        filter = filter.with_kind(kind);
    }

    let records = match state.store().list(&filter) {
        Ok(records) => records,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    // Total count ignores pagination.
    let count_filter = DistillationFilter {
        limit: i64::MAX,
        offset: 0,
        ..filter
    };
    let total = match state.store().count(&count_filter) {
        Ok(total) => total,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    Json(ListDistillationsResponse {
        distillations: records
            .into_iter()
            .map(DistillationResponse::from)
            .collect(),
        total,
        limit,
        offset,
    })
    .into_response()
}

/// Permanently delete a distillation
pub async fn delete_distillation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.store().delete(&id) {
        Ok(record) => Json(DistillationResponse::from(record)).into_response(),
        Err(StoreError::NotFound(_)) => error_response(
            StatusCode::NOT_FOUND,
            format!("Distillation not found: {}", id),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Request a stop. 409 if the distillation is already terminal.
pub async fn stop_distillation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.orchestrator().stop(&id) {
        Ok(true) => Json(StopResponse { stopped: true }).into_response(),
        Ok(false) => error_response(
            StatusCode::CONFLICT,
            format!("Distillation {} is already finished", id),
        ),
        Err(e) => orchestrator_error(e),
    }
}

/// Retry a failed or stopped distillation as a fresh record
pub async fn retry_distillation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.orchestrator().retry(&id) {
        Ok(record) => (
            StatusCode::CREATED,
            Json(DistillationResponse::from(record)),
        )
            .into_response(),
        Err(e) => orchestrator_error(e),
    }
}

/// Get a distillation's append-only log
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.store().get(&id) {
        Ok(Some(record)) => Json(
            record
                .logs
                .into_iter()
                .map(LogEntryResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Distillation not found: {}", id),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

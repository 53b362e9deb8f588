//! Distillation storage trait and types.

use thiserror::Error;

use crate::distillation::{
    Distillation, DistillationStatus, ExtractionMetadata, LogLevel, SourceDescriptor,
};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Distillation not found.
    #[error("distillation not found: {0}")]
    NotFound(String),

    /// The requested status transition is not allowed by the state machine.
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Request to create a new distillation.
#[derive(Debug, Clone)]
pub struct CreateDistillationRequest {
    /// What to distill.
    pub source: SourceDescriptor,
    /// Initial processing step text, if any.
    pub processing_step: Option<String>,
}

impl CreateDistillationRequest {
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            processing_step: None,
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.processing_step = Some(step.into());
        self
    }
}

/// Filter for querying distillations.
#[derive(Debug, Clone)]
pub struct DistillationFilter {
    /// Filter by status.
    pub status: Option<DistillationStatus>,
    /// Filter by source kind string ("web_page", "youtube_video", "file", ...).
    pub kind: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for DistillationFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl DistillationFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            status: None,
            kind: None,
            limit: 100,
            offset: 0,
        }
    }

    /// Filter by status.
    pub fn with_status(mut self, status: DistillationStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by source kind.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for distillation storage backends.
///
/// The store is the single authority on status transitions: `update_status`
/// rejects edges the state machine does not allow, so concurrent writers
/// cannot produce an externally visible invalid state.
pub trait DistillationStore: Send + Sync {
    /// Create a new distillation in `Pending` status.
    fn create(&self, request: CreateDistillationRequest) -> Result<Distillation, StoreError>;

    /// Get a distillation by ID.
    fn get(&self, id: &str) -> Result<Option<Distillation>, StoreError>;

    /// List distillations matching the filter, newest first.
    fn list(&self, filter: &DistillationFilter) -> Result<Vec<Distillation>, StoreError>;

    /// Count distillations matching the filter.
    fn count(&self, filter: &DistillationFilter) -> Result<i64, StoreError>;

    /// Move a distillation to a new status, updating the processing step and
    /// (for `Error`) the error message. Terminal statuses also set
    /// `completed_at`.
    fn update_status(
        &self,
        id: &str,
        status: DistillationStatus,
        step: Option<&str>,
        error: Option<&str>,
    ) -> Result<Distillation, StoreError>;

    /// Record the execution start time. Called when the orchestrator begins
    /// running the job, not when it is enqueued.
    fn mark_started(&self, id: &str) -> Result<Distillation, StoreError>;

    /// Update only the advisory processing step text.
    fn update_step(&self, id: &str, step: &str) -> Result<(), StoreError>;

    /// Store the extraction phase output.
    fn set_extraction(
        &self,
        id: &str,
        raw_content: &str,
        metadata: &ExtractionMetadata,
    ) -> Result<Distillation, StoreError>;

    /// Store the final distilled output and execution stats.
    fn update_content(
        &self,
        id: &str,
        content: &str,
        processing_time_ms: u64,
        word_count: u32,
    ) -> Result<Distillation, StoreError>;

    /// Append a log entry. Logs are never mutated or reordered.
    fn append_log(&self, id: &str, level: LogLevel, message: &str) -> Result<(), StoreError>;

    /// Permanently delete a distillation. Returns the deleted record if found.
    fn delete(&self, id: &str) -> Result<Distillation, StoreError>;
}

//! Types for the distillation orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::queue::QueueStatus;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Distillation not found.
    #[error("distillation not found: {0}")]
    NotFound(String),

    /// The submitted source is not something we can process.
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// The distillation is terminal and cannot be retried from its status.
    #[error("distillation {id} is not retryable from status {status}")]
    NotRetryable { id: String, status: &'static str },

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] crate::distillation::StoreError),

    /// Extraction collaborator error.
    #[error("extraction failed: {0}")]
    Extraction(#[from] crate::extractor::ExtractError),

    /// The extraction phase exceeded its deadline.
    #[error("extraction timed out after {elapsed_secs}s")]
    ExtractionTimeout { elapsed_secs: u64 },

    /// AI provider error.
    #[error("distillation failed: {0}")]
    Distillation(#[from] crate::distiller::DistillError),

    /// The distillation phase exceeded its deadline.
    #[error("distillation timed out after {elapsed_secs}s")]
    DistillationTimeout { elapsed_secs: u64 },

    /// Playlist resolution error.
    #[error("playlist resolution failed: {0}")]
    Playlist(#[from] crate::playlist::PlaylistError),

    /// A stop was requested. Not user-visible as an error; the runner maps it
    /// to the `stopped` status instead of `error`.
    #[error("cancellation requested")]
    Cancelled,

    /// The external call's task died without producing a result.
    #[error("phase task failed: {0}")]
    PhaseTask(String),
}

impl OrchestratorError {
    /// True for outcomes that must land in `stopped`, never `error`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, OrchestratorError::Cancelled)
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    /// Admission queue snapshot.
    pub queue: QueueStatus,
    /// Distillations waiting for a slot.
    pub pending_count: usize,
    /// Distillations in the extraction phase.
    pub extracting_count: usize,
    /// Distillations in the distillation phase.
    pub distilling_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::NotFound("d-456".to_string());
        assert_eq!(err.to_string(), "distillation not found: d-456");

        let err = OrchestratorError::ExtractionTimeout { elapsed_secs: 300 };
        assert_eq!(err.to_string(), "extraction timed out after 300s");
    }

    #[test]
    fn test_cancellation_detection() {
        assert!(OrchestratorError::Cancelled.is_cancellation());
        assert!(!OrchestratorError::NotFound("x".into()).is_cancellation());
        assert!(
            !OrchestratorError::DistillationTimeout { elapsed_secs: 600 }.is_cancellation()
        );
    }
}

//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Distillations (outcomes, phase durations)
//! - Admission queue (depth, running tasks)
//! - Playlist expansion

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

// =============================================================================
// Distillation Metrics
// =============================================================================

/// Finished distillations by terminal status.
pub static DISTILLATIONS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "alembic_distillations_finished_total",
            "Distillations that reached a terminal status",
        ),
        &["status"], // "completed", "error", "stopped"
    )
    .unwrap()
});

/// Phase duration in seconds.
pub static PHASE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "alembic_phase_duration_seconds",
            "Duration of one distillation phase",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        &["phase"], // "extracting", "distilling"
    )
    .unwrap()
});

// =============================================================================
// Queue Metrics
// =============================================================================

/// Tasks waiting for a queue slot.
pub static QUEUE_WAITING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("alembic_queue_waiting", "Tasks waiting for a queue slot").unwrap()
});

/// Tasks currently executing.
pub static QUEUE_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("alembic_queue_running", "Tasks currently executing").unwrap()
});

// =============================================================================
// Playlist Metrics
// =============================================================================

/// Playlist expansions by result.
pub static PLAYLIST_EXPANSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "alembic_playlist_expansions_total",
            "Playlist expansions by result",
        ),
        &["result"], // "dispatched", "resolution_failed"
    )
    .unwrap()
});

/// Child distillations created by playlist expansion.
pub static PLAYLIST_CHILDREN: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "alembic_playlist_children_total",
            "Child distillations created by playlist expansion",
        ),
        &["result"], // "submitted", "failed"
    )
    .unwrap()
});

/// Register all core metrics on the given registry.
pub fn register_all(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(DISTILLATIONS_FINISHED.clone()))?;
    registry.register(Box::new(PHASE_DURATION.clone()))?;
    registry.register(Box::new(QUEUE_WAITING.clone()))?;
    registry.register(Box::new(QUEUE_RUNNING.clone()))?;
    registry.register(Box::new(PLAYLIST_EXPANSIONS.clone()))?;
    registry.register(Box::new(PLAYLIST_CHILDREN.clone()))?;
    Ok(())
}

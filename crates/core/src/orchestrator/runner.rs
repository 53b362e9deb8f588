//! Distillation orchestrator implementation.
//!
//! Drives each distillation through its lifecycle:
//! - Admission: FIFO queue with a bounded concurrency ceiling
//! - Phases: extraction then distillation, each raced against a deadline
//!   and a cancellation signal
//! - Terminal bookkeeping: persisted status is the source of truth

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::cancel::{CancelEntry, CancellationRegistry};
use crate::distillation::{
    CreateDistillationRequest, Distillation, DistillationFilter, DistillationStatus,
    DistillationStore, ExtractionMetadata, LogLevel, SourceDescriptor, SourceKind, StoreError,
};
use crate::distiller::{DistillError, Distiller};
use crate::extractor::Extractor;
use crate::metrics;
use crate::playlist::PlaylistResolver;
use crate::queue::{AdmissionQueue, QueueStatus};

use super::config::OrchestratorConfig;
use super::expander;
use super::types::{OrchestratorError, OrchestratorStatus};

/// Outcome of racing a phase call against its deadline and cancellation.
enum PhaseOutcome<T> {
    /// The external call finished first.
    Done(T),
    /// The deadline fired first.
    TimedOut,
    /// Cancellation was detected first (or the call was aborted).
    Cancelled,
    /// The call's task died without producing a result.
    TaskFailed(String),
}

/// The distillation orchestrator.
///
/// Cheaply cloneable; clones share the queue, the registry and the
/// collaborator handles.
#[derive(Clone)]
pub struct Orchestrator {
    pub(super) config: OrchestratorConfig,
    pub(super) store: Arc<dyn DistillationStore>,
    pub(super) extractor: Arc<dyn Extractor>,
    pub(super) distiller: Arc<dyn Distiller>,
    pub(super) resolver: Arc<dyn PlaylistResolver>,
    pub(super) queue: AdmissionQueue,
    pub(super) registry: Arc<CancellationRegistry>,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn DistillationStore>,
        extractor: Arc<dyn Extractor>,
        distiller: Arc<dyn Distiller>,
        resolver: Arc<dyn PlaylistResolver>,
    ) -> Self {
        let queue = AdmissionQueue::new(config.max_concurrency);
        Self {
            config,
            store,
            extractor,
            distiller,
            resolver,
            queue,
            registry: Arc::new(CancellationRegistry::new()),
        }
    }

    // ========================================================================
    // Outward interface
    // ========================================================================

    /// Submit a source for distillation. Returns the created record; for a
    /// playlist submission this is the transient tracking record, and the
    /// children appear as they are dispatched.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, source: SourceDescriptor) -> Result<Distillation, OrchestratorError> {
        if let SourceDescriptor::Url { url, kind } = &source {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(OrchestratorError::InvalidSource(format!(
                    "not an http(s) URL: {}",
                    url
                )));
            }
            if *kind == SourceKind::YoutubePlaylist {
                return self.submit_playlist(url.clone());
            }
        }

        let record = self
            .store
            .create(CreateDistillationRequest::new(source).with_step("Queued"))?;
        self.store.append_log(
            &record.id,
            LogLevel::Info,
            &format!("Queued distillation of {}", record.source.label()),
        )?;

        info!(id = %record.id, source = %record.source.label(), "distillation submitted");
        self.dispatch(record.id.clone());
        Ok(record)
    }

    /// Request a stop. Accepted only while the distillation is pending or
    /// mid-phase; returns false if it is already terminal.
    pub fn stop(&self, id: &str) -> Result<bool, OrchestratorError> {
        let record = self
            .store
            .get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;

        if record.status.is_terminal() {
            return Ok(false);
        }

        // Fast path first: the flag (plus the abort handle, if a call is in
        // flight) reaches the executor within one poll tick. If no entry
        // exists yet, a flagged one is left for the executor to find.
        let was_executing = self.registry.request_stop(id);

        match self
            .store
            .update_status(id, DistillationStatus::Stopped, Some("Stopped"), None)
        {
            Ok(_) => {
                let _ = self.store.append_log(
                    id,
                    LogLevel::Warning,
                    &format!(
                        "Stop requested while {}; distillation halted",
                        record.status
                    ),
                );
                debug!(%id, was_executing, "stop accepted");
                metrics::DISTILLATIONS_FINISHED
                    .with_label_values(&["stopped"])
                    .inc();
                Ok(true)
            }
            // The executor reached a terminal status in the meantime.
            Err(StoreError::InvalidTransition { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Retry a failed or stopped distillation. Never reopens the old record:
    /// a fresh record with a new id goes through the whole lifecycle, with a
    /// log line pointing back at the original.
    pub fn retry(&self, id: &str) -> Result<Distillation, OrchestratorError> {
        let old = self
            .store
            .get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;

        match old.status {
            DistillationStatus::Error | DistillationStatus::Stopped => {}
            status => {
                return Err(OrchestratorError::NotRetryable {
                    id: id.to_string(),
                    status: status.as_str(),
                })
            }
        }

        let new = self.submit(old.source.clone())?;
        let _ = self.store.append_log(
            &new.id,
            LogLevel::Info,
            &format!("Retry of distillation {}", id),
        );
        Ok(new)
    }

    /// Change the concurrency ceiling (clamped to [1, 10]). Running
    /// distillations are never preempted.
    pub fn set_concurrency(&self, limit: usize) {
        self.queue.set_max_concurrency(limit);
    }

    /// Admission queue snapshot.
    pub fn queue_status(&self) -> QueueStatus {
        self.queue.status()
    }

    /// Current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        let count = |status: DistillationStatus| {
            self.store
                .count(&DistillationFilter::new().with_status(status))
                .unwrap_or(0) as usize
        };

        OrchestratorStatus {
            queue: self.queue.status(),
            pending_count: count(DistillationStatus::Pending),
            extracting_count: count(DistillationStatus::Extracting),
            distilling_count: count(DistillationStatus::Distilling),
        }
    }

    // ========================================================================
    // Submission plumbing
    // ========================================================================

    fn submit_playlist(&self, url: String) -> Result<Distillation, OrchestratorError> {
        let tracking = self.store.create(
            CreateDistillationRequest::new(SourceDescriptor::url(
                url.clone(),
                SourceKind::YoutubePlaylist,
            ))
            .with_step("Resolving playlist"),
        )?;
        self.store.append_log(
            &tracking.id,
            LogLevel::Info,
            "Playlist submitted; resolving items",
        )?;

        info!(id = %tracking.id, %url, "playlist submitted");

        let orchestrator = self.clone();
        let record = tracking.clone();
        tokio::spawn(async move {
            expander::expand_playlist(orchestrator, record, url).await;
        });

        Ok(tracking)
    }

    /// Hand the job to the admission queue. The outcome lands on the record;
    /// the queue handle itself is not needed.
    fn dispatch(&self, id: String) {
        let runner = self.clone();
        let _handle = self
            .queue
            .enqueue(id.clone(), async move { runner.execute(id).await });
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run one distillation to a terminal status. Invoked by the admission
    /// queue once a slot is free.
    async fn execute(self, id: String) {
        // The status may have been flipped while the job waited for a slot.
        let record = match self.store.get(&id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%id, "record vanished before execution");
                self.registry.unregister(&id);
                return;
            }
            Err(e) => {
                error!(%id, "failed to read record before execution: {}", e);
                return;
            }
        };

        if record.status != DistillationStatus::Pending {
            debug!(%id, status = %record.status, "skipping execution, not pending");
            // Collect the flagged-but-empty entry an early stop left behind.
            self.registry.unregister(&id);
            return;
        }

        let entry = self.registry.register(&id);
        // A stop may have slipped in between the read above and registration.
        if entry.is_flagged() {
            self.finalize_stopped(&id);
            self.registry.unregister(&id);
            return;
        }

        let started = Instant::now();
        let result = self.run_to_completion(&id, &record, &entry, started).await;

        match result {
            Ok(()) => {
                metrics::DISTILLATIONS_FINISHED
                    .with_label_values(&["completed"])
                    .inc();
            }
            Err(err) if err.is_cancellation() => {
                info!(%id, "distillation stopped");
                self.finalize_stopped(&id);
            }
            Err(err) => {
                let elapsed = started.elapsed().as_secs();
                let message = err.to_string();
                warn!(%id, elapsed_secs = elapsed, "distillation failed: {}", message);
                let _ = self.store.append_log(
                    &id,
                    LogLevel::Error,
                    &format!("{} (after {}s)", message, elapsed),
                );
                match self.store.update_status(
                    &id,
                    DistillationStatus::Error,
                    Some("Failed"),
                    Some(&message),
                ) {
                    Ok(_) => {
                        metrics::DISTILLATIONS_FINISHED
                            .with_label_values(&["error"])
                            .inc();
                    }
                    // A stop won the race; the stopped status stays.
                    Err(StoreError::InvalidTransition { .. }) => {}
                    Err(e) => error!(%id, "failed to persist error status: {}", e),
                }
            }
        }

        self.registry.unregister(&id);
    }

    /// Execute both phases. Any error (including `Cancelled`) is handled by
    /// the caller; this function only moves forward.
    async fn run_to_completion(
        &self,
        id: &str,
        record: &Distillation,
        entry: &Arc<CancelEntry>,
        started: Instant,
    ) -> Result<(), OrchestratorError> {
        self.store.mark_started(id)?;
        self.transition(id, DistillationStatus::Extracting, "Extracting content")?;
        self.store.append_log(
            id,
            LogLevel::Info,
            &format!("Extraction started for {}", record.source.label()),
        )?;

        // Phase 1: extraction.
        let phase_started = Instant::now();
        let extractor = Arc::clone(&self.extractor);
        let source = record.source.clone();
        let outcome = self
            .run_phase(id, entry, self.config.extraction_timeout(), async move {
                match source {
                    SourceDescriptor::Url { url, .. } => extractor.extract_from_url(&url).await,
                    SourceDescriptor::File(file) => extractor.extract_from_file(&file).await,
                }
            })
            .await;

        let extracted = match outcome {
            PhaseOutcome::Done(Ok(content)) => content,
            PhaseOutcome::Done(Err(e)) => return Err(e.into()),
            PhaseOutcome::TimedOut => {
                return Err(OrchestratorError::ExtractionTimeout {
                    elapsed_secs: self.config.extraction_timeout_secs,
                })
            }
            PhaseOutcome::Cancelled => return Err(OrchestratorError::Cancelled),
            PhaseOutcome::TaskFailed(msg) => return Err(OrchestratorError::PhaseTask(msg)),
        };
        metrics::PHASE_DURATION
            .with_label_values(&["extracting"])
            .observe(phase_started.elapsed().as_secs_f64());

        let metadata = ExtractionMetadata {
            title: extracted.title.clone(),
            content_type: Some(extracted.content_type.clone()),
            extraction_method: Some(extracted.extraction_method.clone()),
            fallback_used: extracted.fallback_used,
            extra: extracted.metadata.clone(),
        };
        self.store.set_extraction(id, &extracted.text, &metadata)?;
        self.store.append_log(
            id,
            LogLevel::Info,
            &format!("Extracted {} characters", extracted.text.len()),
        )?;

        // Phase 2: distillation.
        self.transition(id, DistillationStatus::Distilling, "Generating summary")?;
        self.store
            .append_log(id, LogLevel::Info, "Distillation started")?;

        let phase_started = Instant::now();
        let distiller = Arc::clone(&self.distiller);
        let text = extracted.text;
        let outcome = self
            .run_phase(id, entry, self.config.distillation_timeout(), async move {
                distiller.generate_summary(&text).await
            })
            .await;

        let summary = match outcome {
            PhaseOutcome::Done(Ok(summary)) => summary,
            PhaseOutcome::Done(Err(e)) => return Err(e.into()),
            PhaseOutcome::TimedOut => {
                return Err(OrchestratorError::DistillationTimeout {
                    elapsed_secs: self.config.distillation_timeout_secs,
                })
            }
            PhaseOutcome::Cancelled => return Err(OrchestratorError::Cancelled),
            PhaseOutcome::TaskFailed(msg) => return Err(OrchestratorError::PhaseTask(msg)),
        };
        metrics::PHASE_DURATION
            .with_label_values(&["distilling"])
            .observe(phase_started.elapsed().as_secs_f64());

        // A provider call can succeed and still return nothing usable.
        let trimmed = summary.trim();
        if trimmed.chars().count() < self.config.min_summary_chars {
            return Err(DistillError::InvalidOutput(format!(
                "summary has {} characters after trimming, need at least {}",
                trimmed.chars().count(),
                self.config.min_summary_chars
            ))
            .into());
        }

        let word_count = trimmed.split_whitespace().count() as u32;
        let processing_time_ms = started.elapsed().as_millis() as u64;
        self.store
            .update_content(id, trimmed, processing_time_ms, word_count)?;
        self.transition(id, DistillationStatus::Completed, "Completed")?;
        self.store.append_log(
            id,
            LogLevel::Info,
            &format!("Completed in {} ms ({} words)", processing_time_ms, word_count),
        )?;

        info!(%id, processing_time_ms, word_count, "distillation completed");
        Ok(())
    }

    /// Move the record forward. The store rejects edges the state machine
    /// forbids; the only legitimate way that happens mid-run is a stop
    /// landing first, so a rejection maps to `Cancelled`.
    fn transition(
        &self,
        id: &str,
        status: DistillationStatus,
        step: &str,
    ) -> Result<(), OrchestratorError> {
        match self.store.update_status(id, status, Some(step), None) {
            Ok(_) => Ok(()),
            Err(StoreError::InvalidTransition { .. }) => Err(OrchestratorError::Cancelled),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the stopped status unless a stop request already did.
    fn finalize_stopped(&self, id: &str) {
        match self
            .store
            .update_status(id, DistillationStatus::Stopped, Some("Stopped"), None)
        {
            Ok(_) => {
                let _ = self.store.append_log(
                    id,
                    LogLevel::Warning,
                    "Distillation stopped before completion",
                );
                metrics::DISTILLATIONS_FINISHED
                    .with_label_values(&["stopped"])
                    .inc();
            }
            Err(StoreError::InvalidTransition { .. }) => {}
            Err(e) => error!(%id, "failed to persist stopped status: {}", e),
        }
    }

    /// Race an external call against the phase deadline and cancellation.
    ///
    /// The call runs as its own task so a stop request can abort it through
    /// the registry entry; losing the race also aborts it.
    async fn run_phase<T>(
        &self,
        id: &str,
        entry: &Arc<CancelEntry>,
        deadline: Duration,
        call: impl std::future::Future<Output = T> + Send + 'static,
    ) -> PhaseOutcome<T>
    where
        T: Send + 'static,
    {
        let mut task = tokio::spawn(call);
        entry.set_abort_handle(task.abort_handle());

        let outcome = tokio::select! {
            joined = &mut task => match joined {
                Ok(value) => PhaseOutcome::Done(value),
                Err(e) if e.is_cancelled() => PhaseOutcome::Cancelled,
                Err(e) => PhaseOutcome::TaskFailed(e.to_string()),
            },
            _ = tokio::time::sleep(deadline) => {
                task.abort();
                PhaseOutcome::TimedOut
            }
            _ = self.watch_cancellation(id, entry) => {
                task.abort();
                PhaseOutcome::Cancelled
            }
        };

        entry.clear_abort_handle();
        outcome
    }

    /// Resolve once cancellation is detected: either through the registry's
    /// fast-path signal, or by polling the flag and the persisted status
    /// every tick (stops can also arrive out of process through the store).
    async fn watch_cancellation(&self, id: &str, entry: &CancelEntry) {
        let poll = self.config.cancel_poll_interval();
        loop {
            if entry.is_flagged() {
                return;
            }
            if let Ok(Some(record)) = self.store.get(id) {
                if record.status == DistillationStatus::Stopped {
                    return;
                }
            }
            tokio::select! {
                _ = entry.cancelled() => return,
                _ = tokio::time::sleep(poll) => {}
            }
        }
    }
}

//! Playlist fan-out.
//!
//! One playlist submission becomes N independent child distillations. The
//! parent is a transient tracking record: it carries a visible status while
//! items are discovered and dispatched, then disappears. The children are
//! the user-visible result, and they compete for queue slots like any other
//! submission.

use tracing::{info, warn};

use crate::distillation::{Distillation, DistillationStatus, LogLevel, SourceDescriptor};
use crate::extractor::classify_url;
use crate::metrics;

use super::runner::Orchestrator;

/// Expand a playlist submission into child distillations.
///
/// Resolution failure marks the tracking record `error` and creates no
/// children. Once dispatch has started, a per-child failure is logged on the
/// tracking record and skipped; it never rolls back already-created children.
/// The tracking record is deleted when the dispatch loop finishes, however
/// many children made it through.
pub(super) async fn expand_playlist(
    orchestrator: Orchestrator,
    tracking: Distillation,
    url: String,
) {
    info!(id = %tracking.id, %url, "expanding playlist");

    let items = match orchestrator.resolver.resolve(&url).await {
        Ok(items) => items,
        Err(e) => {
            let message = e.to_string();
            warn!(id = %tracking.id, "playlist resolution failed: {}", message);
            let _ = orchestrator
                .store
                .append_log(&tracking.id, LogLevel::Error, &message);
            if let Err(persist_err) = orchestrator.store.update_status(
                &tracking.id,
                DistillationStatus::Error,
                Some("Playlist resolution failed"),
                Some(&message),
            ) {
                warn!(id = %tracking.id, "failed to persist resolution failure: {}", persist_err);
            }
            metrics::PLAYLIST_EXPANSIONS
                .with_label_values(&["resolution_failed"])
                .inc();
            return;
        }
    };

    let _ = orchestrator.store.append_log(
        &tracking.id,
        LogLevel::Info,
        &format!("Resolved {} playlist items", items.len()),
    );
    let _ = orchestrator
        .store
        .update_step(&tracking.id, "Dispatching items");

    let mut submitted = 0usize;
    for (idx, item) in items.iter().enumerate() {
        // Spacing the submissions keeps the children's displayed creation
        // order stable.
        if idx > 0 {
            tokio::time::sleep(orchestrator.config.child_delay()).await;
        }

        match orchestrator.submit(SourceDescriptor::url(item.clone(), classify_url(item))) {
            Ok(child) => {
                submitted += 1;
                let _ = orchestrator.store.append_log(
                    &tracking.id,
                    LogLevel::Info,
                    &format!("Dispatched item {} as distillation {}", idx + 1, child.id),
                );
                metrics::PLAYLIST_CHILDREN
                    .with_label_values(&["submitted"])
                    .inc();
            }
            Err(e) => {
                warn!(id = %tracking.id, item = %item, "skipping playlist item: {}", e);
                let _ = orchestrator.store.append_log(
                    &tracking.id,
                    LogLevel::Warning,
                    &format!("Skipping item {}: {}", idx + 1, e),
                );
                metrics::PLAYLIST_CHILDREN
                    .with_label_values(&["failed"])
                    .inc();
            }
        }
    }

    info!(
        id = %tracking.id,
        submitted,
        total = items.len(),
        "playlist dispatch finished"
    );
    metrics::PLAYLIST_EXPANSIONS
        .with_label_values(&["dispatched"])
        .inc();

    // Dispatch is done; the children tell the rest of the story.
    if let Err(e) = orchestrator.store.delete(&tracking.id) {
        warn!(id = %tracking.id, "failed to delete tracking record: {}", e);
    }
}

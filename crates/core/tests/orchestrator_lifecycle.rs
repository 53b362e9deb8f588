//! Orchestrator lifecycle integration tests.
//!
//! These tests verify the complete distillation lifecycle through the
//! orchestrator: pending -> extracting -> distilling -> completed, plus the
//! error, stop and retry paths.

use std::sync::Arc;
use std::time::Duration;

use alembic_core::{
    testing::{fixtures, MockDistiller, MockExtractor, MockResolver},
    DistillError, DistillationStatus, DistillationStore, ExtractError, LogLevel, Orchestrator,
    OrchestratorConfig, OrchestratorError, SqliteDistillationStore,
};

/// Test helper wiring an orchestrator to in-memory dependencies.
struct TestHarness {
    store: Arc<SqliteDistillationStore>,
    extractor: Arc<MockExtractor>,
    distiller: Arc<MockDistiller>,
    orchestrator: Orchestrator,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: OrchestratorConfig) -> Self {
        let store = Arc::new(SqliteDistillationStore::in_memory().unwrap());
        let extractor = Arc::new(MockExtractor::new());
        let distiller = Arc::new(MockDistiller::new());

        let orchestrator = Orchestrator::new(
            config,
            Arc::clone(&store) as Arc<dyn DistillationStore>,
            Arc::clone(&extractor) as _,
            Arc::clone(&distiller) as _,
            Arc::new(MockResolver::new()),
        );

        Self {
            store,
            extractor,
            distiller,
            orchestrator,
        }
    }

    /// Poll until the record reaches the wanted status or the timeout hits.
    async fn wait_for_status(&self, id: &str, status: DistillationStatus) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let record = self.store.get(id).unwrap();
            if let Some(record) = record {
                if record.status == status {
                    return;
                }
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "timed out waiting for {} to become {}, currently {:?}",
                    id,
                    status,
                    self.store.get(id).unwrap().map(|r| r.status)
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Fast polling and short child delays; phase deadlines stay generous.
fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        max_concurrency: 2,
        extraction_timeout_secs: 30,
        distillation_timeout_secs: 30,
        cancel_poll_interval_ms: 50,
        playlist_child_delay_ms: 10,
        min_summary_chars: 10,
    }
}

#[tokio::test]
async fn test_full_lifecycle_completes() {
    let harness = TestHarness::new();
    harness.extractor.set_text("plenty of raw text here").await;
    harness
        .distiller
        .set_summary("A summary with more than ten characters.")
        .await;

    let record = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/article"))
        .unwrap();
    assert_eq!(record.status, DistillationStatus::Pending);

    harness
        .wait_for_status(&record.id, DistillationStatus::Completed)
        .await;

    let finished = harness.store.get(&record.id).unwrap().unwrap();
    assert_eq!(
        finished.content.as_deref(),
        Some("A summary with more than ten characters.")
    );
    assert_eq!(finished.raw_content.as_deref(), Some("plenty of raw text here"));
    assert_eq!(finished.word_count, Some(7));
    assert!(finished.processing_time_ms.is_some());
    assert!(finished.started_at.is_some());
    assert!(finished.completed_at.is_some());
    assert!(finished.error.is_none());

    let metadata = finished.extraction_metadata.unwrap();
    assert_eq!(metadata.title.as_deref(), Some("A Test Page"));
    assert_eq!(metadata.extraction_method.as_deref(), Some("mock-url"));

    // The log tells the whole story, in order.
    let messages: Vec<&str> = finished.logs.iter().map(|l| l.message.as_str()).collect();
    assert!(messages.iter().any(|m| m.contains("Queued")));
    assert!(messages.iter().any(|m| m.contains("Extraction started")));
    assert!(messages.iter().any(|m| m.contains("Distillation started")));
    assert!(messages.iter().any(|m| m.contains("Completed")));
}

#[tokio::test]
async fn test_extraction_failure_lands_in_error() {
    let harness = TestHarness::new();
    harness
        .extractor
        .set_next_error(ExtractError::HttpStatus(503))
        .await;

    let record = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/down"))
        .unwrap();
    harness
        .wait_for_status(&record.id, DistillationStatus::Error)
        .await;

    let failed = harness.store.get(&record.id).unwrap().unwrap();
    assert!(failed.error.unwrap().contains("503"));
    assert_eq!(failed.processing_step.as_deref(), Some("Failed"));
    assert!(failed
        .logs
        .iter()
        .any(|l| l.level == LogLevel::Error && l.message.contains("after")));
    // The distiller never ran.
    assert_eq!(harness.distiller.call_count().await, 0);
}

#[tokio::test]
async fn test_provider_failure_keeps_distinguishing_hint() {
    let harness = TestHarness::new();
    harness
        .distiller
        .set_next_error(DistillError::RateLimited("retry in 60s".to_string()))
        .await;

    let record = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/a"))
        .unwrap();
    harness
        .wait_for_status(&record.id, DistillationStatus::Error)
        .await;

    let failed = harness.store.get(&record.id).unwrap().unwrap();
    assert!(failed.error.unwrap().contains("rate limit"));
    // Extraction output survives the provider failure.
    assert!(failed.raw_content.is_some());
}

#[tokio::test]
async fn test_whitespace_summary_is_invalid_output() {
    let harness = TestHarness::new();
    harness.distiller.set_summary("   \n\t   ").await;

    let record = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/a"))
        .unwrap();
    harness
        .wait_for_status(&record.id, DistillationStatus::Error)
        .await;

    let failed = harness.store.get(&record.id).unwrap().unwrap();
    assert!(failed.error.unwrap().contains("invalid provider output"));
    assert!(failed.content.is_none());
}

#[tokio::test]
async fn test_stop_during_extraction_lands_within_500ms() {
    let harness = TestHarness::new();
    harness.extractor.set_delay(Duration::from_secs(30)).await;

    let record = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/slow"))
        .unwrap();
    harness
        .wait_for_status(&record.id, DistillationStatus::Extracting)
        .await;

    assert!(harness.orchestrator.stop(&record.id).unwrap());

    // Worst-case detection latency: stopped within 500 ms of the request.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let stopped = harness.store.get(&record.id).unwrap().unwrap();
    assert_eq!(stopped.status, DistillationStatus::Stopped);

    // Even after the aborted call unwinds, no later error overwrites the stop.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let still = harness.store.get(&record.id).unwrap().unwrap();
    assert_eq!(still.status, DistillationStatus::Stopped);
    assert!(still
        .logs
        .iter()
        .any(|l| l.message.contains("Stop requested")));

    // A second stop is rejected: the record is already terminal.
    assert!(!harness.orchestrator.stop(&record.id).unwrap());
}

#[tokio::test]
async fn test_stop_pending_job_never_starts_extracting() {
    let mut config = test_config();
    config.max_concurrency = 1;
    let harness = TestHarness::with_config(config);
    harness.extractor.set_delay(Duration::from_millis(400)).await;

    let first = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/a"))
        .unwrap();
    harness
        .wait_for_status(&first.id, DistillationStatus::Extracting)
        .await;

    // Second submission waits for the single slot; stop it while pending.
    let second = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/b"))
        .unwrap();
    assert!(harness.orchestrator.stop(&second.id).unwrap());

    harness
        .wait_for_status(&first.id, DistillationStatus::Completed)
        .await;
    // Give the queue time to grant (and abandon) the second slot.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stopped = harness.store.get(&second.id).unwrap().unwrap();
    assert_eq!(stopped.status, DistillationStatus::Stopped);
    assert!(stopped.started_at.is_none());

    // Only the first URL was ever extracted.
    assert_eq!(
        harness.extractor.extracted_urls().await,
        vec!["https://example.com/a"]
    );
}

#[tokio::test]
async fn test_concurrency_one_runs_strictly_in_order() {
    let mut config = test_config();
    config.max_concurrency = 1;
    let harness = TestHarness::with_config(config);
    harness.extractor.set_delay(Duration::from_millis(300)).await;

    let a = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/a"))
        .unwrap();
    let b = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/b"))
        .unwrap();

    harness
        .wait_for_status(&a.id, DistillationStatus::Extracting)
        .await;

    // While a occupies the only slot, b has not moved.
    let waiting = harness.store.get(&b.id).unwrap().unwrap();
    assert_eq!(waiting.status, DistillationStatus::Pending);

    harness
        .wait_for_status(&a.id, DistillationStatus::Completed)
        .await;
    harness
        .wait_for_status(&b.id, DistillationStatus::Completed)
        .await;

    // Admission order was preserved.
    assert_eq!(
        harness.extractor.extracted_urls().await,
        vec!["https://example.com/a", "https://example.com/b"]
    );
}

#[tokio::test]
async fn test_concurrency_ceiling_is_never_exceeded() {
    let mut config = test_config();
    config.max_concurrency = 2;
    let harness = TestHarness::with_config(config);
    harness.extractor.set_delay(Duration::from_millis(300)).await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let record = harness
            .orchestrator
            .submit(fixtures::web_page(&format!("https://example.com/{}", i)))
            .unwrap();
        ids.push(record.id);
    }

    // Sample the active phase count while the backlog drains.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = harness.orchestrator.status();
        let active = status.extracting_count + status.distilling_count;
        assert!(active <= 2, "active phase count {} exceeds the ceiling", active);
        assert!(status.queue.running <= 2);

        if status.pending_count == 0 && active == 0 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "backlog did not drain"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    for id in &ids {
        harness
            .wait_for_status(id, DistillationStatus::Completed)
            .await;
    }
}

#[tokio::test]
async fn test_raising_concurrency_drains_backlog_faster() {
    let mut config = test_config();
    config.max_concurrency = 1;
    let harness = TestHarness::with_config(config);
    harness.extractor.set_delay(Duration::from_millis(300)).await;

    for i in 0..3 {
        harness
            .orchestrator
            .submit(fixtures::web_page(&format!("https://example.com/{}", i)))
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.orchestrator.queue_status().running, 1);

    harness.orchestrator.set_concurrency(3);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(harness.orchestrator.queue_status().running >= 2);
}

#[tokio::test]
async fn test_retry_creates_a_fresh_record() {
    let harness = TestHarness::new();
    harness
        .extractor
        .set_next_error(ExtractError::ConnectionFailed("refused".to_string()))
        .await;

    let original = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/flaky"))
        .unwrap();
    harness
        .wait_for_status(&original.id, DistillationStatus::Error)
        .await;

    // The injected error was one-shot; the retry will succeed.
    let retried = harness.orchestrator.retry(&original.id).unwrap();
    assert_ne!(retried.id, original.id);
    assert_eq!(retried.source, original.source);

    harness
        .wait_for_status(&retried.id, DistillationStatus::Completed)
        .await;

    // The old record is untouched, the new one cross-references it.
    let old = harness.store.get(&original.id).unwrap().unwrap();
    assert_eq!(old.status, DistillationStatus::Error);

    let new = harness.store.get(&retried.id).unwrap().unwrap();
    assert!(new
        .logs
        .iter()
        .any(|l| l.message.contains(&format!("Retry of distillation {}", original.id))));
}

#[tokio::test]
async fn test_retry_rejected_while_not_terminal() {
    let harness = TestHarness::new();
    harness.extractor.set_delay(Duration::from_millis(500)).await;

    let record = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/a"))
        .unwrap();
    harness
        .wait_for_status(&record.id, DistillationStatus::Extracting)
        .await;

    let result = harness.orchestrator.retry(&record.id);
    assert!(matches!(
        result,
        Err(OrchestratorError::NotRetryable { .. })
    ));
}

#[tokio::test]
async fn test_retry_rejected_for_completed() {
    let harness = TestHarness::new();
    let record = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/a"))
        .unwrap();
    harness
        .wait_for_status(&record.id, DistillationStatus::Completed)
        .await;

    let result = harness.orchestrator.retry(&record.id);
    assert!(matches!(
        result,
        Err(OrchestratorError::NotRetryable { .. })
    ));
}

#[tokio::test]
async fn test_retry_of_stopped_job_works() {
    let harness = TestHarness::new();
    harness.extractor.set_delay(Duration::from_secs(30)).await;

    let record = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/a"))
        .unwrap();
    harness
        .wait_for_status(&record.id, DistillationStatus::Extracting)
        .await;
    assert!(harness.orchestrator.stop(&record.id).unwrap());
    harness
        .wait_for_status(&record.id, DistillationStatus::Stopped)
        .await;

    harness.extractor.set_delay(Duration::ZERO).await;
    let retried = harness.orchestrator.retry(&record.id).unwrap();
    harness
        .wait_for_status(&retried.id, DistillationStatus::Completed)
        .await;
}

#[tokio::test]
async fn test_phase_timeout_lands_in_error() {
    let mut config = test_config();
    config.extraction_timeout_secs = 1;
    let harness = TestHarness::with_config(config);
    harness.extractor.set_delay(Duration::from_secs(30)).await;

    let record = harness
        .orchestrator
        .submit(fixtures::web_page("https://example.com/slow"))
        .unwrap();
    harness
        .wait_for_status(&record.id, DistillationStatus::Error)
        .await;

    let failed = harness.store.get(&record.id).unwrap().unwrap();
    assert!(failed.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_file_submission_goes_through_the_same_path() {
    let harness = TestHarness::new();

    let record = harness
        .orchestrator
        .submit(fixtures::text_file("notes.txt"))
        .unwrap();
    harness
        .wait_for_status(&record.id, DistillationStatus::Completed)
        .await;

    // The mock records file extractions under the file name.
    assert_eq!(harness.extractor.extracted_urls().await, vec!["notes.txt"]);
}

#[tokio::test]
async fn test_invalid_url_rejected_at_submission() {
    let harness = TestHarness::new();
    let result = harness
        .orchestrator
        .submit(fixtures::web_page("not-a-url"));
    assert!(matches!(result, Err(OrchestratorError::InvalidSource(_))));
}

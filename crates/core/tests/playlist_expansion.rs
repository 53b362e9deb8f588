//! Playlist fan-out integration tests.
//!
//! One playlist submission becomes N independent child distillations; the
//! transient tracking record disappears once dispatch finishes.

use std::sync::Arc;
use std::time::Duration;

use alembic_core::{
    testing::{fixtures, MockDistiller, MockExtractor, MockResolver},
    DistillationFilter, DistillationStatus, DistillationStore, Orchestrator, OrchestratorConfig,
    PlaylistError, SourceKind, SqliteDistillationStore,
};

struct TestHarness {
    store: Arc<SqliteDistillationStore>,
    extractor: Arc<MockExtractor>,
    resolver: Arc<MockResolver>,
    orchestrator: Orchestrator,
}

impl TestHarness {
    fn new() -> Self {
        let config = OrchestratorConfig {
            max_concurrency: 2,
            extraction_timeout_secs: 30,
            distillation_timeout_secs: 30,
            cancel_poll_interval_ms: 50,
            playlist_child_delay_ms: 10,
            min_summary_chars: 10,
        };

        let store = Arc::new(SqliteDistillationStore::in_memory().unwrap());
        let extractor = Arc::new(MockExtractor::new());
        let resolver = Arc::new(MockResolver::new());

        let orchestrator = Orchestrator::new(
            config,
            Arc::clone(&store) as Arc<dyn DistillationStore>,
            Arc::clone(&extractor) as _,
            Arc::new(MockDistiller::new()),
            Arc::clone(&resolver) as _,
        );

        Self {
            store,
            extractor,
            resolver,
            orchestrator,
        }
    }

    /// Poll until the tracking record is gone or the timeout hits.
    async fn wait_for_deletion(&self, id: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.store.get(id).unwrap().is_some() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "tracking record {} was not deleted",
                id
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll until every non-playlist record is terminal.
    async fn wait_for_all_terminal(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let records = self
                .store
                .list(&DistillationFilter::new().with_limit(1000))
                .unwrap();
            let done = records
                .iter()
                .filter(|r| r.source.kind_str() != "youtube_playlist")
                .all(|r| r.status.is_terminal());
            if done && !records.is_empty() {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "children did not reach terminal statuses"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn items(&self, n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://www.youtube.com/watch?v=video{:03}", i))
            .collect()
    }
}

#[tokio::test]
async fn test_playlist_fans_out_into_children() {
    let harness = TestHarness::new();
    harness.resolver.set_items(harness.items(3)).await;

    let tracking = harness
        .orchestrator
        .submit(fixtures::youtube_playlist("PLtest123"))
        .unwrap();
    assert_eq!(tracking.source.kind_str(), "youtube_playlist");

    harness.wait_for_deletion(&tracking.id).await;
    harness.wait_for_all_terminal().await;

    let children = harness
        .store
        .list(&DistillationFilter::new().with_kind("youtube_video"))
        .unwrap();
    assert_eq!(children.len(), 3);
    for child in &children {
        assert_eq!(child.status, DistillationStatus::Completed);
        assert!(matches!(
            child.source,
            alembic_core::SourceDescriptor::Url {
                kind: SourceKind::YoutubeVideo,
                ..
            }
        ));
    }

    // Zero tracking records remain.
    let playlists = harness
        .store
        .list(&DistillationFilter::new().with_kind("youtube_playlist"))
        .unwrap();
    assert!(playlists.is_empty());
}

#[tokio::test]
async fn test_failing_item_is_skipped_not_fatal() {
    let harness = TestHarness::new();

    // Five items; item #3 is not submittable.
    let mut items = harness.items(5);
    items[2] = "not-a-url".to_string();
    harness.resolver.set_items(items).await;

    let tracking = harness
        .orchestrator
        .submit(fixtures::youtube_playlist("PLtest456"))
        .unwrap();
    harness.wait_for_deletion(&tracking.id).await;
    harness.wait_for_all_terminal().await;

    // Exactly four children exist; the bad item created none, and nothing
    // was rolled back.
    let children = harness
        .store
        .list(&DistillationFilter::new().with_limit(100))
        .unwrap();
    assert_eq!(children.len(), 4);
    assert!(children
        .iter()
        .all(|c| c.status == DistillationStatus::Completed));
}

#[tokio::test]
async fn test_child_processing_failure_does_not_stop_siblings() {
    let harness = TestHarness::new();
    let items = harness.items(3);
    harness.resolver.set_items(items.clone()).await;
    // The second child's extraction fails after it was created.
    harness.extractor.fail_url(items[1].clone(), "dead link").await;

    let tracking = harness
        .orchestrator
        .submit(fixtures::youtube_playlist("PLtest789"))
        .unwrap();
    harness.wait_for_deletion(&tracking.id).await;
    harness.wait_for_all_terminal().await;

    let completed = harness
        .store
        .count(&DistillationFilter::new().with_status(DistillationStatus::Completed))
        .unwrap();
    let errored = harness
        .store
        .count(&DistillationFilter::new().with_status(DistillationStatus::Error))
        .unwrap();
    assert_eq!(completed, 2);
    assert_eq!(errored, 1);
}

#[tokio::test]
async fn test_resolution_failure_marks_tracking_record() {
    let harness = TestHarness::new();
    harness
        .resolver
        .set_next_error(PlaylistError::Private("PLsecret".to_string()))
        .await;

    let tracking = harness
        .orchestrator
        .submit(fixtures::youtube_playlist("PLsecret"))
        .unwrap();

    // The tracking record stays, terminal with a descriptive error.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let record = harness.store.get(&tracking.id).unwrap().unwrap();
        if record.status == DistillationStatus::Error {
            assert!(record.error.unwrap().contains("private"));
            break;
        }
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // No children were created.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let all = harness
        .store
        .list(&DistillationFilter::new().with_limit(100))
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(harness.extractor.extraction_count().await, 0);
}

#[tokio::test]
async fn test_empty_playlist_is_a_distinct_failure() {
    let harness = TestHarness::new();
    harness
        .resolver
        .set_next_error(PlaylistError::Empty("PLempty".to_string()))
        .await;

    let tracking = harness
        .orchestrator
        .submit(fixtures::youtube_playlist("PLempty"))
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let record = harness.store.get(&tracking.id).unwrap().unwrap();
        if record.status == DistillationStatus::Error {
            assert!(record.error.unwrap().contains("empty"));
            break;
        }
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_children_keep_submission_order() {
    let harness = TestHarness::new();
    harness.resolver.set_items(harness.items(4)).await;

    let tracking = harness
        .orchestrator
        .submit(fixtures::youtube_playlist("PLordered"))
        .unwrap();
    harness.wait_for_deletion(&tracking.id).await;
    harness.wait_for_all_terminal().await;

    let mut children = harness
        .store
        .list(&DistillationFilter::new().with_kind("youtube_video"))
        .unwrap();
    // The store lists newest first; creation order is the reverse.
    children.reverse();

    let urls: Vec<String> = children.iter().map(|c| c.source.label()).collect();
    assert_eq!(urls, harness.items(4));
}

use std::sync::Arc;

use alembic_core::{Config, DistillationStore, Orchestrator, SanitizedConfig};
use prometheus::Registry;

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn DistillationStore>,
    orchestrator: Orchestrator,
    metrics: Registry,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DistillationStore>,
        orchestrator: Orchestrator,
        metrics: Registry,
    ) -> Self {
        Self {
            config,
            store,
            orchestrator,
            metrics,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn DistillationStore {
        self.store.as_ref()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn metrics_registry(&self) -> &Registry {
        &self.metrics
    }
}

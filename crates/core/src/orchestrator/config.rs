//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the distillation orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Concurrently executing distillations, shared across all submission
    /// kinds. Clamped to [1, 10] by the admission queue.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Deadline for the extraction phase, in seconds.
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_secs: u64,

    /// Deadline for the distillation phase, in seconds.
    #[serde(default = "default_distillation_timeout")]
    pub distillation_timeout_secs: u64,

    /// How often to poll for cancellation while a phase call is in flight
    /// (milliseconds). Bounds the worst-case stop detection latency.
    #[serde(default = "default_cancel_poll_interval")]
    pub cancel_poll_interval_ms: u64,

    /// Delay between playlist child submissions (milliseconds). Keeps the
    /// children's displayed creation order stable.
    #[serde(default = "default_child_delay")]
    pub playlist_child_delay_ms: u64,

    /// Minimum length of a valid summary after trimming.
    #[serde(default = "default_min_summary_chars")]
    pub min_summary_chars: usize,
}

fn default_max_concurrency() -> usize {
    2
}

fn default_extraction_timeout() -> u64 {
    300 // 5 minutes
}

fn default_distillation_timeout() -> u64 {
    600 // 10 minutes
}

fn default_cancel_poll_interval() -> u64 {
    500
}

fn default_child_delay() -> u64 {
    250
}

fn default_min_summary_chars() -> usize {
    10
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            extraction_timeout_secs: default_extraction_timeout(),
            distillation_timeout_secs: default_distillation_timeout(),
            cancel_poll_interval_ms: default_cancel_poll_interval(),
            playlist_child_delay_ms: default_child_delay(),
            min_summary_chars: default_min_summary_chars(),
        }
    }
}

impl OrchestratorConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn distillation_timeout(&self) -> Duration {
        Duration::from_secs(self.distillation_timeout_secs)
    }

    pub fn cancel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cancel_poll_interval_ms)
    }

    pub fn child_delay(&self) -> Duration {
        Duration::from_millis(self.playlist_child_delay_ms)
    }
}

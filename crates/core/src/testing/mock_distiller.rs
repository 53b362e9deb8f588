//! Mock distiller for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::distiller::{DistillError, Distiller};

/// Mock implementation of the Distiller trait.
///
/// Provides controllable behavior for testing:
/// - Return a configurable summary (including degenerate ones)
/// - Simulate provider failures and slow generations
/// - Track inputs for assertions
pub struct MockDistiller {
    summary: Arc<RwLock<String>>,
    delay: Arc<RwLock<Duration>>,
    next_error: Arc<RwLock<Option<DistillError>>>,
    inputs: Arc<RwLock<Vec<String>>>,
}

impl Default for MockDistiller {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDistiller {
    /// Create a mock distiller returning a plausible summary.
    pub fn new() -> Self {
        Self {
            summary: Arc::new(RwLock::new(
                "A dense summary: the fox is quick, the dog is lazy.".to_string(),
            )),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            next_error: Arc::new(RwLock::new(None)),
            inputs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the summary returned by subsequent generations.
    pub async fn set_summary(&self, summary: impl Into<String>) {
        *self.summary.write().await = summary.into();
    }

    /// Make every generation take this long (abortable sleep).
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Configure the next generation to fail with the given error.
    pub async fn set_next_error(&self, error: DistillError) {
        *self.next_error.write().await = Some(error);
    }

    /// Inputs passed to the distiller so far, in call order.
    pub async fn inputs(&self) -> Vec<String> {
        self.inputs.read().await.clone()
    }

    /// Number of generations performed.
    pub async fn call_count(&self) -> usize {
        self.inputs.read().await.len()
    }
}

#[async_trait]
impl Distiller for MockDistiller {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn generate_summary(&self, text: &str) -> Result<String, DistillError> {
        self.inputs.write().await.push(text.to_string());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(self.summary.read().await.clone())
    }
}

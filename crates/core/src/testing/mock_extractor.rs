//! Mock extractor for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::distillation::FileSource;
use crate::extractor::{ExtractError, ExtractedContent, Extractor};

/// Mock implementation of the Extractor trait.
///
/// Provides controllable behavior for testing:
/// - Return a configurable extracted text
/// - Fail specific URLs while others succeed
/// - Track extracted URLs for assertions
/// - Simulate slow extraction with a configurable delay
pub struct MockExtractor {
    text: Arc<RwLock<String>>,
    title: Arc<RwLock<Option<String>>>,
    delay: Arc<RwLock<Duration>>,
    next_error: Arc<RwLock<Option<ExtractError>>>,
    failing_urls: Arc<RwLock<HashMap<String, String>>>,
    extracted_urls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractor {
    /// Create a mock extractor returning a canned article.
    pub fn new() -> Self {
        Self {
            text: Arc::new(RwLock::new(
                "The quick brown fox jumps over the lazy dog. \
                 It keeps doing so for several paragraphs of raw content."
                    .to_string(),
            )),
            title: Arc::new(RwLock::new(Some("A Test Page".to_string()))),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            next_error: Arc::new(RwLock::new(None)),
            failing_urls: Arc::new(RwLock::new(HashMap::new())),
            extracted_urls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the text returned by subsequent extractions.
    pub async fn set_text(&self, text: impl Into<String>) {
        *self.text.write().await = text.into();
    }

    /// Set the title returned by subsequent extractions.
    pub async fn set_title(&self, title: Option<String>) {
        *self.title.write().await = title;
    }

    /// Make every extraction take this long (abortable sleep).
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Configure the next extraction to fail with the given error.
    pub async fn set_next_error(&self, error: ExtractError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make extractions of a specific URL always fail.
    pub async fn fail_url(&self, url: impl Into<String>, message: impl Into<String>) {
        self.failing_urls
            .write()
            .await
            .insert(url.into(), message.into());
    }

    /// URLs extracted so far, in call order.
    pub async fn extracted_urls(&self) -> Vec<String> {
        self.extracted_urls.read().await.clone()
    }

    /// Number of extractions performed.
    pub async fn extraction_count(&self) -> usize {
        self.extracted_urls.read().await.len()
    }

    async fn take_error(&self) -> Option<ExtractError> {
        self.next_error.write().await.take()
    }

    async fn build_content(&self, method: &str) -> ExtractedContent {
        ExtractedContent {
            text: self.text.read().await.clone(),
            title: self.title.read().await.clone(),
            content_type: "article".to_string(),
            extraction_method: method.to_string(),
            fallback_used: false,
            metadata: Default::default(),
        }
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract_from_url(&self, url: &str) -> Result<ExtractedContent, ExtractError> {
        self.extracted_urls.write().await.push(url.to_string());

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        if let Some(message) = self.failing_urls.read().await.get(url) {
            return Err(ExtractError::Other(message.clone()));
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(self.build_content("mock-url").await)
    }

    async fn extract_from_file(
        &self,
        file: &FileSource,
    ) -> Result<ExtractedContent, ExtractError> {
        self.extracted_urls.write().await.push(file.name.clone());

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(self.build_content("mock-file").await)
    }
}

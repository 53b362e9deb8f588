//! Extractor trait and types.

use async_trait::async_trait;
use serde_json::Map;
use thiserror::Error;

use crate::distillation::FileSource;

/// Error type for extraction operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Could not reach the source.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The source answered with a non-success status.
    #[error("source returned HTTP {0}")]
    HttpStatus(u16),

    /// The source yielded no usable text.
    #[error("no extractable text in source")]
    EmptyContent,

    /// The media type of an uploaded file is not supported.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Filesystem error while reading an uploaded file.
    #[error("file read failed: {0}")]
    FileRead(String),

    /// Anything else extractor-specific.
    #[error("extraction failed: {0}")]
    Other(String),
}

/// Raw text plus metadata produced by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    /// The extracted plain text.
    pub text: String,
    /// Document title, if one was found.
    pub title: Option<String>,
    /// Detected content type (e.g. "article", "video", "text").
    pub content_type: String,
    /// Which method produced the text (e.g. "http", "file").
    pub extraction_method: String,
    /// Whether a fallback method was used after the primary one failed.
    pub fallback_used: bool,
    /// Extractor-specific extras.
    pub metadata: Map<String, serde_json::Value>,
}

/// Trait for content extraction backends.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Extract raw text from a URL.
    async fn extract_from_url(&self, url: &str) -> Result<ExtractedContent, ExtractError>;

    /// Extract raw text from an uploaded file.
    async fn extract_from_file(&self, file: &FileSource)
        -> Result<ExtractedContent, ExtractError>;
}

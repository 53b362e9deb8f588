//! Basic HTTP extractor.
//!
//! Fetches the page and strips markup. Site-specific readability extraction
//! lives behind dedicated backends; this one is the lowest common
//! denominator and the fallback of last resort.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::distillation::FileSource;

use super::{ExtractError, ExtractedContent, Extractor};

static SCRIPT_BLOCKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").unwrap());
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Media types accepted for file extraction.
const TEXT_MEDIA_PREFIXES: &[&str] = &["text/"];
const TEXT_MEDIA_TYPES: &[&str] = &["application/json", "application/xml", "application/xhtml+xml"];

/// Extractor over plain HTTP GET with markup stripping.
pub struct HttpExtractor {
    client: reqwest::Client,
}

impl Default for HttpExtractor {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl HttpExtractor {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("alembic/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    fn strip_html(html: &str) -> (Option<String>, String) {
        let title = TITLE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| WHITESPACE.replace_all(m.as_str().trim(), " ").to_string())
            .filter(|t| !t.is_empty());

        let without_blocks = SCRIPT_BLOCKS.replace_all(html, " ");
        let without_tags = TAGS.replace_all(&without_blocks, " ");
        let text = WHITESPACE
            .replace_all(without_tags.trim(), " ")
            .to_string();

        (title, text)
    }

    fn is_text_media_type(media_type: &str) -> bool {
        TEXT_MEDIA_PREFIXES
            .iter()
            .any(|p| media_type.starts_with(p))
            || TEXT_MEDIA_TYPES.contains(&media_type)
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    fn name(&self) -> &str {
        "http"
    }

    async fn extract_from_url(&self, url: &str) -> Result<ExtractedContent, ExtractError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExtractError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::ConnectionFailed(e.to_string()))?;

        let (title, text) = Self::strip_html(&body);
        if text.is_empty() {
            return Err(ExtractError::EmptyContent);
        }

        Ok(ExtractedContent {
            text,
            title,
            content_type: "article".to_string(),
            extraction_method: "http".to_string(),
            fallback_used: false,
            metadata: Default::default(),
        })
    }

    async fn extract_from_file(
        &self,
        file: &FileSource,
    ) -> Result<ExtractedContent, ExtractError> {
        if !Self::is_text_media_type(&file.media_type) {
            return Err(ExtractError::UnsupportedMediaType(file.media_type.clone()));
        }

        let path = file
            .path
            .as_ref()
            .ok_or_else(|| ExtractError::FileRead("file has no stored path".to_string()))?;

        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExtractError::FileRead(e.to_string()))?;

        let (title, text) = if file.media_type == "text/html" {
            Self::strip_html(&body)
        } else {
            (None, WHITESPACE.replace_all(body.trim(), " ").to_string())
        };

        if text.is_empty() {
            return Err(ExtractError::EmptyContent);
        }

        Ok(ExtractedContent {
            text,
            title: title.or_else(|| Some(file.name.clone())),
            content_type: "text".to_string(),
            extraction_method: "file".to_string(),
            fallback_used: false,
            metadata: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_strip_html_extracts_title_and_text() {
        let html = r#"<html><head><title> A  Page </title>
            <script>var x = "<ignored>";</script></head>
            <body><h1>Heading</h1><p>Some <b>bold</b> text.</p></body></html>"#;
        let (title, text) = HttpExtractor::strip_html(html);
        assert_eq!(title.as_deref(), Some("A Page"));
        assert!(text.contains("Heading"));
        assert!(text.contains("Some bold text."));
        assert!(!text.contains("ignored"));
    }

    #[test]
    fn test_strip_html_without_title() {
        let (title, text) = HttpExtractor::strip_html("<p>hi</p>");
        assert!(title.is_none());
        assert_eq!(text, "hi");
    }

    #[test]
    fn test_text_media_type_detection() {
        assert!(HttpExtractor::is_text_media_type("text/plain"));
        assert!(HttpExtractor::is_text_media_type("text/markdown"));
        assert!(HttpExtractor::is_text_media_type("application/json"));
        assert!(!HttpExtractor::is_text_media_type("application/pdf"));
        assert!(!HttpExtractor::is_text_media_type("image/png"));
    }

    #[tokio::test]
    async fn test_extract_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "line one\nline two").unwrap();

        let source = FileSource {
            name: "notes.txt".to_string(),
            media_type: "text/plain".to_string(),
            size_bytes: 18,
            path: Some(file.path().to_string_lossy().to_string()),
        };

        let extractor = HttpExtractor::default();
        let content = extractor.extract_from_file(&source).await.unwrap();
        assert_eq!(content.text, "line one line two");
        assert_eq!(content.title.as_deref(), Some("notes.txt"));
        assert_eq!(content.extraction_method, "file");
    }

    #[tokio::test]
    async fn test_extract_from_file_unsupported_type() {
        let source = FileSource {
            name: "image.png".to_string(),
            media_type: "image/png".to_string(),
            size_bytes: 10,
            path: Some("/tmp/whatever.png".to_string()),
        };

        let extractor = HttpExtractor::default();
        let result = extractor.extract_from_file(&source).await;
        assert!(matches!(
            result,
            Err(ExtractError::UnsupportedMediaType(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_from_file_without_path() {
        let source = FileSource {
            name: "ghost.txt".to_string(),
            media_type: "text/plain".to_string(),
            size_bytes: 0,
            path: None,
        };

        let extractor = HttpExtractor::default();
        let result = extractor.extract_from_file(&source).await;
        assert!(matches!(result, Err(ExtractError::FileRead(_))));
    }
}

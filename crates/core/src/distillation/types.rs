//! Core distillation data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Source Types
// ============================================================================

/// Kind of URL source, detected at submission time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A regular web page.
    WebPage,
    /// A single YouTube video.
    YoutubeVideo,
    /// A YouTube playlist (fans out into child distillations).
    YoutubePlaylist,
    /// A YouTube channel.
    YoutubeChannel,
}

impl SourceKind {
    /// Returns the kind as a string (for filtering).
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::WebPage => "web_page",
            SourceKind::YoutubeVideo => "youtube_video",
            SourceKind::YoutubePlaylist => "youtube_playlist",
            SourceKind::YoutubeChannel => "youtube_channel",
        }
    }
}

/// Descriptor of an uploaded file to distill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileSource {
    /// Original file name.
    pub name: String,
    /// Media type as reported at upload (e.g. "application/pdf").
    pub media_type: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Server-local path to the stored file, if persisted to disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// What a distillation was created from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// A URL with its detected kind.
    Url { url: String, kind: SourceKind },
    /// An uploaded file.
    File(FileSource),
}

impl SourceDescriptor {
    /// Create a URL source.
    pub fn url(url: impl Into<String>, kind: SourceKind) -> Self {
        Self::Url {
            url: url.into(),
            kind,
        }
    }

    /// Create a file source.
    pub fn file(file: FileSource) -> Self {
        Self::File(file)
    }

    /// Short human-readable label for logs and the UI.
    pub fn label(&self) -> String {
        match self {
            SourceDescriptor::Url { url, .. } => url.clone(),
            SourceDescriptor::File(f) => f.name.clone(),
        }
    }

    /// Returns the source kind string used for filtering.
    pub fn kind_str(&self) -> &'static str {
        match self {
            SourceDescriptor::Url { kind, .. } => kind.as_str(),
            SourceDescriptor::File(_) => "file",
        }
    }
}

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a distillation.
///
/// State machine flow:
/// ```text
/// Pending -> Extracting -> Distilling -> Completed
///               |              |
///               +--> Error <---+
///               +--> Stopped <-+
///
/// Pending may also go directly to Stopped (cancelled before dispatch).
/// Completed, Error and Stopped are terminal.
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistillationStatus {
    /// Created and waiting for a queue slot.
    Pending,
    /// The extractor is pulling raw text out of the source.
    Extracting,
    /// The AI provider is condensing the extracted text.
    Distilling,
    /// Finished successfully (terminal).
    Completed,
    /// Failed (terminal).
    Error,
    /// Stopped on request (terminal).
    Stopped,
}

impl DistillationStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DistillationStatus::Completed | DistillationStatus::Error | DistillationStatus::Stopped
        )
    }

    /// Returns true if the distillation is actively executing a phase.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DistillationStatus::Extracting | DistillationStatus::Distilling
        )
    }

    /// Returns true if a stop request is accepted in this status.
    pub fn can_stop(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the state machine allows moving to `next` from here.
    ///
    /// No edge skips a state forward; the two phase states may each fall
    /// directly to a terminal state without passing through the other.
    pub fn can_transition_to(&self, next: DistillationStatus) -> bool {
        use DistillationStatus::*;
        matches!(
            (self, next),
            (Pending, Extracting)
                | (Pending, Stopped)
                | (Pending, Error)
                | (Extracting, Distilling)
                | (Extracting, Error)
                | (Extracting, Stopped)
                | (Distilling, Completed)
                | (Distilling, Error)
                | (Distilling, Stopped)
        )
    }

    /// Returns the status as a string (for filtering and display).
    pub fn as_str(&self) -> &'static str {
        match self {
            DistillationStatus::Pending => "pending",
            DistillationStatus::Extracting => "extracting",
            DistillationStatus::Distilling => "distilling",
            DistillationStatus::Completed => "completed",
            DistillationStatus::Error => "error",
            DistillationStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for DistillationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DistillationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DistillationStatus::Pending),
            "extracting" => Ok(DistillationStatus::Extracting),
            "distilling" => Ok(DistillationStatus::Distilling),
            "completed" => Ok(DistillationStatus::Completed),
            "error" => Ok(DistillationStatus::Error),
            "stopped" => Ok(DistillationStatus::Stopped),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

// ============================================================================
// Logs
// ============================================================================

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One entry in a distillation's append-only log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// Create an entry timestamped now.
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// Metadata produced by the extraction phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionMetadata {
    /// Title reported by the extractor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Content type detected by the extractor (e.g. "article", "video").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Which extraction method produced the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
    /// Whether a fallback method was used.
    #[serde(default)]
    pub fallback_used: bool,
    /// Extractor-specific extras.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A distillation: one trackable unit of work with its persisted lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Distillation {
    /// Unique identifier (UUID), generated at creation, never reused.
    pub id: String,

    /// Current lifecycle status.
    pub status: DistillationStatus,

    /// What this distillation was created from.
    pub source: SourceDescriptor,

    /// Short free-text description of the current activity. Advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_step: Option<String>,

    /// When the record was created and enqueued.
    pub queued_at: DateTime<Utc>,

    /// When the orchestrator began executing. Unset while pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When a terminal status was reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Raw text produced by extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,

    /// Distilled output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Metadata produced by the extraction phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_metadata: Option<ExtractionMetadata>,

    /// Word count of the distilled output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,

    /// Wall-clock execution time in milliseconds (started -> completed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,

    /// Append-only ordered log. Never mutated or reordered.
    #[serde(default)]
    pub logs: Vec<LogEntry>,

    /// Last error message. Set only when status is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Distillation {
    /// Elapsed execution time so far, if execution has started.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some(end.signed_duration_since(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_not_terminal() {
        let status = DistillationStatus::Pending;
        assert!(!status.is_terminal());
        assert!(!status.is_active());
        assert!(status.can_stop());
    }

    #[test]
    fn test_phase_statuses_are_active() {
        assert!(DistillationStatus::Extracting.is_active());
        assert!(DistillationStatus::Distilling.is_active());
        assert!(!DistillationStatus::Completed.is_active());
    }

    #[test]
    fn test_terminal_statuses() {
        for status in [
            DistillationStatus::Completed,
            DistillationStatus::Error,
            DistillationStatus::Stopped,
        ] {
            assert!(status.is_terminal());
            assert!(!status.can_stop());
        }
    }

    #[test]
    fn test_valid_transitions() {
        use DistillationStatus::*;
        assert!(Pending.can_transition_to(Extracting));
        assert!(Pending.can_transition_to(Stopped));
        assert!(Extracting.can_transition_to(Distilling));
        assert!(Extracting.can_transition_to(Error));
        assert!(Extracting.can_transition_to(Stopped));
        assert!(Distilling.can_transition_to(Completed));
        assert!(Distilling.can_transition_to(Error));
        assert!(Distilling.can_transition_to(Stopped));
    }

    #[test]
    fn test_invalid_transitions() {
        use DistillationStatus::*;
        // No forward skips.
        assert!(!Pending.can_transition_to(Distilling));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Extracting.can_transition_to(Completed));
        // Terminal states never move.
        assert!(!Completed.can_transition_to(Error));
        assert!(!Stopped.can_transition_to(Extracting));
        assert!(!Stopped.can_transition_to(Error));
        assert!(!Error.can_transition_to(Stopped));
        // No backward edges.
        assert!(!Distilling.can_transition_to(Extracting));
        assert!(!Extracting.can_transition_to(Pending));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DistillationStatus::Pending.as_str(), "pending");
        assert_eq!(DistillationStatus::Extracting.as_str(), "extracting");
        assert_eq!(DistillationStatus::Distilling.as_str(), "distilling");
        assert_eq!(DistillationStatus::Completed.as_str(), "completed");
        assert_eq!(DistillationStatus::Error.as_str(), "error");
        assert_eq!(DistillationStatus::Stopped.as_str(), "stopped");
    }

    #[test]
    fn test_status_from_str_round_trips() {
        for status in [
            DistillationStatus::Pending,
            DistillationStatus::Extracting,
            DistillationStatus::Distilling,
            DistillationStatus::Completed,
            DistillationStatus::Error,
            DistillationStatus::Stopped,
        ] {
            let parsed: DistillationStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<DistillationStatus>().is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&DistillationStatus::Extracting).unwrap();
        assert_eq!(json, r#""extracting""#);

        let parsed: DistillationStatus = serde_json::from_str(r#""stopped""#).unwrap();
        assert_eq!(parsed, DistillationStatus::Stopped);
    }

    #[test]
    fn test_source_descriptor_url() {
        let source = SourceDescriptor::url("https://example.com/a", SourceKind::WebPage);
        assert_eq!(source.label(), "https://example.com/a");
        assert_eq!(source.kind_str(), "web_page");
    }

    #[test]
    fn test_source_descriptor_file() {
        let source = SourceDescriptor::file(FileSource {
            name: "paper.pdf".to_string(),
            media_type: "application/pdf".to_string(),
            size_bytes: 1024,
            path: None,
        });
        assert_eq!(source.label(), "paper.pdf");
        assert_eq!(source.kind_str(), "file");
    }

    #[test]
    fn test_source_descriptor_serialization() {
        let source = SourceDescriptor::url(
            "https://www.youtube.com/watch?v=abc",
            SourceKind::YoutubeVideo,
        );
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains(r#""type":"url""#));
        assert!(json.contains(r#""kind":"youtube_video""#));

        let parsed: SourceDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, source);
    }

    #[test]
    fn test_log_entry_now() {
        let before = Utc::now();
        let entry = LogEntry::now(LogLevel::Info, "starting");
        let after = Utc::now();
        assert!(entry.timestamp >= before && entry.timestamp <= after);
        assert_eq!(entry.message, "starting");
    }

    #[test]
    fn test_elapsed_without_start() {
        let record = Distillation {
            id: "d-1".to_string(),
            status: DistillationStatus::Pending,
            source: SourceDescriptor::url("https://example.com", SourceKind::WebPage),
            processing_step: None,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            raw_content: None,
            content: None,
            extraction_metadata: None,
            word_count: None,
            processing_time_ms: None,
            logs: vec![],
            error: None,
        };
        assert!(record.elapsed().is_none());
    }
}

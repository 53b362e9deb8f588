pub mod cancel;
pub mod config;
pub mod distillation;
pub mod distiller;
pub mod extractor;
pub mod metrics;
pub mod orchestrator;
pub mod playlist;
pub mod queue;
pub mod testing;

pub use cancel::{CancelEntry, CancellationRegistry};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DistillerConfig,
    DistillerProvider, SanitizedConfig,
};
pub use distillation::{
    CreateDistillationRequest, Distillation, DistillationFilter, DistillationStatus,
    DistillationStore, ExtractionMetadata, FileSource, LogEntry, LogLevel, SourceDescriptor,
    SourceKind, SqliteDistillationStore, StoreError,
};
pub use distiller::{
    AnthropicClient, DistillError, Distiller, LlmClient, LlmDistiller, OllamaClient,
};
pub use extractor::{
    classify_url, is_youtube_url, ExtractError, ExtractedContent, Extractor, HttpExtractor,
};
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorError, OrchestratorStatus};
pub use playlist::{FeedResolver, PlaylistError, PlaylistResolver};
pub use queue::{AdmissionQueue, QueueError, QueueHandle, QueueStatus};

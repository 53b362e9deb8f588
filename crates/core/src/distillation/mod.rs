//! Distillation records: the persisted unit of work and its storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteDistillationStore;
pub use store::{
    CreateDistillationRequest, DistillationFilter, DistillationStore, StoreError,
};
pub use types::{
    Distillation, DistillationStatus, ExtractionMetadata, FileSource, LogEntry, LogLevel,
    SourceDescriptor, SourceKind,
};

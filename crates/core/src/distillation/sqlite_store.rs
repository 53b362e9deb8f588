//! SQLite-backed distillation store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{
    CreateDistillationRequest, Distillation, DistillationFilter, DistillationStatus,
    ExtractionMetadata, LogEntry, LogLevel, SourceDescriptor, StoreError,
};

const SELECT_COLUMNS: &str = "id, status, source, processing_step, queued_at, started_at, \
     completed_at, raw_content, content, extraction_metadata, word_count, processing_time_ms, \
     logs, error";

/// SQLite-backed distillation store.
///
/// All access goes through a single mutex-guarded connection; concurrent
/// orchestrator invocations serialize on it, which keeps a single record's
/// read-modify-write cycles consistent.
pub struct SqliteDistillationStore {
    conn: Mutex<Connection>,
}

impl SqliteDistillationStore {
    /// Create a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS distillations (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                source TEXT NOT NULL,
                processing_step TEXT,
                queued_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                raw_content TEXT,
                content TEXT,
                extraction_metadata TEXT,
                word_count INTEGER,
                processing_time_ms INTEGER,
                logs TEXT NOT NULL DEFAULT '[]',
                error TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_distillations_status ON distillations(status);
            CREATE INDEX IF NOT EXISTS idx_distillations_queued_at ON distillations(queued_at);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn build_where_clause(filter: &DistillationFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }

        if let Some(ref kind) = filter.kind {
            // The source column stores a tagged JSON object; URL sources carry
            // a "kind" field, file sources have type = "file".
            if kind == "file" {
                conditions.push("json_extract(source, '$.type') = ?");
            } else {
                conditions.push("json_extract(source, '$.kind') = ?");
            }
            params.push(Box::new(kind.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
        value.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
    }

    fn row_to_distillation(row: &rusqlite::Row) -> rusqlite::Result<Distillation> {
        let id: String = row.get(0)?;
        let status_str: String = row.get(1)?;
        let source_json: String = row.get(2)?;
        let processing_step: Option<String> = row.get(3)?;
        let queued_at_str: String = row.get(4)?;
        let started_at_str: Option<String> = row.get(5)?;
        let completed_at_str: Option<String> = row.get(6)?;
        let raw_content: Option<String> = row.get(7)?;
        let content: Option<String> = row.get(8)?;
        let metadata_json: Option<String> = row.get(9)?;
        let word_count: Option<u32> = row.get(10)?;
        let processing_time_ms: Option<u64> = row.get(11)?;
        let logs_json: String = row.get(12)?;
        let error: Option<String> = row.get(13)?;

        let status: DistillationStatus =
            serde_json::from_str(&format!("\"{}\"", status_str))
                .unwrap_or(DistillationStatus::Pending);

        let source: SourceDescriptor = serde_json::from_str(&source_json).unwrap_or(
            SourceDescriptor::Url {
                url: String::new(),
                kind: super::SourceKind::WebPage,
            },
        );

        let queued_at = DateTime::parse_from_rfc3339(&queued_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let extraction_metadata: Option<ExtractionMetadata> =
            metadata_json.and_then(|json| serde_json::from_str(&json).ok());

        let logs: Vec<LogEntry> = serde_json::from_str(&logs_json).unwrap_or_default();

        Ok(Distillation {
            id,
            status,
            source,
            processing_step,
            queued_at,
            started_at: Self::parse_timestamp(started_at_str),
            completed_at: Self::parse_timestamp(completed_at_str),
            raw_content,
            content,
            extraction_metadata,
            word_count,
            processing_time_ms,
            logs,
            error,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Distillation, StoreError> {
        let sql = format!("SELECT {} FROM distillations WHERE id = ?", SELECT_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_distillation) {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }
}

impl super::DistillationStore for SqliteDistillationStore {
    fn create(&self, request: CreateDistillationRequest) -> Result<Distillation, StoreError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = DistillationStatus::Pending;

        let source_json = serde_json::to_string(&request.source)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO distillations (id, status, source, processing_step, queued_at, logs) \
             VALUES (?, ?, ?, ?, ?, '[]')",
            params![
                id,
                status.as_str(),
                source_json,
                request.processing_step,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Distillation {
            id,
            status,
            source: request.source,
            processing_step: request.processing_step,
            queued_at: now,
            started_at: None,
            completed_at: None,
            raw_content: None,
            content: None,
            extraction_metadata: None,
            word_count: None,
            processing_time_ms: None,
            logs: vec![],
            error: None,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Distillation>, StoreError> {
        let conn = self.conn.lock().unwrap();
        match Self::fetch(&conn, id) {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list(&self, filter: &DistillationFilter) -> Result<Vec<Distillation>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM distillations {} ORDER BY queued_at DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_distillation)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            records.push(row_result.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(records)
    }

    fn count(&self, filter: &DistillationFilter) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM distillations {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn update_status(
        &self,
        id: &str,
        status: DistillationStatus,
        step: Option<&str>,
        error: Option<&str>,
    ) -> Result<Distillation, StoreError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::fetch(&conn, id)?;

        if !current.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: current.status.as_str(),
                to: status.as_str(),
            });
        }

        let completed_at = status.is_terminal().then(Utc::now);

        conn.execute(
            "UPDATE distillations SET status = ?, processing_step = ?, error = ?, \
             completed_at = COALESCE(?, completed_at) WHERE id = ?",
            params![
                status.as_str(),
                step.or(current.processing_step.as_deref()),
                error,
                completed_at.map(|t| t.to_rfc3339()),
                id,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Distillation {
            status,
            processing_step: step
                .map(str::to_string)
                .or(current.processing_step.clone()),
            error: error.map(str::to_string),
            completed_at: completed_at.or(current.completed_at),
            ..current
        })
    }

    fn mark_started(&self, id: &str) -> Result<Distillation, StoreError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::fetch(&conn, id)?;
        let now = Utc::now();

        conn.execute(
            "UPDATE distillations SET started_at = ? WHERE id = ?",
            params![now.to_rfc3339(), id],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Distillation {
            started_at: Some(now),
            ..current
        })
    }

    fn update_step(&self, id: &str, step: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let updated = conn
            .execute(
                "UPDATE distillations SET processing_step = ? WHERE id = ?",
                params![step, id],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn set_extraction(
        &self,
        id: &str,
        raw_content: &str,
        metadata: &ExtractionMetadata,
    ) -> Result<Distillation, StoreError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::fetch(&conn, id)?;
        let metadata_json =
            serde_json::to_string(metadata).map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "UPDATE distillations SET raw_content = ?, extraction_metadata = ? WHERE id = ?",
            params![raw_content, metadata_json, id],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Distillation {
            raw_content: Some(raw_content.to_string()),
            extraction_metadata: Some(metadata.clone()),
            ..current
        })
    }

    fn update_content(
        &self,
        id: &str,
        content: &str,
        processing_time_ms: u64,
        word_count: u32,
    ) -> Result<Distillation, StoreError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::fetch(&conn, id)?;

        conn.execute(
            "UPDATE distillations SET content = ?, processing_time_ms = ?, word_count = ? \
             WHERE id = ?",
            params![content, processing_time_ms, word_count, id],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Distillation {
            content: Some(content.to_string()),
            processing_time_ms: Some(processing_time_ms),
            word_count: Some(word_count),
            ..current
        })
    }

    fn append_log(&self, id: &str, level: LogLevel, message: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let entry = LogEntry::now(level, message);
        let entry_json =
            serde_json::to_string(&entry).map_err(|e| StoreError::Database(e.to_string()))?;

        // json_insert with the '$[#]' path appends atomically, preserving the
        // append-only ordering without a read-modify-write cycle.
        let updated = conn
            .execute(
                "UPDATE distillations SET logs = json_insert(logs, '$[#]', json(?)) WHERE id = ?",
                params![entry_json, id],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn delete(&self, id: &str) -> Result<Distillation, StoreError> {
        let conn = self.conn.lock().unwrap();

        let record = Self::fetch(&conn, id)?;

        conn.execute("DELETE FROM distillations WHERE id = ?", params![id])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(record)
    }
}

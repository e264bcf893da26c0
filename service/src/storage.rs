use crate::models::{SessionMeta, StoredEvent};
use event_parser::{ParseOutcome, ValidationSummary};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("Invalid session id: {0}")]
    InvalidSession(String),
}

pub struct SessionStorage {
    base_path: PathBuf,
}

impl SessionStorage {
    pub fn new(base_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn create_session(&self) -> Result<String, StorageError> {
        let session_id = Uuid::new_v4().to_string();
        let session_path = self.session_path(&session_id)?;

        fs::create_dir_all(session_path.join("events"))?;

        Ok(session_id)
    }

    /// Directory of a session. Ids must be UUIDs, which also keeps
    /// user-supplied ids inside the base directory.
    pub fn session_path(&self, session_id: &str) -> Result<PathBuf, StorageError> {
        Uuid::parse_str(session_id)
            .map_err(|_| StorageError::InvalidSession(session_id.to_string()))?;
        Ok(self.base_path.join(session_id))
    }

    pub fn delete_session(&self, session_id: &str) -> Result<(), StorageError> {
        let session_path = self.session_path(session_id)?;
        if session_path.exists() {
            fs::remove_dir_all(session_path)?;
        }
        Ok(())
    }

    pub fn write_meta(&self, session_id: &str, meta: &SessionMeta) -> Result<(), StorageError> {
        let meta_path = self.session_path(session_id)?.join("meta.json");
        fs::write(meta_path, serde_json::to_string_pretty(meta)?)?;
        Ok(())
    }

    pub fn read_meta(&self, session_id: &str) -> Result<SessionMeta, StorageError> {
        let meta_path = self.session_path(session_id)?.join("meta.json");
        let json = fs::read_to_string(meta_path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn event_path(&self, session_id: &str, row: u32) -> Result<PathBuf, StorageError> {
        Ok(self
            .session_path(session_id)?
            .join("events")
            .join(format!("{}.mp", row)))
    }

    pub fn write_outcome(&self, session_id: &str, row: u32, outcome: &ParseOutcome) -> Result<(), StorageError> {
        // Named fields: events skip absent keys, which positional encoding cannot express
        let msgpack = rmp_serde::to_vec_named(outcome)?;
        fs::write(self.event_path(session_id, row)?, msgpack)?;
        Ok(())
    }

    pub fn read_outcome(&self, session_id: &str, row: u32) -> Result<ParseOutcome, StorageError> {
        let msgpack = fs::read(self.event_path(session_id, row)?)?;
        Ok(rmp_serde::from_slice(&msgpack)?)
    }

    /// Row numbers of all stored outcomes, ascending.
    pub fn list_rows(&self, session_id: &str) -> Result<Vec<u32>, StorageError> {
        let events_dir = self.session_path(session_id)?.join("events");
        let mut rows = Vec::new();

        for entry in fs::read_dir(events_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("mp") {
                continue;
            }
            if let Some(row) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse().ok()) {
                rows.push(row);
            }
        }

        rows.sort_unstable();
        Ok(rows)
    }

    pub fn read_events(&self, session_id: &str) -> Result<Vec<StoredEvent>, StorageError> {
        self.list_rows(session_id)?
            .into_iter()
            .map(|row| {
                self.read_outcome(session_id, row)
                    .map(|outcome| StoredEvent { row, outcome })
            })
            .collect()
    }
}

/// Writes every outcome of a validation run and the session meta.
/// On failure the partially written session is removed.
pub fn ingest_summary(
    storage: &SessionStorage,
    session_id: &str,
    source: &str,
    summary: &ValidationSummary,
) -> Result<SessionMeta, StorageError> {
    let result = write_summary(storage, session_id, source, summary);
    if result.is_err() {
        if let Err(e) = storage.delete_session(session_id) {
            warn!("Failed to remove partial session {}: {}", session_id, e);
        }
    }
    result
}

fn write_summary(
    storage: &SessionStorage,
    session_id: &str,
    source: &str,
    summary: &ValidationSummary,
) -> Result<SessionMeta, StorageError> {
    for (row, outcome) in summary.outcomes.iter().enumerate() {
        storage.write_outcome(session_id, row as u32, outcome)?;
    }
    debug!("Stored {} outcomes for session {}", summary.outcomes.len(), session_id);

    let meta = SessionMeta::from_summary(source, summary);
    storage.write_meta(session_id, &meta)?;

    Ok(meta)
}

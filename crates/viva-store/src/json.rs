//! File-backed session store: one pretty-printed JSON file per session.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use viva_core::model::ExamSession;
use viva_core::traits::{SessionStore, StoreError};

/// Stores each session as `{id}.json` under a root directory.
///
/// Writes go through a temporary file in the same directory followed by a
/// rename, so a crash mid-write can never leave a truncated session file.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Ids of all stored sessions, in no particular order.
    pub fn list(&self) -> Result<Vec<Uuid>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| Uuid::parse_str(s).ok())
                {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(io_err)?;
        let tmp = tempfile::NamedTempFile::new_in(&self.root).map_err(io_err)?;
        std::fs::write(tmp.path(), content).map_err(io_err)?;
        tmp.persist(path)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

fn io_err(e: std::io::Error) -> StoreError {
    StoreError::Io(e.to_string())
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn persist(&self, session: &ExamSession) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(session)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        let path = self.session_path(session.id);
        self.write_atomic(&path, &content)?;
        tracing::debug!(session = %session.id, path = %path.display(), "session persisted");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<ExamSession, StoreError> {
        let path = self.session_path(id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id));
            }
            Err(e) => return Err(io_err(e)),
        };
        serde_json::from_str(&content).map_err(|e| {
            StoreError::Io(format!("corrupt session file {}: {e}", path.display()))
        })
    }
}

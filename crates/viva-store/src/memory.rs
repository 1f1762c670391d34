//! In-memory session store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use viva_core::model::ExamSession;
use viva_core::traits::{SessionStore, StoreError};

/// Keeps sessions in a map. Snapshots are cloned on both sides of the
/// boundary, so callers never observe a half-applied mutation.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<Uuid, ExamSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn persist(&self, session: &ExamSession) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<ExamSession, StoreError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viva_core::model::SessionState;

    #[tokio::test]
    async fn persist_then_load_roundtrip() {
        let store = MemoryStore::new();
        let session = ExamSession::new("alice");
        store.persist(&session).await.unwrap();
        let loaded = store.load(session.id).await.unwrap();
        assert_eq!(loaded, session);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn persist_replaces_previous_snapshot() {
        let store = MemoryStore::new();
        let mut session = ExamSession::new("bob");
        store.persist(&session).await.unwrap();
        session.state = SessionState::QuestionPending;
        store.persist(&session).await.unwrap();
        let loaded = store.load(session.id).await.unwrap();
        assert_eq!(loaded.state, SessionState::QuestionPending);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.load(id).await.unwrap_err(),
            StoreError::NotFound(got) if got == id
        ));
    }

    #[tokio::test]
    async fn loaded_snapshot_is_independent() {
        let store = MemoryStore::new();
        let session = ExamSession::new("carol");
        store.persist(&session).await.unwrap();
        let mut loaded = store.load(session.id).await.unwrap();
        loaded.state = SessionState::Completed;
        // Mutating the loaded copy does not change the stored one.
        assert_eq!(
            store.load(session.id).await.unwrap().state,
            SessionState::Created
        );
    }
}

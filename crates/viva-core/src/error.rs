//! Error type for session-level operations.

use thiserror::Error;
use uuid::Uuid;

use crate::model::SessionState;
use crate::traits::StoreError;

/// Errors surfaced by the exam engine to its callers.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested operation is not valid in the session's current state.
    /// The stored session is left unchanged.
    #[error("operation `{operation}` is not valid in state `{state}`")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// No session with this id exists.
    #[error("session not found: {0}")]
    NotFound(Uuid),

    /// The session has not completed, so there is no final grade yet.
    #[error("session {0} is not completed")]
    NotCompleted(Uuid),

    /// The persistence collaborator failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SessionError::NotFound(id),
            other => SessionError::Store(other),
        }
    }
}

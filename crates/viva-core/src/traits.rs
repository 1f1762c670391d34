//! Collaborator traits the orchestration core consumes.
//!
//! These async traits are implemented by the `viva-providers` and
//! `viva-store` crates respectively. The error types live here so the
//! gateway can classify failures for retry decisions without string
//! matching.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::ExamSession;

// ---------------------------------------------------------------------------
// Model invocation
// ---------------------------------------------------------------------------

/// Failures from the external model call. Recovered locally by the gateway's
/// retry/fallback policy; never surfaced past it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request exceeded its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A network-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// No model backend is configured at all.
    #[error("no model backend configured")]
    NotConfigured,
}

impl TransportError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            TransportError::AuthenticationFailed(_)
                | TransportError::ModelNotFound(_)
                | TransportError::NotConfigured
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            TransportError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// A single blocking model call. No retry inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Transport-level deadline for this one call.
    pub timeout: Duration,
}

/// Raw response from a model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    /// The raw response text, unvalidated.
    pub content: String,
    /// Model that actually produced the response.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Trait for model backends that turn prompts into raw text.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Human-readable backend name (e.g. "together").
    fn name(&self) -> &str;

    /// Perform one model call.
    async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// Session persistence
// ---------------------------------------------------------------------------

/// Failures from the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    NotFound(Uuid),

    #[error("storage error: {0}")]
    Io(String),
}

/// Trait for the persistence collaborator. A `persist` call is the
/// transactional boundary of a state transition: the engine reports success
/// only after it returns `Ok`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a full snapshot of the session, replacing any previous one.
    async fn persist(&self, session: &ExamSession) -> Result<(), StoreError>;

    /// Load the latest snapshot of a session.
    async fn load(&self, id: Uuid) -> Result<ExamSession, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_errors_are_not_retried() {
        assert!(TransportError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(TransportError::ModelNotFound("nope".into()).is_permanent());
        assert!(TransportError::NotConfigured.is_permanent());
        assert!(!TransportError::Timeout(Duration::from_secs(60)).is_permanent());
        assert!(!TransportError::Network("reset".into()).is_permanent());
        assert!(!TransportError::RateLimited { retry_after_ms: 500 }.is_permanent());
    }

    #[test]
    fn retry_after_only_for_rate_limits() {
        assert_eq!(
            TransportError::RateLimited { retry_after_ms: 1200 }.retry_after_ms(),
            Some(1200)
        );
        assert_eq!(TransportError::Network("x".into()).retry_after_ms(), None);
    }
}

//! viva-core — Exam orchestration core.
//!
//! This crate defines the session state machine, the resilient model
//! gateway, contract validation, grading, threshold policy, and final grade
//! aggregation that the rest of the viva system builds on.

pub mod contract;
pub mod error;
pub mod fallback;
pub mod finalizer;
pub mod gateway;
pub mod grading;
pub mod model;
pub mod policy;
pub mod session;
pub mod template;
pub mod traits;

pub use error::SessionError;
pub use gateway::{GatewayConfig, LlmGateway};
pub use model::{ExamSession, FinalGrade, SessionState};
pub use policy::ThresholdPolicy;
pub use session::{CurrentQuestion, ExamConfig, ExamEngine, NextAction, SubmitOutcome};

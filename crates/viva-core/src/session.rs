//! The exam session state machine.
//!
//! `ExamEngine` owns every state transition. Each public operation loads the
//! session, mutates a working copy, and persists the whole snapshot exactly
//! once at the end; a rejected operation leaves the stored session untouched.
//! The transient `Grading` state is never the committed state of a stored
//! session, so a session loaded in `Grading` is evidence of an interrupted
//! transition and is rejected.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::SessionError;
use crate::finalizer::Finalizer;
use crate::gateway::LlmGateway;
use crate::grading::GradingEngine;
use crate::model::{
    Attempt, ContentSource, ExamSession, FinalGrade, GradeResult, QuestionSlot, SessionState,
    SlotState,
};
use crate::policy::{Decision, ThresholdPolicy};
use crate::traits::SessionStore;

/// Exam-level knobs.
#[derive(Debug, Clone)]
pub struct ExamConfig {
    /// Number of question slots per session.
    pub question_count: usize,
    pub topic: String,
    pub difficulty: String,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            question_count: 3,
            topic: "Computer Science".to_string(),
            difficulty: "Intermediate".to_string(),
        }
    }
}

/// What the student sees when asking for the current question.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentQuestion {
    Question {
        /// 0-based slot position.
        index: usize,
        total: usize,
        question_text: String,
        background: String,
        /// 1-based index the next submission will get.
        attempt: u32,
        /// Maximum graded attempts this slot allows.
        max_attempts: u32,
        source: ContentSource,
    },
    /// The exam is over; there is nothing left to ask.
    Completed,
}

/// Where the session went after a graded submission.
#[derive(Debug, Clone, PartialEq)]
pub enum NextAction {
    /// Same question, refined context, one more attempt.
    Followup,
    /// Moved on to the next question.
    Advance { next_index: usize },
    /// That was the last slot; the final grade is ready.
    Completed,
}

/// The outcome of one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub result: GradeResult,
    pub next: NextAction,
}

/// Orchestrates exam sessions end to end.
pub struct ExamEngine {
    gateway: LlmGateway,
    grading: GradingEngine,
    policy: ThresholdPolicy,
    store: Arc<dyn SessionStore>,
    config: ExamConfig,
}

impl ExamEngine {
    pub fn new(
        gateway: LlmGateway,
        policy: ThresholdPolicy,
        store: Arc<dyn SessionStore>,
        config: ExamConfig,
    ) -> Self {
        Self {
            gateway,
            grading: GradingEngine,
            policy,
            store,
            config,
        }
    }

    /// Create a session with all its questions generated up front, persist
    /// it, and return it ready to deliver the first question.
    pub async fn start_session(&self, student_id: &str) -> Result<ExamSession, SessionError> {
        let mut session = ExamSession::new(student_id);
        for position in 0..self.config.question_count {
            let generated = self
                .gateway
                .generate_question(&self.config.topic, &self.config.difficulty, position)
                .await;
            let source = if generated.is_fallback() {
                ContentSource::Fallback
            } else {
                ContentSource::Generated
            };
            session.slots.push(QuestionSlot {
                index: position,
                question_text: generated.value.question_text,
                background: generated.value.background,
                rubric: generated.value.rubric,
                source,
                attempts: Vec::new(),
                state: SlotState::Pending,
                weight: None,
            });
        }
        session.state = SessionState::QuestionPending;
        self.store.persist(&session).await?;
        tracing::info!(
            session = %session.id,
            student = %session.student_id,
            questions = session.slots.len(),
            "exam session started"
        );
        Ok(session)
    }

    /// Deliver the question the session is waiting on.
    ///
    /// Delivering from `QuestionPending` moves to `AwaitingAnswer`; asking
    /// again while `AwaitingAnswer` redelivers the same content. In
    /// `FollowupPending` the refined restatement is produced here, so its
    /// cost lands on delivery rather than on the failing submission.
    pub async fn current_question(&self, id: Uuid) -> Result<CurrentQuestion, SessionError> {
        let mut session = self.store.load(id).await?;
        match session.state {
            SessionState::QuestionPending => {
                session.state = SessionState::AwaitingAnswer;
                let view = question_view(&session, self.policy.max_attempts);
                self.store.persist(&session).await?;
                Ok(view)
            }
            SessionState::AwaitingAnswer => Ok(question_view(&session, self.policy.max_attempts)),
            SessionState::FollowupPending => {
                let Some(slot) = session.active_slot() else {
                    return Err(invalid(&session, "current_question"));
                };
                let last = slot.attempts.last();
                let answer = last.map(|a| a.answer_text.as_str()).unwrap_or_default();
                let feedback = last
                    .and_then(|a| a.result.as_ref())
                    .map(|r| r.feedback.as_str())
                    .unwrap_or_default();
                let refined = self
                    .gateway
                    .followup(&slot.question_text, &slot.background, answer, feedback)
                    .await;
                if let Some(slot) = session.active_slot_mut() {
                    slot.question_text = refined.value.question_text;
                    slot.background = refined.value.background;
                }
                session.state = SessionState::AwaitingAnswer;
                let view = question_view(&session, self.policy.max_attempts);
                self.store.persist(&session).await?;
                Ok(view)
            }
            SessionState::Completed => Ok(CurrentQuestion::Completed),
            SessionState::Created | SessionState::Grading => {
                Err(invalid(&session, "current_question"))
            }
        }
    }

    /// Grade a submitted answer and advance the session.
    pub async fn submit_answer(
        &self,
        id: Uuid,
        answer: &str,
    ) -> Result<SubmitOutcome, SessionError> {
        let mut session = self.store.load(id).await?;
        if session.state != SessionState::AwaitingAnswer {
            return Err(invalid(&session, "submit_answer"));
        }
        let Some(slot) = session.active_slot() else {
            return Err(invalid(&session, "submit_answer"));
        };

        let attempt_index = slot.next_attempt_index();
        let question_text = slot.question_text.clone();
        let background = slot.background.clone();
        let rubric = slot.rubric.clone();

        session.state = SessionState::Grading;
        if let Some(slot) = session.active_slot_mut() {
            slot.attempts.push(Attempt {
                index: attempt_index,
                answer_text: answer.to_string(),
                submitted_at: Utc::now(),
                result: None,
            });
            slot.state = SlotState::Answered;
        }

        let graded = self
            .gateway
            .grade_answer(&question_text, &background, &rubric, answer)
            .await;
        let mut result = self.grading.into_result(graded, &rubric);

        let decision = self.policy.decide(result.score, attempt_index);
        if decision == Decision::EscalateFallback {
            tracing::error!(
                session = %session.id,
                slot = session.position,
                score = result.score,
                "unusable grade; resolving slot with deterministic fallback"
            );
            result = self.grading.deterministic_result(answer, &rubric);
        }

        if let Some(slot) = session.active_slot_mut() {
            if let Some(attempt) = slot.attempts.last_mut() {
                attempt.result = Some(result.clone());
            }
            slot.state = SlotState::Graded;
        }

        let next = match decision {
            Decision::RequestFollowup => {
                session.state = SessionState::FollowupPending;
                NextAction::Followup
            }
            Decision::Accept | Decision::EscalateFallback => {
                if let Some(slot) = session.active_slot_mut() {
                    slot.state = SlotState::Resolved;
                }
                if session.position + 1 < session.slots.len() {
                    session.position += 1;
                    session.state = SessionState::QuestionPending;
                    NextAction::Advance {
                        next_index: session.position,
                    }
                } else {
                    session.state = SessionState::Completed;
                    let final_grade = Finalizer::new(&self.gateway).finalize(&session).await;
                    tracing::info!(
                        session = %session.id,
                        score = final_grade.score,
                        band = %final_grade.band,
                        "exam session completed"
                    );
                    session.final_grade = Some(final_grade);
                    NextAction::Completed
                }
            }
        };

        self.store.persist(&session).await?;
        Ok(SubmitOutcome { result, next })
    }

    /// The final grade of a completed session.
    pub async fn final_grade(&self, id: Uuid) -> Result<FinalGrade, SessionError> {
        let session = self.store.load(id).await?;
        match (&session.state, &session.final_grade) {
            (SessionState::Completed, Some(grade)) => Ok(grade.clone()),
            _ => Err(SessionError::NotCompleted(id)),
        }
    }

    /// Load a session snapshot without changing it.
    pub async fn session(&self, id: Uuid) -> Result<ExamSession, SessionError> {
        Ok(self.store.load(id).await?)
    }
}

fn invalid(session: &ExamSession, operation: &'static str) -> SessionError {
    SessionError::InvalidState {
        operation,
        state: session.state,
    }
}

fn question_view(session: &ExamSession, max_attempts: u32) -> CurrentQuestion {
    match session.active_slot() {
        Some(slot) => CurrentQuestion::Question {
            index: slot.index,
            total: session.slots.len(),
            question_text: slot.question_text.clone(),
            background: slot.background.clone(),
            attempt: slot.next_attempt_index(),
            max_attempts,
            source: slot.source,
        },
        None => CurrentQuestion::Completed,
    }
}

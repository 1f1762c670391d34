//! Core data model for exam sessions.
//!
//! These are the entities the session state machine owns and the persistence
//! collaborator stores: sessions, question slots, attempts, grade results,
//! and the final grade.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a whole exam session.
///
/// `Grading` exists only while a submit transition is in flight; it is never
/// the committed state of a stored session. A session loaded in `Grading`
/// indicates an interrupted transition and is rejected by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    QuestionPending,
    AwaitingAnswer,
    Grading,
    FollowupPending,
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "created",
            SessionState::QuestionPending => "question_pending",
            SessionState::AwaitingAnswer => "awaiting_answer",
            SessionState::Grading => "grading",
            SessionState::FollowupPending => "followup_pending",
            SessionState::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle state of one question slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Pending,
    Answered,
    Graded,
    Resolved,
}

/// Where a question's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Generated,
    Fallback,
}

/// Where a grade came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeSource {
    Llm,
    Fallback,
}

/// One weighted grading criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Short criterion name (e.g. "Understanding of arrays").
    pub name: String,
    /// Relative weight in points.
    pub weight: u32,
    /// What a full-credit answer looks like.
    #[serde(default)]
    pub descriptor: String,
}

/// An ordered list of weighted criteria used to grade one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    /// Sum of all criterion weights.
    pub fn total_weight(&self) -> u32 {
        self.criteria.iter().map(|c| c.weight).sum()
    }

    /// Render the rubric as prompt text, one criterion per line.
    pub fn to_prompt_text(&self) -> String {
        self.criteria
            .iter()
            .map(|c| format!("- {} ({} points): {}", c.name, c.weight, c.descriptor))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Earned/possible points for one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub earned: f64,
    pub possible: f64,
}

/// The graded outcome of one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    /// Numeric score in [0, 100].
    pub score: f64,
    /// Per-criterion breakdown.
    pub breakdown: Vec<CriterionScore>,
    /// Qualitative feedback for the student.
    pub feedback: String,
    /// What the answer did well.
    #[serde(default)]
    pub strengths: Vec<String>,
    /// What the answer missed.
    #[serde(default)]
    pub weaknesses: Vec<String>,
    /// Whether the grade came from the model or the deterministic fallback.
    pub source: GradeSource,
}

/// One submitted answer and its grading outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-based attempt index, bounded by the configured maximum.
    pub index: u32,
    /// The submitted answer text.
    pub answer_text: String,
    /// When the answer was submitted.
    pub submitted_at: DateTime<Utc>,
    /// Set once grading completes.
    pub result: Option<GradeResult>,
}

/// One question's full lifecycle within a session, including all attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSlot {
    /// 0-based position within the session.
    pub index: usize,
    pub question_text: String,
    /// Background context delivered alongside the question. A follow-up
    /// attempt may refine this; the rubric and slot identity never change.
    pub background: String,
    pub rubric: Rubric,
    pub source: ContentSource,
    pub attempts: Vec<Attempt>,
    pub state: SlotState,
    /// Optional slot-level weight for the final grade; equal weighting
    /// applies when unset.
    #[serde(default)]
    pub weight: Option<f64>,
}

impl QuestionSlot {
    /// The highest-scoring grade across all attempts, if any attempt graded.
    pub fn best_result(&self) -> Option<&GradeResult> {
        self.attempts
            .iter()
            .filter_map(|a| a.result.as_ref())
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }

    /// Index the next attempt would get (1-based).
    pub fn next_attempt_index(&self) -> u32 {
        self.attempts.len() as u32 + 1
    }
}

/// Qualitative band for a numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeBand {
    Excellent,
    Good,
    Acceptable,
    NeedsImprovement,
}

impl GradeBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            GradeBand::Excellent
        } else if score >= 80.0 {
            GradeBand::Good
        } else if score >= 70.0 {
            GradeBand::Acceptable
        } else {
            GradeBand::NeedsImprovement
        }
    }
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GradeBand::Excellent => "Excellent",
            GradeBand::Good => "Good",
            GradeBand::Acceptable => "Acceptable",
            GradeBand::NeedsImprovement => "Needs Improvement",
        };
        write!(f, "{s}")
    }
}

/// Per-question line in the final grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub index: usize,
    pub question_text: String,
    pub score: f64,
    pub attempts: u32,
    pub grade_source: GradeSource,
}

/// The aggregate outcome of a completed session. Created once, at session
/// completion; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalGrade {
    /// Weighted mean of per-slot best results, in [0, 100].
    pub score: f64,
    pub band: GradeBand,
    /// Narrative explanation of the grade.
    pub explanation: String,
    /// Whether the narrative came from the model or the templated fallback.
    pub narrative_source: GradeSource,
    pub per_question: Vec<QuestionSummary>,
}

/// A student's exam session: an ordered sequence of question slots plus the
/// cursor and overall state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: Uuid,
    pub student_id: String,
    pub slots: Vec<QuestionSlot>,
    /// Index of the active slot. Monotonically non-decreasing.
    pub position: usize,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    /// Present exactly when `state == Completed`.
    pub final_grade: Option<FinalGrade>,
}

impl ExamSession {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            slots: Vec::new(),
            position: 0,
            state: SessionState::Created,
            created_at: Utc::now(),
            final_grade: None,
        }
    }

    /// The slot the cursor points at, if any.
    pub fn active_slot(&self) -> Option<&QuestionSlot> {
        self.slots.get(self.position)
    }

    pub fn active_slot_mut(&mut self) -> Option<&mut QuestionSlot> {
        self.slots.get_mut(self.position)
    }
}

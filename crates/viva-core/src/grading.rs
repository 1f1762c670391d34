//! Turning validated grading payloads into stored grade results.

use crate::contract::GradingPayload;
use crate::fallback;
use crate::gateway::Sourced;
use crate::model::{GradeResult, GradeSource, Rubric};

/// Converts gateway grading output into the `GradeResult` the session
/// records. Pure and stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct GradingEngine;

impl GradingEngine {
    /// Build the stored result. When the payload carries no per-criterion
    /// breakdown the overall score is distributed across the rubric weights,
    /// so every result has one.
    pub fn into_result(&self, graded: Sourced<GradingPayload>, rubric: &Rubric) -> GradeResult {
        let Sourced { value, source } = graded;
        let breakdown = if value.breakdown.is_empty() {
            fallback::weighted_breakdown(value.score, rubric)
        } else {
            value.breakdown
        };
        GradeResult {
            score: value.score,
            breakdown,
            feedback: value.feedback,
            strengths: value.strengths,
            weaknesses: value.weaknesses,
            source,
        }
    }

    /// A fully deterministic result for the escalation path, bypassing the
    /// model entirely.
    pub fn deterministic_result(&self, answer: &str, rubric: &Rubric) -> GradeResult {
        let (score, feedback) = fallback::length_based_grade(answer);
        GradeResult {
            score,
            breakdown: fallback::weighted_breakdown(score, rubric),
            feedback,
            strengths: vec!["Answer was submitted".to_string()],
            weaknesses: vec!["Detailed evaluation unavailable".to_string()],
            source: GradeSource::Fallback,
        }
    }
}

//! Final grade aggregation and narrative.

use crate::gateway::LlmGateway;
use crate::model::{ExamSession, FinalGrade, GradeBand, GradeSource, QuestionSummary};

/// Weighted mean of per-slot best scores. Slots without an explicit weight
/// count as 1.0; a slot with no graded attempt counts as zero earned points.
pub fn aggregate_score(session: &ExamSession) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for slot in &session.slots {
        let weight = slot.weight.unwrap_or(1.0);
        let score = slot.best_result().map(|r| r.score).unwrap_or(0.0);
        weighted_sum += score * weight;
        weight_total += weight;
    }
    if weight_total == 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

/// Builds the immutable `FinalGrade` for a session whose last slot just
/// resolved.
pub struct Finalizer<'a> {
    gateway: &'a LlmGateway,
}

impl<'a> Finalizer<'a> {
    pub fn new(gateway: &'a LlmGateway) -> Self {
        Self { gateway }
    }

    pub async fn finalize(&self, session: &ExamSession) -> FinalGrade {
        let score = aggregate_score(session);
        let band = GradeBand::from_score(score);

        let per_question: Vec<QuestionSummary> = session
            .slots
            .iter()
            .map(|slot| {
                let best = slot.best_result();
                QuestionSummary {
                    index: slot.index,
                    question_text: slot.question_text.clone(),
                    score: best.map(|r| r.score).unwrap_or(0.0),
                    attempts: slot.attempts.len() as u32,
                    grade_source: best.map(|r| r.source).unwrap_or(GradeSource::Fallback),
                }
            })
            .collect();

        let scores: Vec<f64> = per_question.iter().map(|q| q.score).collect();
        let degraded = per_question
            .iter()
            .filter(|q| q.grade_source == GradeSource::Fallback)
            .count();

        let question_scores = per_question
            .iter()
            .map(|q| format!("Q{}: {:.1}/100", q.index + 1, q.score))
            .collect::<Vec<_>>()
            .join(", ");
        let feedback_summary = session
            .slots
            .iter()
            .filter_map(|slot| {
                slot.best_result()
                    .map(|r| format!("Q{}: {}", slot.index + 1, r.feedback))
            })
            .collect::<Vec<_>>()
            .join("\n");

        let narrative = self
            .gateway
            .final_summary(&question_scores, &feedback_summary, &scores, score, degraded)
            .await;

        FinalGrade {
            score,
            band,
            explanation: narrative.value.explanation,
            narrative_source: narrative.source,
            per_question,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::model::{
        Attempt, ContentSource, GradeResult, QuestionSlot, Rubric, SessionState, SlotState,
    };

    fn slot(index: usize, score: Option<f64>, weight: Option<f64>) -> QuestionSlot {
        QuestionSlot {
            index,
            question_text: format!("Q{index}"),
            background: String::new(),
            rubric: Rubric { criteria: vec![] },
            source: ContentSource::Generated,
            attempts: score
                .map(|s| {
                    vec![Attempt {
                        index: 1,
                        answer_text: "a".into(),
                        submitted_at: Utc::now(),
                        result: Some(GradeResult {
                            score: s,
                            breakdown: vec![],
                            feedback: "f".into(),
                            strengths: vec![],
                            weaknesses: vec![],
                            source: GradeSource::Llm,
                        }),
                    }]
                })
                .unwrap_or_default(),
            state: SlotState::Resolved,
            weight,
        }
    }

    fn session(slots: Vec<QuestionSlot>) -> ExamSession {
        let mut s = ExamSession::new("alice");
        s.slots = slots;
        s.state = SessionState::Completed;
        s
    }

    #[test]
    fn equal_weights_give_plain_mean() {
        let s = session(vec![
            slot(0, Some(80.0), None),
            slot(1, Some(60.0), None),
            slot(2, Some(70.0), None),
        ]);
        assert!((aggregate_score(&s) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_weights_shift_the_mean() {
        let s = session(vec![
            slot(0, Some(100.0), Some(3.0)),
            slot(1, Some(0.0), Some(1.0)),
        ]);
        assert!((aggregate_score(&s) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn ungraded_slot_counts_as_zero() {
        let s = session(vec![slot(0, Some(90.0), None), slot(1, None, None)]);
        assert!((aggregate_score(&s) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn empty_session_scores_zero() {
        assert_eq!(aggregate_score(&session(vec![])), 0.0);
    }
}

//! Threshold policy: decide what happens after a grade.

use crate::model::GradeBand;

/// The policy's verdict on a graded attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The slot is done; the best result stands.
    Accept,
    /// The student gets a refined restatement and one more attempt.
    RequestFollowup,
    /// The grade is unusable; resolve the slot through the fallback path.
    EscalateFallback,
}

/// Pure threshold rules. Holds no session state.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPolicy {
    /// Scores at or above this pass outright.
    pub passing_threshold: f64,
    /// Maximum graded attempts per question slot.
    pub max_attempts: u32,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            passing_threshold: 60.0,
            max_attempts: 2,
        }
    }
}

impl ThresholdPolicy {
    /// Decide the next step for a graded attempt. Total over all f64 score
    /// inputs: a non-finite score escalates instead of being compared.
    pub fn decide(&self, score: f64, attempt_index: u32) -> Decision {
        if !score.is_finite() {
            return Decision::EscalateFallback;
        }
        if score >= self.passing_threshold || attempt_index >= self.max_attempts {
            Decision::Accept
        } else {
            Decision::RequestFollowup
        }
    }

    /// Qualitative band for a final score.
    pub fn band(&self, score: f64) -> GradeBand {
        GradeBand::from_score(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_score_accepts() {
        let policy = ThresholdPolicy::default();
        assert_eq!(policy.decide(60.0, 1), Decision::Accept);
        assert_eq!(policy.decide(95.0, 1), Decision::Accept);
    }

    #[test]
    fn failing_first_attempt_requests_followup() {
        let policy = ThresholdPolicy::default();
        assert_eq!(policy.decide(59.9, 1), Decision::RequestFollowup);
        assert_eq!(policy.decide(0.0, 1), Decision::RequestFollowup);
    }

    #[test]
    fn failing_last_attempt_accepts() {
        let policy = ThresholdPolicy::default();
        assert_eq!(policy.decide(40.0, 2), Decision::Accept);
        assert_eq!(policy.decide(40.0, 3), Decision::Accept);
    }

    #[test]
    fn non_finite_scores_escalate() {
        let policy = ThresholdPolicy::default();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(policy.decide(bad, 1), Decision::EscalateFallback);
            assert_eq!(policy.decide(bad, 2), Decision::EscalateFallback);
        }
    }

    #[test]
    fn every_finite_score_gets_a_decision() {
        // Sweep the representable range at coarse steps; the policy must
        // never panic and must return Accept or RequestFollowup.
        let policy = ThresholdPolicy::default();
        let mut score = -1000.0;
        while score <= 1000.0 {
            let d = policy.decide(score, 1);
            assert!(matches!(d, Decision::Accept | Decision::RequestFollowup));
            score += 0.5;
        }
    }
}

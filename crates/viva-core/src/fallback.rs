//! Deterministic fallback content used when the model is unavailable.
//!
//! Each gateway operation has a local counterpart here: canned questions, a
//! length-based grading heuristic, a context-probe follow-up, and a templated
//! final-grade narrative. All of it is synchronous and infallible, so the
//! exam can always make progress.

use crate::model::{Criterion, CriterionScore, Rubric};

/// Feedback tiers for the length heuristic, coarsest first.
const GRADE_TIERS: [(usize, f64, &str); 3] = [
    (
        500,
        85.0,
        "Your answer is comprehensive and well-developed. You demonstrated good understanding of the topic.",
    ),
    (
        200,
        75.0,
        "Your answer addresses the question adequately. Consider adding more detail and examples to strengthen your response.",
    ),
    (
        50,
        65.0,
        "Your answer is brief. Please provide more detailed explanations and examples to fully address the question.",
    ),
];

const GRADE_FLOOR: (f64, &str) = (
    55.0,
    "Your answer is too brief. Please provide a more complete response with explanations and examples.",
);

/// A canned question with its rubric, ready to fill a slot.
#[derive(Debug, Clone)]
pub struct CannedQuestion {
    pub question_text: String,
    pub background: String,
    pub rubric: Rubric,
}

fn criterion(name: &str, weight: u32, descriptor: &str) -> Criterion {
    Criterion {
        name: name.to_string(),
        weight,
        descriptor: descriptor.to_string(),
    }
}

/// The canned question for a 0-based slot position. The bank has three
/// entries and cycles for longer exams.
pub fn canned_question(position: usize) -> CannedQuestion {
    match position % 3 {
        0 => CannedQuestion {
            question_text: "Explain the fundamental principles of data structures. Discuss the \
                            differences between arrays and linked lists, and when you would use each."
                .to_string(),
            background: "Data structures are fundamental to computer science. Arrays store \
                         elements in contiguous memory, while linked lists use nodes with \
                         pointers. Understanding when to use each is crucial for efficient \
                         programming."
                .to_string(),
            rubric: Rubric {
                criteria: vec![
                    criterion(
                        "Understanding of arrays",
                        25,
                        "Explains contiguous storage and indexed access",
                    ),
                    criterion(
                        "Understanding of linked lists",
                        25,
                        "Explains node-and-pointer structure and traversal",
                    ),
                    criterion(
                        "Comparison and differences",
                        25,
                        "Contrasts access, insertion and memory trade-offs",
                    ),
                    criterion("Use case examples", 25, "Names a fitting use for each structure"),
                ],
            },
        },
        1 => CannedQuestion {
            question_text: "Describe the concept of algorithm time complexity (Big O notation). \
                            Provide examples of O(1), O(n), and O(n\u{b2}) algorithms and explain \
                            why understanding complexity matters."
                .to_string(),
            background: "Algorithm complexity analysis helps developers understand how \
                         algorithms scale. Big O notation describes the worst-case time \
                         complexity. Efficient algorithms can make the difference between a \
                         usable and unusable program."
                .to_string(),
            rubric: Rubric {
                criteria: vec![
                    criterion(
                        "Explanation of Big O notation",
                        30,
                        "Defines asymptotic worst-case growth",
                    ),
                    criterion("O(1) example", 20, "Gives a constant-time example with reasoning"),
                    criterion("O(n) example", 20, "Gives a linear-time example with reasoning"),
                    criterion(
                        "O(n\u{b2}) example",
                        20,
                        "Gives a quadratic-time example with reasoning",
                    ),
                    criterion(
                        "Importance discussion",
                        10,
                        "Explains why complexity matters in practice",
                    ),
                ],
            },
        },
        _ => CannedQuestion {
            question_text: "Explain the concept of recursion in programming. Discuss its \
                            advantages and disadvantages, and provide an example of a problem \
                            that is naturally solved using recursion."
                .to_string(),
            background: "Recursion is a programming technique where a function calls itself to \
                         solve a problem. It's commonly used in tree traversal, \
                         divide-and-conquer algorithms, and problems with recursive structure \
                         like factorial or Fibonacci sequences."
                .to_string(),
            rubric: Rubric {
                criteria: vec![
                    criterion(
                        "Explanation of recursion concept",
                        25,
                        "Defines self-reference and the base case",
                    ),
                    criterion("Advantages discussion", 20, "Names clarity and natural fit for recursive problems"),
                    criterion(
                        "Disadvantages discussion",
                        20,
                        "Names stack depth and overhead concerns",
                    ),
                    criterion(
                        "Appropriate example",
                        30,
                        "Works through a naturally recursive problem",
                    ),
                    criterion("Clarity and organization", 5, "Well-structured answer"),
                ],
            },
        },
    }
}

/// Length-based grading heuristic: score and feedback keyed to the trimmed
/// character count of the answer.
pub fn length_based_grade(answer: &str) -> (f64, String) {
    let len = answer.trim().chars().count();
    for (min_len, score, feedback) in GRADE_TIERS {
        if len > min_len {
            return (score, feedback.to_string());
        }
    }
    (GRADE_FLOOR.0, GRADE_FLOOR.1.to_string())
}

/// Distribute an overall score across the rubric proportionally to the
/// criterion weights, so a fallback grade still carries a breakdown.
pub fn weighted_breakdown(score: f64, rubric: &Rubric) -> Vec<CriterionScore> {
    let total = rubric.total_weight();
    if total == 0 {
        return Vec::new();
    }
    rubric
        .criteria
        .iter()
        .map(|c| {
            let possible = 100.0 * f64::from(c.weight) / f64::from(total);
            CriterionScore {
                criterion: c.name.clone(),
                earned: possible * score / 100.0,
                possible,
            }
        })
        .collect()
}

/// The deterministic follow-up: the same question with a generic probe
/// appended to the background. Used when the model cannot produce a refined
/// restatement, so a student never loses the retry opportunity.
pub fn followup_probe(question_text: &str, background: &str) -> (String, String) {
    let refined = if background.trim().is_empty() {
        "Revisit your previous answer: explain the key concepts step by step and support each \
         point with a concrete example."
            .to_string()
    } else {
        format!(
            "{background}\n\nRevisit your previous answer: explain the key concepts step by \
             step and support each point with a concrete example."
        )
    };
    (question_text.to_string(), refined)
}

/// A templated final-grade narrative built from per-question scores. Used
/// when the model cannot produce one.
pub fn templated_summary(scores: &[f64], overall: f64, degraded: usize) -> String {
    let listed = scores
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Q{}: {s:.1}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let mut text = format!(
        "Final grade {overall:.1} across {count} questions ({listed}).",
        count = scores.len()
    );
    if degraded > 0 {
        text.push_str(&format!(
            " {degraded} question(s) were graded by the basic evaluation because detailed \
             grading was unavailable."
        ));
    }
    text
}

//! Contract validation for raw model output.
//!
//! This is the single boundary preventing unvalidated model output from
//! reaching storage or the student. Raw text is parsed as JSON (models often
//! wrap it in markdown fences) and checked field by field; any violation
//! yields a typed `ValidationFailure` so the gateway can decide to retry or
//! fall back.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{Criterion, CriterionScore, Rubric};

/// Why a model payload was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("field `{0}` is empty")]
    EmptyField(String),

    #[error("field `{field}` out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// A validated question-generation payload.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionPayload {
    pub question_text: String,
    pub background: String,
    pub rubric: Rubric,
}

/// A validated grading payload.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingPayload {
    pub score: f64,
    pub breakdown: Vec<CriterionScore>,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// A validated follow-up payload: a restated question with refined context.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowupPayload {
    pub question_text: String,
    pub background: String,
}

/// A validated final-summary payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryPayload {
    pub explanation: String,
}

/// Extract the JSON object from raw model text.
///
/// Handles a fenced ```json block, a bare fenced block, or raw text; as a
/// last resort takes the span from the first `{` to the last `}`.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        // Skip the language tag on the opening fence line.
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
        // Truncated fence: use what accumulated.
        return body.trim();
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, ValidationFailure> {
    let value: Value = serde_json::from_str(extract_json(raw))
        .map_err(|e| ValidationFailure::MalformedOutput(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ValidationFailure::MalformedOutput(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn require_string(map: &Map<String, Value>, field: &str) -> Result<String, ValidationFailure> {
    let value = map
        .get(field)
        .ok_or_else(|| ValidationFailure::MissingField(field.to_string()))?;
    let s = value
        .as_str()
        .ok_or_else(|| ValidationFailure::MalformedOutput(format!("field `{field}` is not a string")))?;
    if s.trim().is_empty() {
        return Err(ValidationFailure::EmptyField(field.to_string()));
    }
    Ok(s.trim().to_string())
}

fn require_number_in(
    map: &Map<String, Value>,
    field: &str,
    min: f64,
    max: f64,
) -> Result<f64, ValidationFailure> {
    let value = map
        .get(field)
        .ok_or_else(|| ValidationFailure::MissingField(field.to_string()))?;
    let n = value
        .as_f64()
        .ok_or_else(|| ValidationFailure::MalformedOutput(format!("field `{field}` is not a number")))?;
    if !n.is_finite() || n < min || n > max {
        return Err(ValidationFailure::OutOfRange {
            field: field.to_string(),
            value: n,
            min,
            max,
        });
    }
    Ok(n)
}

fn optional_string_list(map: &Map<String, Value>, field: &str) -> Vec<String> {
    map.get(field)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Validate a question-generation response.
///
/// Requires non-empty `question_text`, a `context` string (may be empty),
/// and a non-empty `rubric` array of positively weighted criteria.
pub fn validate_question(raw: &str) -> Result<QuestionPayload, ValidationFailure> {
    let map = parse_object(raw)?;
    let question_text = require_string(&map, "question_text")?;
    let background = map
        .get("context")
        .ok_or_else(|| ValidationFailure::MissingField("context".to_string()))?
        .as_str()
        .ok_or_else(|| ValidationFailure::MalformedOutput("field `context` is not a string".into()))?
        .trim()
        .to_string();

    let items = map
        .get("rubric")
        .ok_or_else(|| ValidationFailure::MissingField("rubric".to_string()))?
        .as_array()
        .ok_or_else(|| ValidationFailure::MalformedOutput("field `rubric` is not an array".into()))?
        .clone();
    if items.is_empty() {
        return Err(ValidationFailure::EmptyField("rubric".to_string()));
    }

    let mut criteria = Vec::with_capacity(items.len());
    for item in &items {
        let entry = item
            .as_object()
            .ok_or_else(|| ValidationFailure::MalformedOutput("rubric entry is not an object".into()))?;
        let name = require_string(entry, "criterion")?;
        let weight = require_number_in(entry, "weight", 1.0, 100.0)?;
        let descriptor = entry
            .get("descriptor")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();
        criteria.push(Criterion {
            name,
            weight: weight.round() as u32,
            descriptor,
        });
    }

    Ok(QuestionPayload {
        question_text,
        background,
        rubric: Rubric { criteria },
    })
}

/// Validate a grading response.
///
/// Requires `grade` in [0, 100] and non-empty `feedback`; the per-criterion
/// `breakdown` is optional but every entry present must have
/// `0 <= earned <= possible`.
pub fn validate_grading(raw: &str) -> Result<GradingPayload, ValidationFailure> {
    let map = parse_object(raw)?;
    let score = require_number_in(&map, "grade", 0.0, 100.0)?;
    let feedback = require_string(&map, "feedback")?;

    let mut breakdown = Vec::new();
    if let Some(items) = map.get("breakdown").and_then(|v| v.as_array()) {
        for item in items {
            let entry = item.as_object().ok_or_else(|| {
                ValidationFailure::MalformedOutput("breakdown entry is not an object".into())
            })?;
            let criterion = require_string(entry, "criterion")?;
            let possible = require_number_in(entry, "possible", 0.0, 100.0)?;
            let earned = require_number_in(entry, "earned", 0.0, 100.0)?;
            if earned > possible {
                return Err(ValidationFailure::OutOfRange {
                    field: "earned".to_string(),
                    value: earned,
                    min: 0.0,
                    max: possible,
                });
            }
            breakdown.push(CriterionScore {
                criterion,
                earned,
                possible,
            });
        }
    }

    Ok(GradingPayload {
        score,
        breakdown,
        feedback,
        strengths: optional_string_list(&map, "strengths"),
        weaknesses: optional_string_list(&map, "weaknesses"),
    })
}

/// Validate a follow-up response.
pub fn validate_followup(raw: &str) -> Result<FollowupPayload, ValidationFailure> {
    let map = parse_object(raw)?;
    Ok(FollowupPayload {
        question_text: require_string(&map, "question_text")?,
        background: require_string(&map, "context")?,
    })
}

/// Validate a final-summary response.
pub fn validate_summary(raw: &str) -> Result<SummaryPayload, ValidationFailure> {
    let map = parse_object(raw)?;
    Ok(SummaryPayload {
        explanation: require_string(&map, "explanation")?,
    })
}

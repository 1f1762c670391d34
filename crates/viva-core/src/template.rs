//! Prompt template loading and rendering.
//!
//! Templates are opaque versioned text with `{{name}}` placeholders. The
//! engine never inspects instructional content, only placeholder syntax.
//! Built-in versions of the four prompt kinds ship with the crate; a
//! directory of `.txt` files (file stem = template name) may override them.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

/// Errors from template rendering.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("template `{template}` references missing variable `{variable}`")]
    MissingVariable { template: String, variable: String },
}

pub const QUESTION_GEN_V1: &str = "\
Generate an essay-style exam question.

Topic: {{topic}}
Difficulty: {{difficulty}}
Question Number: {{question_number}}

Provide a clear, thought-provoking question, relevant background context,
and a grading rubric as a list of weighted criteria.

Respond only in JSON, exactly in this shape:
{
  \"question_text\": \"The question text\",
  \"context\": \"Background context and information\",
  \"rubric\": [
    { \"criterion\": \"name\", \"weight\": 25, \"descriptor\": \"what full credit looks like\" }
  ]
}
Do not include any text outside the JSON object.";

pub const GRADE_RESPONSE_V1: &str = "\
Grade the following student answer for an exam question.

Question: {{question_text}}

Context: {{context}}

Grading Rubric:
{{rubric}}

Student Answer: {{student_answer}}

Instructions:
1. Provide a numerical grade (0-100) based on the rubric and answer quality
2. Provide detailed feedback explaining the grade
3. Score each rubric criterion as earned/possible points
4. List strengths and weaknesses of the answer

Respond only in JSON, exactly in this shape:
{
  \"grade\": 85,
  \"feedback\": \"Detailed feedback text\",
  \"breakdown\": [
    { \"criterion\": \"name\", \"earned\": 20, \"possible\": 25 }
  ],
  \"strengths\": [\"strength1\"],
  \"weaknesses\": [\"weakness1\"]
}
Do not include any notes or text outside the JSON object.";

pub const FOLLOWUP_V1: &str = "\
A student answered an exam question below the passing threshold and gets one
more attempt. Restate the question with refined background context that
points the student toward what their answer missed, without giving the
answer away. Do not change what the question fundamentally asks.

Question: {{question_text}}

Original Context: {{context}}

Student Answer: {{student_answer}}

Grader Feedback: {{feedback}}

Respond only in JSON, exactly in this shape:
{
  \"question_text\": \"The restated question\",
  \"context\": \"Refined background context\"
}
Do not include any text outside the JSON object.";

pub const FINAL_GRADE_V1: &str = "\
Write a final-grade explanation for a completed exam.

Question Scores: {{question_scores}}

Feedback Summary:
{{feedback_summary}}

Provide a comprehensive explanation of the overall performance across all
questions. Do not invent scores; the numeric grade is computed elsewhere.

Respond only in JSON, exactly in this shape:
{
  \"explanation\": \"Overall explanation of performance\"
}
Do not include any text outside the JSON object.";

/// System prompt used for question generation.
pub const SYSTEM_GENERATOR: &str = "You are an expert professor creating exam questions. Always respond with valid JSON.";

/// System prompt used for grading.
pub const SYSTEM_GRADER: &str = "You are an expert grader evaluating student exam answers. Be fair and constructive. Always respond with valid JSON.";

/// System prompt used for the final summary.
pub const SYSTEM_FINALIZER: &str = "You are an expert evaluator summarizing final exam performance. Be fair and comprehensive. Always respond with valid JSON.";

/// Named prompt templates with `{{name}}` substitution.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: HashMap<String, String>,
}

impl TemplateStore {
    /// The built-in template set.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert("question_gen_v1".to_string(), QUESTION_GEN_V1.to_string());
        templates.insert(
            "grade_response_v1".to_string(),
            GRADE_RESPONSE_V1.to_string(),
        );
        templates.insert("followup_v1".to_string(), FOLLOWUP_V1.to_string());
        templates.insert("final_grade_v1".to_string(), FINAL_GRADE_V1.to_string());
        Self { templates }
    }

    /// Built-in templates plus overrides loaded from `.txt` files in `dir`.
    pub fn with_overrides_from_dir(dir: &Path) -> Result<Self> {
        let mut store = Self::builtin();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("failed to read template directory: {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "txt") {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read template: {}", path.display()))?;
                store
                    .templates
                    .insert(stem.to_string(), content.trim().to_string());
            }
        }
        Ok(store)
    }

    /// Template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Render a template, substituting every `{{name}}` placeholder from
    /// `vars`. Unused vars are ignored; an unmatched placeholder fails.
    pub fn render(
        &self,
        name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::TemplateNotFound(name.to_string()))?;

        let mut out = String::with_capacity(template.len());
        let mut rest = template.as_str();
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                // Unterminated delimiter is literal text.
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let key = after[..end].trim();
            let value = vars
                .get(key)
                .ok_or_else(|| TemplateError::MissingVariable {
                    template: name.to_string(),
                    variable: key.to_string(),
                })?;
            out.push_str(value);
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Convenience for building the vars map from pairs.
pub fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

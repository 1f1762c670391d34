//! Resilient gateway in front of the model backend.
//!
//! Every model interaction goes through one pipeline: render the template,
//! invoke the backend with bounded retries, validate the raw output against
//! the contract, and on exhaustion substitute deterministic fallback content.
//! The gateway is total: its typed operations never return an error, only a
//! result tagged with where it came from.

use std::sync::Arc;
use std::time::Duration;

use crate::contract::{
    validate_followup, validate_grading, validate_question, validate_summary, FollowupPayload,
    GradingPayload, QuestionPayload, SummaryPayload, ValidationFailure,
};
use crate::fallback;
use crate::model::{GradeSource, Rubric};
use crate::template::{self, TemplateStore};
use crate::traits::{InvokeRequest, ModelInvoker, TransportError};

/// Which of the four prompt kinds an invocation serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    GenerateQuestion,
    Grade,
    Followup,
    FinalSummary,
}

impl PromptKind {
    pub fn template_name(self) -> &'static str {
        match self {
            PromptKind::GenerateQuestion => "question_gen_v1",
            PromptKind::Grade => "grade_response_v1",
            PromptKind::Followup => "followup_v1",
            PromptKind::FinalSummary => "final_grade_v1",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            PromptKind::GenerateQuestion => template::SYSTEM_GENERATOR,
            PromptKind::Grade => template::SYSTEM_GRADER,
            PromptKind::Followup => template::SYSTEM_GRADER,
            PromptKind::FinalSummary => template::SYSTEM_FINALIZER,
        }
    }
}

/// Why the gateway fell back for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The transport kept failing (or failed permanently).
    Transport,
    /// The model answered but never produced contract-valid output.
    InvalidOutput,
}

/// A value plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub value: T,
    pub source: GradeSource,
}

impl<T> Sourced<T> {
    fn model(value: T) -> Self {
        Self {
            value,
            source: GradeSource::Llm,
        }
    }

    fn fallback(value: T) -> Self {
        Self {
            value,
            source: GradeSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == GradeSource::Fallback
    }
}

/// Retry and sampling knobs for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Additional attempts after the first failed one.
    pub max_retries: u32,
    /// Base delay between retries; doubles each retry, capped at 60s.
    pub retry_delay: Duration,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Transport deadline for one invocation.
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            max_tokens: 2000,
            temperature: 0.7,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// The gateway: one backend, one template store, one retry policy.
pub struct LlmGateway {
    invoker: Arc<dyn ModelInvoker>,
    templates: TemplateStore,
    config: GatewayConfig,
}

impl LlmGateway {
    pub fn new(invoker: Arc<dyn ModelInvoker>, templates: TemplateStore, config: GatewayConfig) -> Self {
        Self {
            invoker,
            templates,
            config,
        }
    }

    /// Generate a question for the 0-based slot `position`.
    pub async fn generate_question(
        &self,
        topic: &str,
        difficulty: &str,
        position: usize,
    ) -> Sourced<QuestionPayload> {
        let vars = template::vars([
            ("topic", topic.to_string()),
            ("difficulty", difficulty.to_string()),
            ("question_number", (position + 1).to_string()),
        ]);
        match self
            .attempt(PromptKind::GenerateQuestion, &vars, validate_question)
            .await
        {
            Ok(payload) => Sourced::model(payload),
            Err(reason) => {
                tracing::warn!(position, ?reason, "question generation degraded to fallback");
                let canned = fallback::canned_question(position);
                Sourced::fallback(QuestionPayload {
                    question_text: canned.question_text,
                    background: canned.background,
                    rubric: canned.rubric,
                })
            }
        }
    }

    /// Grade a student answer against its question and rubric.
    pub async fn grade_answer(
        &self,
        question_text: &str,
        background: &str,
        rubric: &Rubric,
        answer: &str,
    ) -> Sourced<GradingPayload> {
        let vars = template::vars([
            ("question_text", question_text.to_string()),
            ("context", background.to_string()),
            ("rubric", rubric.to_prompt_text()),
            ("student_answer", answer.to_string()),
        ]);
        match self.attempt(PromptKind::Grade, &vars, validate_grading).await {
            Ok(payload) => Sourced::model(payload),
            Err(reason) => {
                tracing::warn!(?reason, "grading degraded to length-based fallback");
                let (score, feedback) = fallback::length_based_grade(answer);
                Sourced::fallback(GradingPayload {
                    score,
                    breakdown: fallback::weighted_breakdown(score, rubric),
                    feedback,
                    strengths: vec![
                        "Answer was submitted".to_string(),
                        "Demonstrates engagement with the material".to_string(),
                    ],
                    weaknesses: vec!["Detailed evaluation unavailable".to_string()],
                })
            }
        }
    }

    /// Produce a refined restatement of a question the student failed.
    pub async fn followup(
        &self,
        question_text: &str,
        background: &str,
        answer: &str,
        feedback: &str,
    ) -> Sourced<FollowupPayload> {
        let vars = template::vars([
            ("question_text", question_text.to_string()),
            ("context", background.to_string()),
            ("student_answer", answer.to_string()),
            ("feedback", feedback.to_string()),
        ]);
        match self
            .attempt(PromptKind::Followup, &vars, validate_followup)
            .await
        {
            Ok(payload) => Sourced::model(payload),
            Err(reason) => {
                tracing::warn!(?reason, "follow-up refinement degraded to fallback probe");
                let (question_text, background) =
                    fallback::followup_probe(question_text, background);
                Sourced::fallback(FollowupPayload {
                    question_text,
                    background,
                })
            }
        }
    }

    /// Produce the final-grade narrative.
    pub async fn final_summary(
        &self,
        question_scores: &str,
        feedback_summary: &str,
        scores: &[f64],
        overall: f64,
        degraded: usize,
    ) -> Sourced<SummaryPayload> {
        let vars = template::vars([
            ("question_scores", question_scores.to_string()),
            ("feedback_summary", feedback_summary.to_string()),
        ]);
        match self
            .attempt(PromptKind::FinalSummary, &vars, validate_summary)
            .await
        {
            Ok(payload) => Sourced::model(payload),
            Err(reason) => {
                tracing::warn!(?reason, "final narrative degraded to templated summary");
                Sourced::fallback(SummaryPayload {
                    explanation: fallback::templated_summary(scores, overall, degraded),
                })
            }
        }
    }

    /// The shared pipeline: render, invoke with retries, validate.
    ///
    /// An invalid-but-delivered response consumes an attempt the same way a
    /// transport failure does. Permanent transport errors stop retrying
    /// immediately.
    async fn attempt<T>(
        &self,
        kind: PromptKind,
        vars: &std::collections::HashMap<String, String>,
        validate: fn(&str) -> Result<T, ValidationFailure>,
    ) -> Result<T, FallbackReason> {
        let prompt = match self.templates.render(kind.template_name(), vars) {
            Ok(p) => p,
            Err(e) => {
                // A broken override template is a local defect, not a model
                // failure; go straight to fallback.
                tracing::error!(template = kind.template_name(), error = %e, "template render failed");
                return Err(FallbackReason::InvalidOutput);
            }
        };

        let request = InvokeRequest {
            prompt,
            system_prompt: Some(kind.system_prompt().to_string()),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            timeout: self.config.request_timeout,
        };

        let mut last_reason = FallbackReason::Transport;
        let mut retry_delay = self.config.retry_delay;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
            }
            match self.invoker.invoke(&request).await {
                Ok(response) => match validate(&response.content) {
                    Ok(payload) => return Ok(payload),
                    Err(failure) => {
                        tracing::warn!(
                            template = kind.template_name(),
                            attempt,
                            model = %response.model,
                            %failure,
                            "model output failed contract validation"
                        );
                        last_reason = FallbackReason::InvalidOutput;
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        template = kind.template_name(),
                        attempt,
                        backend = self.invoker.name(),
                        error = %e,
                        "model invocation failed"
                    );
                    if e.is_permanent() {
                        return Err(FallbackReason::Transport);
                    }
                    if let Some(ms) = e.retry_after_ms() {
                        retry_delay = Duration::from_millis(ms);
                    }
                    last_reason = FallbackReason::Transport;
                }
            }
        }
        Err(last_reason)
    }
}

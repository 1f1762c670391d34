//! End-to-end exam flow through the engine, with a scripted model backend
//! and an in-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use viva_core::gateway::{GatewayConfig, LlmGateway};
use viva_core::model::{ContentSource, ExamSession, GradeBand, GradeSource, SessionState};
use viva_core::session::{CurrentQuestion, ExamConfig, ExamEngine, NextAction};
use viva_core::template::TemplateStore;
use viva_core::traits::{
    InvokeRequest, InvokeResponse, ModelInvoker, SessionStore, StoreError, TransportError,
};
use viva_core::{SessionError, ThresholdPolicy};

struct ScriptedInvoker {
    script: Mutex<Vec<Result<String, TransportError>>>,
}

impl ScriptedInvoker {
    fn new(mut script: Vec<Result<String, TransportError>>) -> Self {
        script.reverse();
        Self {
            script: Mutex::new(script),
        }
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, _: &InvokeRequest) -> Result<InvokeResponse, TransportError> {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Err(TransportError::NotConfigured));
        next.map(|content| InvokeResponse {
            content,
            model: "test-model".to_string(),
            latency_ms: 1,
        })
    }
}

#[derive(Default)]
struct MemStore {
    sessions: Mutex<HashMap<Uuid, ExamSession>>,
}

impl MemStore {
    fn snapshot(&self, id: Uuid) -> Option<ExamSession> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl SessionStore for MemStore {
    async fn persist(&self, session: &ExamSession) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<ExamSession, StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}

fn engine(
    script: Vec<Result<String, TransportError>>,
) -> (ExamEngine, Arc<MemStore>) {
    let store = Arc::new(MemStore::default());
    let gateway = LlmGateway::new(
        Arc::new(ScriptedInvoker::new(script)),
        TemplateStore::builtin(),
        GatewayConfig {
            retry_delay: Duration::from_millis(1),
            ..GatewayConfig::default()
        },
    );
    (
        ExamEngine::new(
            gateway,
            ThresholdPolicy::default(),
            store.clone(),
            ExamConfig::default(),
        ),
        store,
    )
}

fn question_json(text: &str) -> String {
    format!(
        r#"{{"question_text": "{text}", "context": "Some background.",
            "rubric": [{{"criterion": "Concept", "weight": 100, "descriptor": "d"}}]}}"#
    )
}

fn grade_json(score: f64) -> String {
    format!(r#"{{"grade": {score}, "feedback": "Graded at {score}."}}"#)
}

fn net_err() -> Result<String, TransportError> {
    Err(TransportError::Network("connection reset".into()))
}

#[tokio::test]
async fn full_exam_with_mixed_degradation() {
    // Q1 generation exhausts retries; Q2/Q3 generate normally. Q2 fails its
    // first attempt, gets a fallback follow-up probe, then passes via the
    // attempt cap. Q3's grading and the final narrative both degrade.
    let script = vec![
        net_err(),
        net_err(),
        net_err(),
        Ok(question_json("Describe TCP congestion control.")),
        Ok(question_json("Explain database indexing.")),
        Ok(grade_json(75.0)),
        Ok(grade_json(40.0)),
        net_err(),
        net_err(),
        net_err(),
        Ok(grade_json(55.0)),
    ];
    let (engine, store) = engine(script);

    let session = engine.start_session("alice").await.unwrap();
    let id = session.id;
    assert_eq!(session.state, SessionState::QuestionPending);
    assert_eq!(session.slots.len(), 3);
    assert_eq!(session.slots[0].source, ContentSource::Fallback);
    assert!(session.slots[0].question_text.contains("data structures"));
    assert_eq!(session.slots[1].source, ContentSource::Generated);
    assert_eq!(session.slots[2].source, ContentSource::Generated);

    // Q1: delivered, answered, passes at 75.
    let q1 = engine.current_question(id).await.unwrap();
    let CurrentQuestion::Question { index: 0, attempt: 1, .. } = &q1 else {
        panic!("expected first question, got {q1:?}");
    };
    assert_eq!(store.snapshot(id).unwrap().state, SessionState::AwaitingAnswer);

    let out = engine.submit_answer(id, "Arrays are contiguous; lists are linked.").await.unwrap();
    assert_eq!(out.result.score, 75.0);
    assert_eq!(out.result.source, GradeSource::Llm);
    assert_eq!(out.next, NextAction::Advance { next_index: 1 });

    // Q2: fails at 40, follow-up requested.
    let q2 = engine.current_question(id).await.unwrap();
    let CurrentQuestion::Question { index: 1, question_text, .. } = q2 else {
        panic!("expected second question");
    };
    assert!(question_text.contains("TCP congestion control"));

    let out = engine.submit_answer(id, "Something vague.").await.unwrap();
    assert_eq!(out.next, NextAction::Followup);
    assert_eq!(store.snapshot(id).unwrap().state, SessionState::FollowupPending);

    // Follow-up refinement degrades to the probe: same question, extended
    // background, attempt number 2.
    let q2_again = engine.current_question(id).await.unwrap();
    let CurrentQuestion::Question { index: 1, attempt: 2, question_text, background, .. } = q2_again
    else {
        panic!("expected follow-up redelivery");
    };
    assert!(question_text.contains("TCP congestion control"));
    assert!(background.contains("Revisit your previous answer"));

    // Second attempt scores 55: below threshold but at the attempt cap.
    let out = engine.submit_answer(id, "A longer second answer.").await.unwrap();
    assert_eq!(out.result.score, 55.0);
    assert_eq!(out.next, NextAction::Advance { next_index: 2 });

    // Q3: grading degrades to the length heuristic (answer in the 200..=500
    // range lands at 75), completing the exam.
    engine.current_question(id).await.unwrap();
    let answer = "Indexes are auxiliary structures that trade write cost and storage for \
                  faster lookups. A B-tree index keeps keys sorted for range scans, while a \
                  hash index serves point queries. Choosing columns follows the query \
                  predicates and their selectivity."
        .to_string();
    assert!(answer.len() > 200 && answer.len() <= 500);
    let out = engine.submit_answer(id, &answer).await.unwrap();
    assert_eq!(out.result.score, 75.0);
    assert_eq!(out.result.source, GradeSource::Fallback);
    assert_eq!(out.next, NextAction::Completed);

    // Final grade: mean of best scores (75, 55, 75) with a templated
    // narrative, since the summary call also failed.
    let grade = engine.final_grade(id).await.unwrap();
    assert!((grade.score - (75.0 + 55.0 + 75.0) / 3.0).abs() < 1e-9);
    assert_eq!(grade.band, GradeBand::NeedsImprovement);
    assert_eq!(grade.narrative_source, GradeSource::Fallback);
    // The templated narrative notes that one question used degraded grading.
    assert!(grade.explanation.contains("1 question(s)"));
    assert_eq!(grade.per_question.len(), 3);
    assert_eq!(grade.per_question[1].attempts, 2);

    let stored = store.snapshot(id).unwrap();
    assert_eq!(stored.state, SessionState::Completed);
    assert_eq!(stored.final_grade.unwrap(), grade);

    // Asking again after completion is a no-op.
    assert_eq!(
        engine.current_question(id).await.unwrap(),
        CurrentQuestion::Completed
    );
}

#[tokio::test]
async fn out_of_order_submit_is_rejected_without_side_effects() {
    let (engine, store) = engine(vec![
        Ok(question_json("Q1")),
        Ok(question_json("Q2")),
        Ok(question_json("Q3")),
    ]);
    let session = engine.start_session("bob").await.unwrap();
    let id = session.id;

    // Submitting before the question was delivered is invalid.
    let before = store.snapshot(id).unwrap();
    let err = engine.submit_answer(id, "too eager").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidState {
            operation: "submit_answer",
            state: SessionState::QuestionPending,
        }
    ));
    assert_eq!(store.snapshot(id).unwrap(), before);

    // The session still proceeds normally afterwards.
    engine.current_question(id).await.unwrap();
    assert_eq!(store.snapshot(id).unwrap().state, SessionState::AwaitingAnswer);
}

#[tokio::test]
async fn redelivery_while_awaiting_answer_is_idempotent() {
    let (engine, store) = engine(vec![
        Ok(question_json("Q1")),
        Ok(question_json("Q2")),
        Ok(question_json("Q3")),
    ]);
    let id = engine.start_session("carol").await.unwrap().id;

    let first = engine.current_question(id).await.unwrap();
    let snapshot = store.snapshot(id).unwrap();
    let second = engine.current_question(id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.snapshot(id).unwrap(), snapshot);
}

#[tokio::test]
async fn final_grade_before_completion_is_rejected() {
    let (engine, _) = engine(vec![]);
    let id = engine.start_session("dave").await.unwrap().id;
    assert!(matches!(
        engine.final_grade(id).await.unwrap_err(),
        SessionError::NotCompleted(got) if got == id
    ));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (engine, _) = engine(vec![]);
    let id = Uuid::new_v4();
    assert!(matches!(
        engine.current_question(id).await.unwrap_err(),
        SessionError::NotFound(got) if got == id
    ));
}

#[tokio::test]
async fn fully_offline_exam_completes_on_fallbacks_alone() {
    // No script at all: every invocation is NotConfigured. The exam still
    // runs end to end on canned questions and length-based grading.
    let (engine, _) = engine(vec![]);
    let session = engine.start_session("erin").await.unwrap();
    let id = session.id;
    assert!(session.slots.iter().all(|s| s.source == ContentSource::Fallback));

    let long_answer = "detail ".repeat(80);
    for _ in 0..3 {
        engine.current_question(id).await.unwrap();
        let out = engine.submit_answer(id, &long_answer).await.unwrap();
        assert_eq!(out.result.score, 85.0);
        assert_eq!(out.result.source, GradeSource::Fallback);
    }

    let grade = engine.final_grade(id).await.unwrap();
    assert_eq!(grade.score, 85.0);
    assert_eq!(grade.band, GradeBand::Good);
    assert_eq!(grade.narrative_source, GradeSource::Fallback);
}

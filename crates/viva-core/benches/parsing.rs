use criterion::{black_box, criterion_group, criterion_main, Criterion};

use viva_core::contract::{validate_grading, validate_question};

const QUESTION_RESPONSE: &str = r#"{
    "question_text": "Explain the trade-offs between optimistic and pessimistic concurrency control.",
    "context": "Databases coordinate concurrent transactions either by locking up front or by validating at commit time.",
    "rubric": [
        {"criterion": "Pessimistic locking", "weight": 30, "descriptor": "Explains lock acquisition and blocking"},
        {"criterion": "Optimistic validation", "weight": 30, "descriptor": "Explains versioning and conflict detection"},
        {"criterion": "Trade-off analysis", "weight": 30, "descriptor": "Contrasts contention profiles"},
        {"criterion": "Examples", "weight": 10, "descriptor": "Names systems using each"}
    ]
}"#;

const GRADING_RESPONSE: &str = r#"{
    "grade": 82,
    "feedback": "Strong coverage of locking; the optimistic side needed more depth on validation.",
    "breakdown": [
        {"criterion": "Pessimistic locking", "earned": 28, "possible": 30},
        {"criterion": "Optimistic validation", "earned": 20, "possible": 30},
        {"criterion": "Trade-off analysis", "earned": 26, "possible": 30},
        {"criterion": "Examples", "earned": 8, "possible": 10}
    ],
    "strengths": ["clear structure", "correct lock semantics"],
    "weaknesses": ["thin validation discussion"]
}"#;

fn bench_validate_question(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_question");

    group.bench_function("bare_json", |b| {
        b.iter(|| validate_question(black_box(QUESTION_RESPONSE)))
    });

    let fenced = format!("Here is the question:\n```json\n{QUESTION_RESPONSE}\n```");
    group.bench_function("fenced_json", |b| {
        b.iter(|| validate_question(black_box(&fenced)))
    });

    group.finish();
}

fn bench_validate_grading(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_grading");

    group.bench_function("full_breakdown", |b| {
        b.iter(|| validate_grading(black_box(GRADING_RESPONSE)))
    });

    group.bench_function("rejects_prose", |b| {
        b.iter(|| validate_grading(black_box("I'd say this answer deserves a B+.")))
    });

    group.finish();
}

criterion_group!(benches, bench_validate_question, bench_validate_grading);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use viva_core::fallback::{length_based_grade, weighted_breakdown};
use viva_core::model::{Criterion as RubricCriterion, Rubric};
use viva_core::policy::ThresholdPolicy;

fn make_rubric(criteria: usize) -> Rubric {
    Rubric {
        criteria: (0..criteria)
            .map(|i| RubricCriterion {
                name: format!("Criterion {i}"),
                weight: 10 + (i as u32 % 5) * 5,
                descriptor: "What full credit looks like".into(),
            })
            .collect(),
    }
}

fn bench_length_grade(c: &mut Criterion) {
    let mut group = c.benchmark_group("length_based_grade");

    for (label, len) in [("short", 30), ("medium", 300), ("long", 3000)] {
        let answer = "a".repeat(len);
        group.bench_function(label, |b| b.iter(|| length_based_grade(black_box(&answer))));
    }

    group.finish();
}

fn bench_weighted_breakdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("weighted_breakdown");

    for criteria in [4usize, 10, 50] {
        let rubric = make_rubric(criteria);
        group.bench_function(format!("criteria={criteria}"), |b| {
            b.iter(|| weighted_breakdown(black_box(72.5), black_box(&rubric)))
        });
    }

    group.finish();
}

fn bench_policy_decide(c: &mut Criterion) {
    let policy = ThresholdPolicy::default();
    c.bench_function("policy_decide", |b| {
        b.iter(|| policy.decide(black_box(59.9), black_box(1)))
    });
}

criterion_group!(
    benches,
    bench_length_grade,
    bench_weighted_breakdown,
    bench_policy_decide
);
criterion_main!(benches);

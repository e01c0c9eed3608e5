//! Benchmarks for chain construction and evaluation

use chrono::NaiveDate;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use interval_engine::{CalendarDelta, EvalOptions, Expression};

fn bench_build_chain(c: &mut Criterion) {
    let expr = Expression::new();

    c.bench_function("build_chain", |b| {
        b.iter(|| {
            let chain = expr
                .year()
                .month()
                .and_then(|m| m.at(black_box(-1)))
                .and_then(|m| m.day())
                .and_then(|d| d.at(black_box(24)));
            black_box(chain)
        })
    });
}

fn bench_evaluate_shallow(c: &mut Criterion) {
    let chain = Expression::new()
        .month()
        .day()
        .and_then(|d| d.at(-1))
        .expect("valid chain");
    let instant = NaiveDate::from_ymd_opt(2024, 2, 14)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid instant");

    c.bench_function("evaluate_shallow", |b| {
        b.iter(|| black_box(chain.evaluate(black_box(instant))))
    });
}

fn bench_evaluate_deep_operation_safe(c: &mut Criterion) {
    let expr = Expression::new();
    let chain = (|| {
        let anchor = expr.year().month()?.at(1)?.day()?.at(27)? + CalendarDelta::days(1)
            - expr.month().n(1)?;
        anchor
            .minute()?
            .at(5)?
            .second()?
            .at(4)?
            .decisecond()?
            .at(-2)?
            .millisecond()?
            .at(5)?
            .microsecond()?
            .at(-1)
    })()
    .expect("valid chain");
    let instant = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid instant");
    let options = EvalOptions::operation_safe();

    c.bench_function("evaluate_deep_operation_safe", |b| {
        b.iter(|| black_box(chain.evaluate_with_options(black_box(instant), &options)))
    });
}

criterion_group!(
    benches,
    bench_build_chain,
    bench_evaluate_shallow,
    bench_evaluate_deep_operation_safe
);
criterion_main!(benches);

//! Benchmarks for the similarity scorer and the relevance filter.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use paperflow::backends::SearchHit;
use paperflow::similarity::{reduce_query, score};
use paperflow::stages::filter_relevant;

const ABSTRACT: &str = "Graph neural networks learn node representations by passing \
    messages along edges. We survey spectral and spatial variants, their expressive \
    power, and applications to molecules, recommendation and traffic forecasting.";

fn hits(count: usize) -> Vec<SearchHit> {
    (0..count)
        .map(|i| {
            SearchHit::new(
                format!("Graph Neural Networks, part {i}"),
                ABSTRACT,
                format!("id-{i}"),
                format!("pdf-{i}"),
            )
        })
        .collect()
}

fn similarity_benchmark(c: &mut Criterion) {
    let other = "Message passing neural networks for quantum chemistry and molecules.";
    c.bench_function("score", |b| b.iter(|| score(black_box(ABSTRACT), black_box(other))));
    c.bench_function("reduce_query", |b| {
        b.iter(|| reduce_query(black_box(ABSTRACT), black_box(6)));
    });
}

fn filter_benchmark(c: &mut Criterion) {
    let batch = hits(50);
    c.bench_function("filter_relevant_50", |b| {
        b.iter(|| filter_relevant(black_box("Graph Neural Networks"), batch.clone(), 0.5));
    });
}

criterion_group!(benches, similarity_benchmark, filter_benchmark);
criterion_main!(benches);

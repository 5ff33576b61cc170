//! Candidate Ranking Benchmark
//!
//! Scenario:
//! - 2,000 canonical organism names spread over 40 genera
//! - 200 misspelled pending tokens
//! - Full-pool ranking vs. genus-restricted ranking

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use value_standardizer::matching::{rank, rank_many, weighted_ratio, CanonicalPool, PoolScope};
use value_standardizer::types::{CanonicalValue, TargetColumn, Token, TokenPosition};
use value_standardizer::utils::normalize;

const GENERA: usize = 40;

fn canonical_values(count: usize) -> Vec<CanonicalValue> {
    (0..count)
        .filter_map(|i| CanonicalValue::new(&format!("Genus{} species{}", i % GENERA, i)))
        .collect()
}

fn pending_tokens(count: usize) -> Vec<Token> {
    (0..count)
        .map(|i| {
            let raw = format!("genus{} specis{}", i % GENERA, i * 7);
            Token {
                key: normalize(&raw),
                display: raw.clone(),
                raw,
                column: TargetColumn::IsolatedOrganisms,
                position: TokenPosition { row: i, index: 0 },
            }
        })
        .collect()
}

fn bench_similarity(c: &mut Criterion) {
    c.bench_function("weighted_ratio", |b| {
        b.iter(|| weighted_ratio(black_box("klebsiella pneum"), black_box("klebsiella pneumoniae")))
    });
}

fn bench_rank(c: &mut Criterion) {
    let canonical = canonical_values(2_000);
    let tokens = pending_tokens(200);
    let pool = CanonicalPool::build(canonical.iter(), tokens.iter());

    let token = &tokens[0];
    c.bench_function("rank_single_full_pool", |b| {
        b.iter(|| {
            let entries = pool.select(token, PoolScope::Full);
            rank(black_box(&token.key), &entries, 10, 0)
        })
    });

    let mut group = c.benchmark_group("rank_many");
    group.throughput(Throughput::Elements(tokens.len() as u64));
    for restrict in [false, true] {
        let label = if restrict { "genus" } else { "full" };
        group.bench_with_input(BenchmarkId::from_parameter(label), &restrict, |b, &restrict| {
            b.iter(|| rank_many(black_box(&tokens), &pool, restrict, 10, 0))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_similarity, bench_rank);
criterion_main!(benches);

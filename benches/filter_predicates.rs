//! Filter and Statement Benchmark (Criterion)
//!
//! Measures building field filters and rendering the SQL statements the
//! store issues for them.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use policy_rule_store::core::StatementBuilder;
use policy_rule_store::{Backend, FieldFilter, PolicyRecord};
use std::hint::black_box;

fn sample_records(count: usize) -> Vec<PolicyRecord> {
    (0..count)
        .map(|i| {
            let rule = [
                format!("user-{}", i),
                format!("data-{}", i % 17),
                "read".to_string(),
            ];
            PolicyRecord::from_rule("p", &rule).unwrap()
        })
        .collect()
}

fn benchmark_field_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_filter");

    for (name, offset, values) in [
        ("prefix", 0, vec!["alice", "data1"]),
        ("wildcard", 0, vec!["", "data1", ""]),
        ("offset", 2, vec!["read"]),
        ("clipped", -1, vec!["x", "alice", "data1", "read", "a", "b", "c"]),
    ] {
        group.bench_with_input(BenchmarkId::new("new", name), &(offset, values), |b, (offset, values)| {
            b.iter(|| FieldFilter::new(black_box("p"), black_box(*offset), black_box(values)));
        });
    }

    let records = sample_records(1);
    let filter = FieldFilter::for_record(&records[0]);
    group.bench_function("matches", |b| {
        b.iter(|| filter.matches(black_box(&records[0])));
    });

    group.finish();
}

fn benchmark_statements(c: &mut Criterion) {
    let statements = StatementBuilder::new("policy_rules", Backend::Postgres);
    let filter = FieldFilter::new("p", 0, &["alice", "", "read"]);

    let mut group = c.benchmark_group("statements");

    group.bench_function("delete", |b| {
        b.iter(|| statements.delete(black_box(&filter)));
    });

    for count in [1, 10, 100].iter() {
        let records = sample_records(*count);
        group.bench_with_input(BenchmarkId::new("insert", count), &records, |b, records| {
            b.iter(|| statements.insert(black_box(records)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_field_filter, benchmark_statements);
criterion_main!(benches);

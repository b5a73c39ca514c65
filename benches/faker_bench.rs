use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dbsnap::config::{FakerConfig, PatternType};
use dbsnap::connection::{Row, Value};
use dbsnap::faker::{Faker, PatternDetector};
use std::hint::black_box;

fn person_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let mut row = Row::new();
            row.insert("id".into(), Value::Int(i as i64));
            row.insert("fio".into(), Value::Text(format!("Иванов Иван Иванович {i}")));
            row.insert("email".into(), Value::Text(format!("user{i}@example.com")));
            row.insert("phone".into(), Value::Text(format!("+7 (916) {:03}-{:02}-{:02}", i % 1000, i % 100, i % 97)));
            row.insert("sex".into(), Value::from(if i % 2 == 0 { "M" } else { "F" }));
            row
        })
        .collect()
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("faker_apply");

    let mut config = FakerConfig::default();
    config.set("public", "users", "fio", PatternType::FullName);
    config.set("public", "users", "email", PatternType::Email);
    config.set("public", "users", "phone", PatternType::Phone);
    config.set("public", "users", "sex", PatternType::Gender);

    for count in [100, 1_000, 10_000] {
        let rows = person_rows(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("rows", count), &rows, |b, rows| {
            b.iter_with_setup(
                || rows.clone(),
                |rows| black_box(Faker::apply("public", "users", &config, rows)),
            )
        });
    }

    group.finish();
}

fn bench_detect(c: &mut Criterion) {
    let rows = person_rows(200);
    c.bench_function("detector_classify_200_rows", |b| {
        b.iter(|| black_box(PatternDetector::classify(black_box(&rows))))
    });
}

criterion_group!(benches, bench_apply, bench_detect);
criterion_main!(benches);

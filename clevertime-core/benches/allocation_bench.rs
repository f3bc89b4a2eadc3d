use clevertime_core::advisor::parse_create_table;
use clevertime_core::allocation::{memory_preset, AdjustMode, AllocationSet};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_adjust_part(c: &mut Criterion) {
    let base = AllocationSet::new(memory_preset()).unwrap();

    c.bench_function("adjust_part", |b| {
        b.iter(|| {
            let mut set = base.clone();
            for value in [10.0, 40.0, 25.0, 60.0, 5.0] {
                set.adjust_part(black_box("page"), black_box(value), AdjustMode::Percent);
            }
            set
        })
    });
}

fn bench_parse_create_table(c: &mut Criterion) {
    let sql = "CREATE TABLE monitor (host STRING, ts TIMESTAMP, cpu DOUBLE, \
               TIME INDEX (ts), PRIMARY KEY (host)) ENGINE=mito";

    c.bench_function("parse_create_table", |b| {
        b.iter(|| parse_create_table(black_box(sql)).unwrap())
    });
}

criterion_group!(benches, bench_adjust_part, bench_parse_create_table);
criterion_main!(benches);

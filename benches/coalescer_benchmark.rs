//! Performance benchmarks for the change pipeline hot path.
//!
//! **Benchmarks Included:**
//! - `coalesce_burst`: one path hit repeatedly inside the throttle window
//! - `coalesce_distinct`: many distinct paths, each emitted once
//! - `noise_filter`: accept/reject decisions over a mixed path set
//!
//! **Run benchmarks:**
//! ```bash
//! cargo bench                          # Run all benchmarks
//! cargo bench -- coalesce              # Coalescer only
//! ```

use std::time::{Duration, Instant};

use codespace::watcher::{CoalescerConfig, EventCoalescer, NoiseFilter, PendingChange};
use codespace::workspace::RelativePath;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn paths(count: usize) -> Vec<RelativePath> {
    (0..count)
        .map(|i| RelativePath::parse(&format!("src/module_{}/file_{i}.rs", i % 16)).unwrap())
        .collect()
}

fn bench_coalesce_burst(c: &mut Criterion) {
    let path = RelativePath::parse("src/main.rs").unwrap();

    c.bench_function("coalesce_burst", |b| {
        let mut coalescer = EventCoalescer::new(CoalescerConfig::default());
        let start = Instant::now();
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            let now = start + Duration::from_micros(tick);
            black_box(coalescer.coalesce(PendingChange::modified(path.clone()), now))
        });
    });
}

fn bench_coalesce_distinct(c: &mut Criterion) {
    let mut group = c.benchmark_group("coalesce_distinct");

    for count in &[100usize, 1_000, 10_000] {
        let paths = paths(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &paths, |b, paths| {
            b.iter(|| {
                let mut coalescer = EventCoalescer::new(CoalescerConfig::default());
                let now = Instant::now();
                for path in paths {
                    black_box(coalescer.coalesce(PendingChange::created(path.clone()), now));
                }
            });
        });
    }

    group.finish();
}

fn bench_noise_filter(c: &mut Criterion) {
    let filter = NoiseFilter::new();
    let mixed: Vec<RelativePath> = [
        "src/lib.rs",
        ".git/HEAD",
        "notes/.draft.md.swp",
        "build/output.tmp",
        "docs/guide/intro.md",
        "4913",
    ]
    .iter()
    .map(|p| RelativePath::parse(p).unwrap())
    .collect();

    c.bench_function("noise_filter", |b| {
        b.iter(|| {
            for path in &mixed {
                black_box(filter.accepts(path));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_coalesce_burst,
    bench_coalesce_distinct,
    bench_noise_filter
);
criterion_main!(benches);

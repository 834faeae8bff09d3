//! Benchmarks for the emit hot path.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use relay_core::Signal;

fn bench_direct_emit(c: &mut Criterion) {
    let signal: Signal<u64> = Signal::new();
    for _ in 0..3 {
        signal.connect(|v| {
            black_box(v);
        });
    }

    c.bench_function("emit_direct_3_slots", |b| {
        b.iter(|| signal.emit(black_box(1)))
    });
}

fn bench_empty_emit(c: &mut Criterion) {
    let signal: Signal<u64> = Signal::new();

    c.bench_function("emit_no_slots", |b| b.iter(|| signal.emit(black_box(1))));
}

criterion_group!(benches, bench_direct_emit, bench_empty_emit);
criterion_main!(benches);

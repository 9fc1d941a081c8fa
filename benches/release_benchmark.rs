//! Benchmarks for handle release cascades
//!
//! Measures:
//! - Creating and releasing a single handle
//! - Releasing a deep dependency chain
//! - Releasing a wide fan-out

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use native_handles::Handle;
use std::hint::black_box;

fn chain(depth: usize) -> Handle {
    let mut head = Handle::new(0usize, |v| {
        black_box(v);
    })
    .unwrap();

    for i in 1..depth {
        let next = Handle::new(i, |v| {
            black_box(v);
        })
        .unwrap();
        next.add_dependency(&head).unwrap();
        head = next;
    }

    head
}

fn fan_out(width: usize) -> Handle {
    let root = Handle::new(0usize, |v| {
        black_box(v);
    })
    .unwrap();

    for i in 1..=width {
        let leaf = Handle::new(i, |v| {
            black_box(v);
        })
        .unwrap();
        root.add_dependency(&leaf).unwrap();
    }

    root
}

/// Benchmark: single handle, no dependencies
fn bench_single(c: &mut Criterion) {
    c.bench_function("create_release_single", |b| {
        b.iter(|| {
            let handle = Handle::new(black_box(1u64), |v| {
                black_box(v);
            })
            .unwrap();
            handle.release();
        });
    });
}

/// Benchmark: release a chain where every handle depends on the previous one
fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("release_chain");

    for depth in [10usize, 1_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter_batched(
                || chain(depth),
                Handle::release,
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Benchmark: release a root holding many leaf dependencies
fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("release_fan_out");

    for width in [10usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter_batched(
                || fan_out(width),
                Handle::release,
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single, bench_chain, bench_fan_out);
criterion_main!(benches);

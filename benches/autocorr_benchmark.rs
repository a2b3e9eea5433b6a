#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
//! Benchmark for the autocorrelation strategies.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kernel_bench::prelude::*;

fn test_signal(size: usize) -> Signal {
    // Deterministic, roughly periodic samples
    let samples: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            (x * std::f32::consts::TAU * 8.0).sin() + (i % 13) as f32 * 0.05
        })
        .collect();
    Signal::new(&samples).unwrap()
}

fn autocorr_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("autocorrelation");
    let pool = worker_pool(4).unwrap();
    let host = HostExecutor::new(4).unwrap();
    let program = KernelProgram::builtin(32);

    for size in [1_024, 4_096, 16_384] {
        let signal = test_signal(size);
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("serial", size), &signal, |b, s| {
            b.iter(|| serial::autocorrelate(black_box(s)));
        });

        group.bench_with_input(BenchmarkId::new("parallel_4", size), &signal, |b, s| {
            b.iter(|| parallel::autocorrelate(black_box(s), &pool));
        });

        for backend in [VectorBackend::Intrinsics, VectorBackend::Trueno] {
            group.bench_with_input(BenchmarkId::new(backend.name(), size), &signal, |b, s| {
                b.iter(|| simd::autocorrelate(black_box(s), backend));
            });
        }

        group.bench_with_input(BenchmarkId::new("offload_host", size), &signal, |b, s| {
            b.iter(|| host.run(&program, black_box(s.doubled()), s.len()).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, autocorr_benchmark);
criterion_main!(benches);

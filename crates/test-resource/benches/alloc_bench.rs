// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the instrumented allocation path.
//!
//! The interesting number is the instrumentation overhead on top of the
//! raw system allocator: header bookkeeping, canary fills, registry
//! maintenance, and the deallocate-time verification scan.

use criterion::{criterion_group, criterion_main, Criterion};
use memory_resource::{system_resource, MemoryResource};
use std::hint::black_box;
use test_resource::{null_reporter, ResourceOptions, TestResource};

fn instrumented_resource() -> TestResource {
    TestResource::with_parts(
        ResourceOptions {
            name: "bench".into(),
            ..Default::default()
        },
        system_resource(),
        null_reporter(),
    )
}

fn bench_allocate_deallocate(c: &mut Criterion) {
    let tr = instrumented_resource();
    let mut group = c.benchmark_group("allocate_deallocate");

    for &bytes in &[16usize, 256, 4096] {
        group.bench_function(format!("instrumented_{bytes}"), |b| {
            b.iter(|| {
                let p = tr.allocate(black_box(bytes), 8).unwrap();
                unsafe { tr.deallocate(p.as_ptr(), bytes, 8) };
            })
        });
    }

    let system = system_resource();
    for &bytes in &[16usize, 256, 4096] {
        group.bench_function(format!("system_{bytes}"), |b| {
            b.iter(|| {
                let p = system.allocate(black_box(bytes), 8).unwrap();
                unsafe { system.deallocate(p.as_ptr(), bytes, 8) };
            })
        });
    }
    group.finish();
}

fn bench_large_alignment(c: &mut Criterion) {
    let tr = instrumented_resource();
    c.bench_function("allocate_deallocate_aligned_4096", |b| {
        b.iter(|| {
            let p = tr.allocate(black_box(64), 4096).unwrap();
            unsafe { tr.deallocate(p.as_ptr(), 64, 4096) };
        })
    });
}

fn bench_live_registry_churn(c: &mut Criterion) {
    // Deallocation cost with many live blocks: removal must stay O(1)
    // however long the registry grows.
    let tr = instrumented_resource();
    let held: Vec<_> = (0..1024).map(|_| tr.allocate(32, 8).unwrap()).collect();

    c.bench_function("pair_with_1024_live_blocks", |b| {
        b.iter(|| {
            let p = tr.allocate(black_box(32), 8).unwrap();
            unsafe { tr.deallocate(p.as_ptr(), 32, 8) };
        })
    });

    for p in held {
        unsafe { tr.deallocate(p.as_ptr(), 32, 8) };
    }
}

criterion_group!(
    benches,
    bench_allocate_deallocate,
    bench_large_alignment,
    bench_live_registry_churn
);
criterion_main!(benches);

// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Core `Tree` operation benchmarks.
//!
//! Measures:
//! - insert() - single-key insert, amortized over a growing tree
//! - search() - point lookup at a few tree sizes
//! - delete() - single-key delete, including merge cascades
//! - concurrent searches across multiple threads against a shared tree

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reedindex::btree::{Order, Record, Tree};
use std::sync::Arc;
use std::thread;

fn key_for(i: u32) -> Vec<u8> {
    i.to_be_bytes().to_vec()
}

fn populated_tree(count: u32) -> Tree {
    let tree = Tree::new(Order::new(32).unwrap());
    for i in 0..count {
        tree.insert(Record::new(key_for(i), key_for(i)));
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [100u32, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || populated_tree(size),
                |tree| {
                    black_box(tree.insert(Record::new(key_for(size), key_for(size))));
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for size in [100u32, 1_000, 10_000].iter() {
        let tree = populated_tree(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let key = key_for(size / 2);
            b.iter(|| {
                black_box(tree.search(&key));
            });
        });
    }

    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");
    group.sample_size(30);

    for size in [100u32, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || populated_tree(size),
                |tree| {
                    black_box(tree.delete(&key_for(size / 2)));
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_concurrent_searches(c: &mut Criterion) {
    let tree = Arc::new(populated_tree(10_000));
    let mut group = c.benchmark_group("concurrent_searches");

    for thread_count in [1, 2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(thread_count),
            thread_count,
            |b, &threads| {
                b.iter(|| {
                    let handles: Vec<_> = (0..threads)
                        .map(|t| {
                            let tree = Arc::clone(&tree);
                            thread::spawn(move || {
                                for i in 0..100u32 {
                                    black_box(tree.search(&key_for((t as u32 * 37 + i) % 10_000)));
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_search,
    bench_delete,
    bench_concurrent_searches
);
criterion_main!(benches);

//! Micro benchmarks for the in-memory tree engine.
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;

use bramble::Tree;

const DEGREE: usize = 100;
const INSERT_COUNT: i64 = 10_000;
const PRELOAD_COUNT: i64 = 100_000;

fn preloaded_tree(count: i64) -> Tree {
    let tree = Tree::new(DEGREE).unwrap();
    for key in 0..count {
        tree.insert(key, Value::Null);
    }
    tree
}

fn tree_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree");
    group.sample_size(20);

    group.throughput(Throughput::Elements(INSERT_COUNT as u64));
    group.bench_function("sequential_insert", |b| {
        b.iter_batched(
            || Tree::new(DEGREE).unwrap(),
            |tree| {
                for key in 0..INSERT_COUNT {
                    tree.insert(key, Value::Null);
                }
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        );
    });

    let mut random_keys: Vec<i64> = (0..INSERT_COUNT).collect();
    random_keys.shuffle(&mut ChaCha8Rng::seed_from_u64(0xB7A3));
    group.throughput(Throughput::Elements(INSERT_COUNT as u64));
    group.bench_function("random_insert", |b| {
        b.iter_batched(
            || Tree::new(DEGREE).unwrap(),
            |tree| {
                for &key in &random_keys {
                    tree.insert(key, Value::Null);
                }
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        );
    });

    let preloaded = preloaded_tree(PRELOAD_COUNT);
    group.throughput(Throughput::Elements(PRELOAD_COUNT as u64));
    group.bench_function("search_preloaded", |b| {
        b.iter(|| {
            for key in 0..PRELOAD_COUNT {
                black_box(preloaded.search(key));
            }
        });
    });

    let mut delete_keys: Vec<i64> = (0..INSERT_COUNT).collect();
    delete_keys.shuffle(&mut ChaCha8Rng::seed_from_u64(0xDE1E7E));
    group.throughput(Throughput::Elements(INSERT_COUNT as u64));
    group.bench_function("random_delete", |b| {
        b.iter_batched(
            || {
                let tree = Tree::new(DEGREE).unwrap();
                for key in 0..INSERT_COUNT {
                    tree.insert(key, Value::Null);
                }
                tree
            },
            |tree| {
                for &key in &delete_keys {
                    tree.delete(key);
                }
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, tree_benches);
criterion_main!(benches);

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use qtserver::{Attribute, Dataset, QtMiner, Value};
use rand::prelude::*;

fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("qt");

    // Generate synthetic data: four continuous attributes plus one discrete
    let mut rng = StdRng::seed_from_u64(42);
    let n = 300;
    let labels = ["a", "b", "c"];

    let mut attributes: Vec<Attribute> = (0..4)
        .map(|i| Attribute::continuous(format!("x{}", i), i, 0.0, 1.0))
        .collect();
    attributes.push(Attribute::discrete("label", 4, labels));

    let examples: Vec<Vec<Value>> = (0..n)
        .map(|_| {
            let mut row: Vec<Value> = (0..4)
                .map(|_| Value::Continuous(rng.gen_range(0.0..1.0)))
                .collect();
            row.push(Value::Discrete(labels[rng.gen_range(0..labels.len())].to_string()));
            row
        })
        .collect();
    let data = Dataset::new(attributes, examples).unwrap();

    group.bench_function("compute_n300_d5_r0.8", |b| {
        b.iter(|| {
            let mut miner = QtMiner::new(0.8).unwrap();
            let _ = miner.compute(black_box(&data));
        })
    });

    group.finish();
}

criterion_group!(benches, bench_compute);
criterion_main!(benches);

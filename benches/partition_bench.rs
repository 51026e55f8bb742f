use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lsh_partition::{
    DbId, EuclideanHashFunctionFamily, InMemoryDataSet, LocalitySensitiveHashFunction,
    MemoryPartitionFactory, Partitioner, PartitioningStrategy, RandomFactory, StrategyKind,
};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn generate_vectors(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| StandardNormal.sample(&mut rng)).collect())
        .collect()
}

fn build_dataset(count: usize, dim: usize) -> InMemoryDataSet {
    let mut ds = InMemoryDataSet::new(dim).unwrap();
    for (i, v) in generate_vectors(count, dim, 99).iter().enumerate() {
        ds.insert(DbId(i as u64), v).unwrap();
    }
    ds
}

// ---------------------------------------------------------------------------
// Hash evaluation
// ---------------------------------------------------------------------------

fn bench_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash");

    for &dim in &[32, 128, 768] {
        for &l in &[1usize, 4, 16] {
            let family =
                EuclideanHashFunctionFamily::new(RandomFactory::seeded(42), 4.0, l).unwrap();
            let h = family.generate(dim).unwrap();
            let v = Array1::from_vec(generate_vectors(1, dim, 7).remove(0));

            group.bench_with_input(BenchmarkId::new(format!("dim={dim}"), l), &l, |b, _| {
                b.iter(|| h.hash(&v.view()).unwrap());
            });
        }
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Full partitioning runs
// ---------------------------------------------------------------------------

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    group.sample_size(20);

    for &n in &[1_000usize, 10_000] {
        let ds = build_dataset(n, 64);
        for (name, kind) in [
            ("random", StrategyKind::Random),
            ("hash", StrategyKind::HashGuided),
        ] {
            let partitioner = Partitioner::builder()
                .strategy(kind)
                .seed(42)
                .build()
                .unwrap();
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, _| {
                b.iter(|| {
                    partitioner
                        .make_partitions(&ds, 1, 16, &MemoryPartitionFactory)
                        .unwrap()
                });
            });
        }
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_hash, bench_partition);
criterion_main!(benches);

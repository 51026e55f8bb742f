use lsh_partition::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn random_vector(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    let normal = Normal::new(0.0f32, 1.0).unwrap();
    (0..dim).map(|_| normal.sample(rng)).collect()
}

fn make_dataset(n: usize, dim: usize, seed: u64) -> InMemoryDataSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ds = InMemoryDataSet::new(dim).unwrap();
    for i in 0..n {
        ds.insert(DbId(i as u64), &random_vector(&mut rng, dim)).unwrap();
    }
    ds
}

// ---------------------------------------------------------------------------
// 1. Large-scale random partitioning
//    20,000 vectors into 37 partitions: sizes, coverage, no duplicates.
// ---------------------------------------------------------------------------

#[test]
fn stress_large_scale_random() {
    let n = 20_000;
    let p = 37;
    let ds = make_dataset(n, 16, 1);
    let parts = Partitioner::builder()
        .seed(42)
        .build()
        .unwrap()
        .make_partitions(&ds, 4, p, &MemoryPartitionFactory)
        .unwrap();

    let target = n.div_ceil(p);
    let mut seen = HashSet::with_capacity(n);
    for part in &parts {
        assert!(part.len() <= target);
        for id in part.ids().unwrap() {
            assert!(seen.insert(id), "duplicate id {id}");
        }
    }
    assert_eq!(seen.len(), n);
    // 37 * 541 = 20,017: every partition but the last is full.
    assert!(parts[..p - 1].iter().all(|part| part.len() == target));
    assert_eq!(parts[p - 1].len(), n - target * (p - 1));
}

// ---------------------------------------------------------------------------
// 2. Large-scale hash-guided partitioning to disk
// ---------------------------------------------------------------------------

#[test]
fn stress_large_scale_hash_guided_on_disk() {
    let n = 10_000;
    let ds = make_dataset(n, 32, 2);
    let dir = tempfile::tempdir().unwrap();
    let factory = DiskPartitionFactory::new(dir.path()).unwrap().with_buffer_size(256);

    let partitioner = Partitioner::builder()
        .strategy(StrategyKind::HashGuided)
        .bucket_width(8.0)
        .num_projections(3)
        .seed(7)
        .enable_metrics()
        .build()
        .unwrap();
    let parts = partitioner.make_partitions(&ds, 2, 16, &factory).unwrap();

    let stats = PartitionStats::from_partitions(&parts);
    assert_eq!(stats.total_entries, n);
    assert_eq!(stats.max_size, n.div_ceil(16));

    let mut seen = HashSet::with_capacity(n);
    for part in &parts {
        let reopened = DiskBackedPartition::open(factory.path_for(part.index())).unwrap();
        for id in reopened.ids().unwrap() {
            assert!(seen.insert(id), "duplicate id {id}");
        }
    }
    assert_eq!(seen.len(), n);

    let m = partitioner.metrics().unwrap();
    assert_eq!(m.hash_evaluations, n as u64);
    assert_eq!(m.vectors_written, n as u64);
    assert_eq!(m.partitions_created, 16);
}

// ---------------------------------------------------------------------------
// 3. Concurrent independent runs over one shared dataset
//    8 threads partition the same dataset with their own seeds. Each result
//    must be complete, and equal seeds must agree.
// ---------------------------------------------------------------------------

#[test]
fn stress_concurrent_runs_shared_dataset() {
    let n = 3_000;
    let ds = Arc::new(make_dataset(n, 8, 3));
    let mut handles = Vec::new();

    for t in 0..8u64 {
        let ds = Arc::clone(&ds);
        handles.push(thread::spawn(move || {
            let kind = if t % 2 == 0 {
                StrategyKind::Random
            } else {
                StrategyKind::HashGuided
            };
            let partitioner = Partitioner::builder()
                .strategy(kind)
                .seed(t / 4)
                .build()
                .unwrap();
            let parts = partitioner
                .make_partitions(ds.as_ref(), 1, 9, &MemoryPartitionFactory)
                .unwrap();
            let ids: Vec<Vec<DbId>> = parts.iter().map(|p| p.ids().unwrap()).collect();
            (t, ids)
        }));
    }

    let results: Vec<(u64, Vec<Vec<DbId>>)> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    for (_, ids) in &results {
        let all: HashSet<DbId> = ids.iter().flatten().copied().collect();
        assert_eq!(all.len(), n);
        assert_eq!(ids.iter().map(Vec::len).sum::<usize>(), n);
    }

    // Same strategy kind and same seed.
    for (a, b) in [(0, 2), (1, 3), (4, 6), (5, 7)] {
        assert_eq!(results[a].1, results[b].1, "threads {a} and {b} disagree");
    }
}

// ---------------------------------------------------------------------------
// 4. Shared metrics across threads
// ---------------------------------------------------------------------------

#[test]
fn stress_shared_metrics_collector() {
    let metrics = Arc::new(MetricsCollector::new());
    let ds = Arc::new(make_dataset(1_000, 4, 4));
    let mut handles = Vec::new();

    for t in 0..4u64 {
        let ds = Arc::clone(&ds);
        let metrics = Arc::clone(&metrics);
        handles.push(thread::spawn(move || {
            RandomPartitioning::new(RandomFactory::seeded(t))
                .with_metrics(metrics)
                .make_partitions(ds.as_ref(), 1, 5, &MemoryPartitionFactory)
                .unwrap();
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let s = metrics.snapshot();
    assert_eq!(s.run_count, 4);
    assert_eq!(s.partitions_created, 20);
    assert_eq!(s.vectors_written, 4_000);
}

//! Basic usage of `lsh_partition`.
//!
//! Splits a clustered dataset into disk-backed partitions twice, once at
//! random and once guided by Euclidean LSH, then reopens the files and
//! compares how well each split keeps clusters together.
//!
//! Run with:
//!   cargo run --example basic_usage

use std::collections::HashSet;

use lsh_partition::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

const DIM: usize = 16;
const CLUSTERS: usize = 8;
const PER_CLUSTER: usize = 250;
const PARTITIONS: usize = 8;

/// Number of distinct clusters found in each partition file.
fn clusters_per_partition(factory: &DiskPartitionFactory) -> Vec<usize> {
    (0..PARTITIONS)
        .map(|index| {
            let part = DiskBackedPartition::open(factory.path_for(index)).expect("open failed");
            let clusters: HashSet<u64> = part
                .ids()
                .expect("read failed")
                .iter()
                .map(|id| id.0 / PER_CLUSTER as u64)
                .collect();
            clusters.len()
        })
        .collect()
}

fn main() {
    // ---------------------------------------------------------------
    // 1. Build a clustered dataset.
    // ---------------------------------------------------------------
    println!("=== Step 1: Build {CLUSTERS} clusters of {PER_CLUSTER} vectors ===");
    let mut rng = StdRng::seed_from_u64(123);
    let spread = Normal::new(0.0_f32, 100.0).unwrap();
    let noise = Normal::new(0.0_f32, 0.05).unwrap();

    let mut dataset = InMemoryDataSet::new(DIM).expect("dimension");
    let mut id = 0u64;
    for _ in 0..CLUSTERS {
        let center: Vec<f32> = (0..DIM).map(|_| spread.sample(&mut rng)).collect();
        for _ in 0..PER_CLUSTER {
            let v: Vec<f32> = center.iter().map(|c| c + noise.sample(&mut rng)).collect();
            dataset.insert(DbId(id), &v).expect("insert failed");
            id += 1;
        }
    }
    println!("Dataset: {} vectors, dim={}\n", dataset.size(), DIM);

    let dir = tempfile::tempdir().expect("tempdir");

    // ---------------------------------------------------------------
    // 2. Random split to disk.
    // ---------------------------------------------------------------
    println!("=== Step 2: Random split into {PARTITIONS} partitions ===");
    let random_factory = DiskPartitionFactory::new(dir.path().join("random")).expect("dir");
    let random = Partitioner::builder()
        .strategy(StrategyKind::Random)
        .seed(42)
        .build()
        .expect("failed to build partitioner");
    let parts = random
        .make_partitions(&dataset, 1, PARTITIONS, &random_factory)
        .expect("random split failed");
    println!("{}", PartitionStats::from_partitions(&parts));
    println!(
        "Clusters per partition: {:?}\n",
        clusters_per_partition(&random_factory)
    );

    // ---------------------------------------------------------------
    // 3. Hash-guided split to disk.
    // ---------------------------------------------------------------
    println!("=== Step 3: Hash-guided split into {PARTITIONS} partitions ===");
    let width = 4.0;
    let l = suggest_num_projections(width, 50.0, 0.01);
    println!(
        "Width {width}, l={l}: near pair (d=0.5) collides with p={:.3}, far pair (d=50) with p={:.5}",
        combined_collision_probability(0.5, width, l),
        combined_collision_probability(50.0, width, l)
    );

    let guided_factory = DiskPartitionFactory::new(dir.path().join("guided")).expect("dir");
    let guided = Partitioner::builder()
        .strategy(StrategyKind::HashGuided)
        .bucket_width(width)
        .num_projections(l)
        .seed(42)
        .enable_metrics()
        .build()
        .expect("failed to build partitioner");
    let parts = guided
        .make_partitions(&dataset, 1, PARTITIONS, &guided_factory)
        .expect("hash-guided split failed");
    println!("{}", PartitionStats::from_partitions(&parts));
    println!(
        "Clusters per partition: {:?}",
        clusters_per_partition(&guided_factory)
    );
    if let Some(m) = guided.metrics() {
        println!("Metrics: {m}\n");
    }

    // ---------------------------------------------------------------
    // 4. Save the configuration for the next run.
    // ---------------------------------------------------------------
    println!("=== Step 4: Save configuration ===");
    let config_path = dir.path().join("partitioner.json");
    guided.config().save_json(&config_path).expect("save failed");
    let loaded = PartitionerConfig::load_json(&config_path).expect("load failed");
    println!("Reloaded config: {loaded:?}");
}

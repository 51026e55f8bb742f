//! # lsh_partition
//!
//! Splits a vector dataset into disjoint partitions for distributed
//! similarity-search precomputation, optionally biased by 2-stable
//! locality-sensitive hashing so that near-duplicate points share a
//! partition.
//!
//! ## Quick start
//!
//! ```rust
//! use lsh_partition::{
//!     InMemoryDataSet, MemoryPartitionFactory, Partition, Partitioner, PartitioningStrategy,
//!     StrategyKind,
//! };
//!
//! let rows: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32, 0.0]).collect();
//! let dataset = InMemoryDataSet::from_vectors(2, &rows).unwrap();
//!
//! let partitioner = Partitioner::builder()
//!     .strategy(StrategyKind::Random)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let partitions = partitioner
//!     .make_partitions(&dataset, 1, 3, &MemoryPartitionFactory)
//!     .unwrap();
//! let sizes: Vec<usize> = partitions.iter().map(|p| p.len()).collect();
//! assert_eq!(sizes, vec![4, 4, 2]);
//! ```
//!
//! ## Feature flags
//!
//! | Flag          | Effect                                                  |
//! |---------------|---------------------------------------------------------|
//! | `persistence` | Disk-backed partitions, config/dataset files (default)  |
//! | `parallel`    | Parallel bucket-key computation via rayon               |
//! | `full`        | Enables `parallel` + `persistence`                      |

pub mod dataset;
pub mod distance;
pub mod error;
pub mod hash;
pub mod metrics;
pub mod partition;
pub mod partitioner;
pub mod partitioning;
pub mod projection;
pub mod random;
pub mod tuning;

#[cfg(feature = "persistence")]
pub mod persistence;

// Re-exports for convenience.
pub use dataset::{DataSet, DbId, InMemoryDataSet};
pub use distance::{DistanceKind, DistanceMetric, DistanceValue};
pub use error::{PartitionError, Result};
pub use hash::{
    BucketKey, CosineHashFunctionFamily, EuclideanHashFunction, EuclideanHashFunctionFamily,
    HashFunctionFamily, LocalitySensitiveHashFunction,
};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use partition::{MemoryPartition, MemoryPartitionFactory, Partition, PartitionFactory};
pub use partitioner::{
    HashFamilyKind, Partitioner, PartitionerBuilder, PartitionerConfig, ProjectionKind,
    StrategyKind,
};
pub use partitioning::{
    CandidatePool, HashGuidedPartitioning, PartitionStats, PartitioningStrategy,
    RandomPartitioning,
};
pub use projection::{
    AchlioptasRandomProjectionFamily, GaussianRandomProjectionFamily, Projection,
    RandomProjectionFamily,
};
pub use random::RandomFactory;
pub use tuning::{collision_probability, combined_collision_probability, suggest_num_projections};

#[cfg(feature = "persistence")]
pub use partition::{DiskBackedPartition, DiskPartitionFactory};

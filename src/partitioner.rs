use std::sync::Arc;

use crate::dataset::DataSet;
use crate::distance::DistanceMetric;
use crate::error::{PartitionError, Result};
use crate::hash::{CosineHashFunctionFamily, EuclideanHashFunctionFamily, HashFunctionFamily};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::partition::PartitionFactory;
use crate::partitioning::{HashGuidedPartitioning, PartitioningStrategy, RandomPartitioning};
use crate::projection::{
    AchlioptasRandomProjectionFamily, GaussianRandomProjectionFamily, RandomProjectionFamily,
};
use crate::random::RandomFactory;

/// Which candidate order a [`Partitioner`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum StrategyKind {
    /// Uniformly random, no locality bias.
    #[default]
    Random,
    /// Grouped by locality-sensitive bucket key.
    HashGuided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum HashFamilyKind {
    #[default]
    Euclidean,
    Cosine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum ProjectionKind {
    #[default]
    Gaussian,
    Achlioptas,
}

/// Configuration for a partitioning run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PartitionerConfig {
    pub strategy: StrategyKind,
    /// Optional RNG seed. With a seed every run produces the same partitions.
    pub seed: Option<u64>,
    /// Bucket width `w` of the Euclidean hash functions.
    pub bucket_width: f64,
    /// Number of hash functions `l` combined into one bucket key.
    pub num_projections: usize,
    pub hash_family: HashFamilyKind,
    pub projection: ProjectionKind,
    /// Metric the hash family must be locality-sensitive for.
    pub metric: DistanceMetric,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Random,
            seed: None,
            bucket_width: 4.0,
            num_projections: 4,
            hash_family: HashFamilyKind::Euclidean,
            projection: ProjectionKind::Gaussian,
            metric: DistanceMetric::Euclidean,
        }
    }
}

impl PartitionerConfig {
    fn random(&self) -> RandomFactory {
        RandomFactory::new(self.seed)
    }

    /// Build the hash family described by this configuration.
    pub fn hash_family(&self) -> Result<Arc<dyn HashFunctionFamily>> {
        let random = self.random();
        let projections: Arc<dyn RandomProjectionFamily> = match self.projection {
            ProjectionKind::Gaussian => Arc::new(GaussianRandomProjectionFamily::new(random)),
            ProjectionKind::Achlioptas => Arc::new(AchlioptasRandomProjectionFamily::new(random)),
        };
        let family: Arc<dyn HashFunctionFamily> = match self.hash_family {
            HashFamilyKind::Euclidean => Arc::new(EuclideanHashFunctionFamily::with_projections(
                random,
                projections,
                self.bucket_width,
                self.num_projections,
            )?),
            HashFamilyKind::Cosine => Arc::new(CosineHashFunctionFamily::with_projections(
                random,
                projections,
                self.num_projections,
            )?),
        };
        if !family.is_compatible(self.metric) {
            return Err(PartitionError::IncompatibleMetric {
                family: family.name(),
                metric: self.metric,
            });
        }
        Ok(family)
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    Random(RandomPartitioning),
    HashGuided(HashGuidedPartitioning),
}

/// Splits datasets with the strategy selected by its [`PartitionerConfig`].
#[derive(Debug, Clone)]
pub struct Partitioner {
    strategy: Strategy,
    config: PartitionerConfig,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Partitioner {
    /// Start building a partitioner with the builder pattern.
    pub fn builder() -> PartitionerBuilder {
        PartitionerBuilder::new()
    }

    /// Create a partitioner directly from a [`PartitionerConfig`].
    pub fn new(config: PartitionerConfig) -> Result<Self> {
        Self::new_with_metrics(config, false)
    }

    fn new_with_metrics(config: PartitionerConfig, enable_metrics: bool) -> Result<Self> {
        let metrics = enable_metrics.then(|| Arc::new(MetricsCollector::new()));

        let strategy = match config.strategy {
            StrategyKind::Random => {
                let mut s = RandomPartitioning::new(config.random());
                if let Some(m) = &metrics {
                    s = s.with_metrics(Arc::clone(m));
                }
                Strategy::Random(s)
            }
            StrategyKind::HashGuided => {
                let mut s = HashGuidedPartitioning::new(config.hash_family()?);
                if let Some(m) = &metrics {
                    s = s.with_metrics(Arc::clone(m));
                }
                Strategy::HashGuided(s)
            }
        };

        Ok(Self {
            strategy,
            config,
            metrics,
        })
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.config.strategy
    }

    /// Return a clone of the current configuration.
    pub fn config(&self) -> PartitionerConfig {
        self.config.clone()
    }

    /// Snapshot of runtime metrics (`None` if metrics were not enabled).
    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(|m| m.snapshot())
    }

    /// Reset metrics counters.
    pub fn reset_metrics(&self) {
        if let Some(ref m) = self.metrics {
            m.reset();
        }
    }
}

impl PartitioningStrategy for Partitioner {
    fn make_partitions<F: PartitionFactory>(
        &self,
        dataset: &dyn DataSet,
        package_quantity: usize,
        partition_quantity: usize,
        factory: &F,
    ) -> Result<Vec<F::Partition>> {
        match &self.strategy {
            Strategy::Random(s) => {
                s.make_partitions(dataset, package_quantity, partition_quantity, factory)
            }
            Strategy::HashGuided(s) => {
                s.make_partitions(dataset, package_quantity, partition_quantity, factory)
            }
        }
    }
}

/// Fluent builder for [`Partitioner`].
#[derive(Default)]
pub struct PartitionerBuilder {
    config: PartitionerConfig,
    enable_metrics: bool,
}

impl PartitionerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn bucket_width(mut self, width: f64) -> Self {
        self.config.bucket_width = width;
        self
    }

    pub fn num_projections(mut self, l: usize) -> Self {
        self.config.num_projections = l;
        self
    }

    pub fn hash_family(mut self, family: HashFamilyKind) -> Self {
        self.config.hash_family = family;
        self
    }

    pub fn projection(mut self, projection: ProjectionKind) -> Self {
        self.config.projection = projection;
        self
    }

    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.config.metric = metric;
        self
    }

    pub fn enable_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }

    /// Build the partitioner, returning an error on invalid configuration.
    pub fn build(self) -> Result<Partitioner> {
        Partitioner::new_with_metrics(self.config, self.enable_metrics)
    }
}

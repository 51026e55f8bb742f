use std::sync::Arc;

use super::{entries_per_partition, fill_partitions, validate, CandidatePool, PartitioningStrategy};
use crate::dataset::DataSet;
use crate::error::{PartitionError, Result};
use crate::metrics::{MetricsCollector, RunTimer};
use crate::partition::PartitionFactory;
use crate::random::RandomFactory;

/// Divides the data into random partitions of (near-)equal size.
///
/// Each partition is filled by repeatedly removing a uniformly chosen
/// identifier from the remaining pool. With a seeded [`RandomFactory`] the
/// split is identical on every run.
#[derive(Debug, Clone, Default)]
pub struct RandomPartitioning {
    random: RandomFactory,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RandomPartitioning {
    pub fn new(random: RandomFactory) -> Self {
        Self {
            random,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn run<F: PartitionFactory>(
        &self,
        dataset: &dyn DataSet,
        partition_quantity: usize,
        factory: &F,
    ) -> Result<Vec<F::Partition>> {
        let per_partition = entries_per_partition(dataset.size(), partition_quantity);
        log::debug!("each random partition will contain about {per_partition} items");

        let mut rng = self.random.rng();
        let mut candidates: CandidatePool = dataset.ids().collect();
        fill_partitions(
            dataset,
            partition_quantity,
            per_partition,
            factory,
            self.metrics.as_deref(),
            || candidates.take_random(&mut rng),
        )
    }
}

impl PartitioningStrategy for RandomPartitioning {
    fn make_partitions<F: PartitionFactory>(
        &self,
        dataset: &dyn DataSet,
        package_quantity: usize,
        partition_quantity: usize,
        factory: &F,
    ) -> Result<Vec<F::Partition>> {
        validate(dataset, package_quantity, partition_quantity)?;
        log::info!(
            "random partitioning of {} vectors into {} partitions ({} packages)",
            dataset.size(),
            partition_quantity,
            package_quantity
        );
        let timer = self.metrics.as_ref().map(|_| RunTimer::new());
        let partitions = self
            .run(dataset, partition_quantity, factory)
            .map_err(PartitionError::into_compliance)?;
        if let (Some(m), Some(t)) = (&self.metrics, timer) {
            m.record_run(t.elapsed_ns());
        }
        Ok(partitions)
    }
}

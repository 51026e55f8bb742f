use std::collections::BTreeMap;
use std::sync::Arc;

use super::{entries_per_partition, fill_partitions, validate, PartitioningStrategy};
use crate::dataset::{DataSet, DbId};
use crate::error::{PartitionError, Result};
use crate::hash::{BucketKey, HashFunctionFamily, LocalitySensitiveHashFunction};
use crate::metrics::{MetricsCollector, RunTimer};
use crate::partition::PartitionFactory;

/// Places points that share a bucket key next to each other.
///
/// Every point is hashed with one function drawn from the family; points
/// are then grouped by key and handed out in key order (ties by id), so a
/// bucket is only split when it straddles a partition boundary. Partition
/// sizes follow the same target as [`super::RandomPartitioning`].
#[derive(Debug, Clone)]
pub struct HashGuidedPartitioning {
    family: Arc<dyn HashFunctionFamily>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HashGuidedPartitioning {
    pub fn new(family: Arc<dyn HashFunctionFamily>) -> Self {
        Self {
            family,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn family(&self) -> &dyn HashFunctionFamily {
        self.family.as_ref()
    }

    /// Group every identifier of `dataset` by its bucket key.
    pub fn buckets(&self, dataset: &dyn DataSet) -> Result<BTreeMap<BucketKey, Vec<DbId>>> {
        let hash_fn = self
            .family
            .generate_hash_function(dataset.dimensionality())?;
        let ids: Vec<DbId> = dataset.ids().collect();
        let keyed = compute_keys(dataset, hash_fn.as_ref(), &ids, self.metrics.as_deref())?;

        let mut buckets: BTreeMap<BucketKey, Vec<DbId>> = BTreeMap::new();
        for (key, id) in keyed {
            buckets.entry(key).or_default().push(id);
        }
        for members in buckets.values_mut() {
            members.sort_unstable();
        }
        Ok(buckets)
    }

    fn run<F: PartitionFactory>(
        &self,
        dataset: &dyn DataSet,
        partition_quantity: usize,
        factory: &F,
    ) -> Result<Vec<F::Partition>> {
        let per_partition = entries_per_partition(dataset.size(), partition_quantity);
        let buckets = self.buckets(dataset)?;
        log::debug!(
            "{} buckets over {} points, largest bucket holds {}, {} items per partition",
            buckets.len(),
            dataset.size(),
            buckets.values().map(Vec::len).max().unwrap_or(0),
            per_partition
        );

        let mut order = buckets.into_values().flatten();
        fill_partitions(
            dataset,
            partition_quantity,
            per_partition,
            factory,
            self.metrics.as_deref(),
            || order.next(),
        )
    }
}

#[cfg(not(feature = "parallel"))]
fn compute_keys(
    dataset: &dyn DataSet,
    hash_fn: &dyn LocalitySensitiveHashFunction,
    ids: &[DbId],
    metrics: Option<&MetricsCollector>,
) -> Result<Vec<(BucketKey, DbId)>> {
    ids.iter()
        .map(|&id| hash_one(dataset, hash_fn, id, metrics))
        .collect()
}

#[cfg(feature = "parallel")]
fn compute_keys(
    dataset: &dyn DataSet,
    hash_fn: &dyn LocalitySensitiveHashFunction,
    ids: &[DbId],
    metrics: Option<&MetricsCollector>,
) -> Result<Vec<(BucketKey, DbId)>> {
    use rayon::prelude::*;

    ids.par_iter()
        .map(|&id| hash_one(dataset, hash_fn, id, metrics))
        .collect()
}

fn hash_one(
    dataset: &dyn DataSet,
    hash_fn: &dyn LocalitySensitiveHashFunction,
    id: DbId,
    metrics: Option<&MetricsCollector>,
) -> Result<(BucketKey, DbId)> {
    let vector = dataset.vector(id)?;
    let key = hash_fn.hash(&vector.view())?;
    if let Some(m) = metrics {
        m.record_read();
        m.record_hash();
    }
    Ok((key, id))
}

impl PartitioningStrategy for HashGuidedPartitioning {
    fn make_partitions<F: PartitionFactory>(
        &self,
        dataset: &dyn DataSet,
        package_quantity: usize,
        partition_quantity: usize,
        factory: &F,
    ) -> Result<Vec<F::Partition>> {
        validate(dataset, package_quantity, partition_quantity)?;
        log::info!(
            "{}-hash partitioning of {} vectors into {} partitions ({} packages)",
            self.family.name(),
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

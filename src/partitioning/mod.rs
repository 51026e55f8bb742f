//! Splitting a dataset into disjoint partitions.
//!
//! Every strategy shares the same contract: `partition_quantity` partitions
//! indexed `0..partition_quantity`, each holding at most
//! `ceil(size / partition_quantity)` entries, every identifier in exactly
//! one partition. Only the order in which candidates are drawn differs.

mod hash_guided;
mod pool;
mod random;

pub use hash_guided::HashGuidedPartitioning;
pub use pool::CandidatePool;
pub use random::RandomPartitioning;

use crate::dataset::{DataSet, DbId};
use crate::error::{PartitionError, Result};
use crate::metrics::MetricsCollector;
use crate::partition::{Partition, PartitionFactory};

/// A way of splitting a dataset into partitions.
pub trait PartitioningStrategy {
    /// Split `dataset` into `partition_quantity` partitions created by
    /// `factory`. Every returned partition is closed.
    ///
    /// `package_quantity` is a hint for downstream packaging and does not
    /// influence partition sizes. Invalid arguments are rejected up front;
    /// any failure during the pass surfaces as
    /// [`PartitionError::UnableToComply`].
    fn make_partitions<F: PartitionFactory>(
        &self,
        dataset: &dyn DataSet,
        package_quantity: usize,
        partition_quantity: usize,
        factory: &F,
    ) -> Result<Vec<F::Partition>>;
}

/// Target number of entries per partition.
pub fn entries_per_partition(size: usize, partition_quantity: usize) -> usize {
    size.div_ceil(partition_quantity)
}

pub(crate) fn validate(
    dataset: &dyn DataSet,
    package_quantity: usize,
    partition_quantity: usize,
) -> Result<()> {
    if partition_quantity == 0 {
        return Err(PartitionError::InvalidConfig(
            "partition quantity must be at least 1".into(),
        ));
    }
    if package_quantity == 0 {
        return Err(PartitionError::InvalidConfig(
            "package quantity must be at least 1".into(),
        ));
    }
    if dataset.dimensionality() == 0 {
        return Err(PartitionError::ZeroDimension);
    }
    Ok(())
}

/// Create partitions `0..partition_quantity` and fill each with up to
/// `per_partition` candidates drawn from `next`.
///
/// Either every partition is filled and closed, or every partition created so
/// far is discarded and the error returned.
pub(crate) fn fill_partitions<F, N>(
    dataset: &dyn DataSet,
    partition_quantity: usize,
    per_partition: usize,
    factory: &F,
    metrics: Option<&MetricsCollector>,
    next: N,
) -> Result<Vec<F::Partition>>
where
    F: PartitionFactory,
    N: FnMut() -> Option<DbId>,
{
    let mut partitions = Vec::with_capacity(partition_quantity);
    let filled = fill_into(
        &mut partitions,
        dataset,
        partition_quantity,
        per_partition,
        factory,
        metrics,
        next,
    );
    if let Err(err) = filled {
        log::debug!(
            "run failed, discarding {} partitions: {}",
            partitions.len(),
            err
        );
        for partition in partitions.iter_mut() {
            if let Err(e) = partition.discard() {
                log::warn!("partition {} not discarded: {}", partition.index(), e);
            }
        }
        return Err(err);
    }
    Ok(partitions)
}

fn fill_into<F, N>(
    partitions: &mut Vec<F::Partition>,
    dataset: &dyn DataSet,
    partition_quantity: usize,
    per_partition: usize,
    factory: &F,
    metrics: Option<&MetricsCollector>,
    mut next: N,
) -> Result<()>
where
    F: PartitionFactory,
    N: FnMut() -> Option<DbId>,
{
    let dim = dataset.dimensionality();
    let mut written = 0usize;

    for index in 0..partition_quantity {
        partitions.push(factory.create(index, dim)?);
        if let Some(m) = metrics {
            m.record_partition();
        }
        let partition = &mut partitions[index];
        for _ in 0..per_partition {
            let Some(id) = next() else { break };
            let vector = dataset.vector(id)?;
            if let Some(m) = metrics {
                m.record_read();
            }
            partition.add_vector(id, vector.view())?;
            if let Some(m) = metrics {
                m.record_write();
            }
            written += 1;
        }
        partition.close()?;
    }

    // Only reachable when the dataset under-reports its size.
    if next().is_some() {
        let leftover = 1 + std::iter::from_fn(&mut next).count();
        return Err(PartitionError::InconsistentDataSet {
            reported: dataset.size(),
            actual: written + leftover,
        });
    }
    Ok(())
}

/// Summary of one partitioning result.
#[derive(Debug, Clone)]
pub struct PartitionStats {
    pub num_partitions: usize,
    pub total_entries: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub avg_size: f64,
    pub sizes: Vec<usize>,
}

impl PartitionStats {
    pub fn from_partitions<P: Partition>(partitions: &[P]) -> Self {
        let sizes: Vec<usize> = partitions.iter().map(|p| p.len()).collect();
        let total_entries = sizes.iter().sum();
        Self {
            num_partitions: sizes.len(),
            total_entries,
            min_size: sizes.iter().copied().min().unwrap_or(0),
            max_size: sizes.iter().copied().max().unwrap_or(0),
            avg_size: if sizes.is_empty() {
                0.0
            } else {
                total_entries as f64 / sizes.len() as f64
            },
            sizes,
        }
    }
}

impl std::fmt::Display for PartitionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Partitions {{ count: {}, entries: {}, min: {}, max: {}, avg: {:.1} }}",
            self.num_partitions, self.total_entries, self.min_size, self.max_size, self.avg_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataSet;
    use crate::partition::{MemoryPartition, MemoryPartitionFactory};
    use ndarray::Array1;

    /// Claims fewer records than it yields.
    struct Underreporting(InMemoryDataSet);

    impl DataSet for Underreporting {
        fn size(&self) -> usize {
            self.0.size() - 2
        }
        fn dimensionality(&self) -> usize {
            self.0.dimensionality()
        }
        fn ids(&self) -> Box<dyn Iterator<Item = DbId> + '_> {
            self.0.ids()
        }
        fn vector(&self, id: DbId) -> Result<Array1<f32>> {
            self.0.vector(id)
        }
    }

    fn dataset(n: usize) -> InMemoryDataSet {
        let rows: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, 0.0]).collect();
        InMemoryDataSet::from_vectors(2, &rows).unwrap()
    }

    #[test]
    fn test_entries_per_partition() {
        assert_eq!(entries_per_partition(10, 3), 4);
        assert_eq!(entries_per_partition(9, 3), 3);
        assert_eq!(entries_per_partition(3, 5), 1);
        assert_eq!(entries_per_partition(0, 4), 0);
    }

    #[test]
    fn test_validate() {
        let ds = dataset(3);
        assert!(validate(&ds, 1, 1).is_ok());
        assert!(matches!(
            validate(&ds, 1, 0),
            Err(PartitionError::InvalidConfig(_))
        ));
        assert!(matches!(
            validate(&ds, 0, 1),
            Err(PartitionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_fill_in_order() {
        let ds = dataset(5);
        let mut ids = ds.ids().collect::<Vec<_>>().into_iter();
        let parts = fill_partitions(&ds, 2, 3, &MemoryPartitionFactory, None, || ids.next()).unwrap();
        assert_eq!(parts[0].ids().unwrap(), vec![DbId(0), DbId(1), DbId(2)]);
        assert_eq!(parts[1].ids().unwrap(), vec![DbId(3), DbId(4)]);
        assert!(parts.iter().all(|p| p.is_closed()));
    }

    #[test]
    fn test_fill_detects_leftovers() {
        let ds = Underreporting(dataset(6));
        let mut ids = ds.ids().collect::<Vec<_>>().into_iter();
        let per = entries_per_partition(ds.size(), 2);
        let err = fill_partitions(&ds, 2, per, &MemoryPartitionFactory, None, || ids.next())
            .unwrap_err();
        assert!(matches!(
            err,
            PartitionError::InconsistentDataSet {
                reported: 4,
                actual: 6
            }
        ));
    }

    #[cfg(feature = "persistence")]
    #[test]
    fn test_failed_fill_leaves_no_files() {
        use crate::partition::{DiskBackedPartition, DiskPartitionFactory};

        let dir = tempfile::tempdir().unwrap();
        let factory = DiskPartitionFactory::new(dir.path()).unwrap();
        let ds = Underreporting(dataset(6));
        let mut ids = ds.ids().collect::<Vec<_>>().into_iter();
        let per = entries_per_partition(ds.size(), 2);

        let err = fill_partitions(&ds, 2, per, &factory, None, || ids.next()).unwrap_err();
        assert!(matches!(err, PartitionError::InconsistentDataSet { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(DiskBackedPartition::open(factory.path_for(0)).is_err());
    }

    #[test]
    fn test_stats() {
        let mut a = MemoryPartition::new(0, 1);
        let b = MemoryPartition::new(1, 1);
        a.add_vector(DbId(0), Array1::from_vec(vec![1.0]).view()).unwrap();
        a.add_vector(DbId(1), Array1::from_vec(vec![2.0]).view()).unwrap();
        let stats = PartitionStats::from_partitions(&[a, b]);
        assert_eq!(stats.sizes, vec![2, 0]);
        assert_eq!(stats.min_size, 0);
        assert_eq!(stats.max_size, 2);
        assert!((stats.avg_size - 1.0).abs() < 1e-12);
        assert_eq!(
            stats.to_string(),
            "Partitions { count: 2, entries: 2, min: 0, max: 2, avg: 1.0 }"
        );
    }
}

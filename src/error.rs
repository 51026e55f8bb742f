use thiserror::Error;

use crate::dataset::DbId;

/// Errors that can occur while hashing or partitioning a dataset.
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("bucket width must be finite and greater than 0, got {0}")]
    InvalidWidth(f64),

    #[error("number of combined hash functions must be at least 1, got {0}")]
    InvalidCombination(usize),

    #[error("dimension must be greater than 0")]
    ZeroDimension,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("hash family `{family}` is not locality-sensitive for the {metric:?} metric")]
    IncompatibleMetric {
        family: &'static str,
        metric: crate::distance::DistanceMetric,
    },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("vector not found: id={0}")]
    NotFound(DbId),

    #[error("partition {0} is closed for writing")]
    PartitionClosed(usize),

    #[error("partition {0} lost records in a failed write and cannot be finalized")]
    PartitionPoisoned(usize),

    #[cfg(feature = "persistence")]
    #[error("partition file {} was never finalized", .0.display())]
    Unfinalized(std::path::PathBuf),

    #[error("dataset reports {reported} entries but yields {actual} identifiers")]
    InconsistentDataSet { reported: usize, actual: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "persistence")]
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Umbrella for anything that went wrong during a partitioning pass.
    #[error("unable to comply: {0}")]
    UnableToComply(#[source] Box<PartitionError>),
}

impl PartitionError {
    /// Wrap `self` as a compliance failure. An error that already is one is
    /// returned unchanged so the original cause stays one level deep.
    pub fn into_compliance(self) -> Self {
        match self {
            err @ PartitionError::UnableToComply(_) => err,
            other => PartitionError::UnableToComply(Box::new(other)),
        }
    }

    /// True for errors raised while validating parameters.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PartitionError::InvalidWidth(_)
                | PartitionError::InvalidCombination(_)
                | PartitionError::ZeroDimension
                | PartitionError::InvalidConfig(_)
                | PartitionError::IncompatibleMetric { .. }
        )
    }
}

/// A specialized Result type for partitioning operations.
pub type Result<T> = std::result::Result<T, PartitionError>;

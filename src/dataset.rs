use std::fmt;

use hashbrown::HashMap;
use ndarray::{Array1, ArrayView1};

use crate::error::{PartitionError, Result};

/// Opaque, totally ordered handle for one dataset record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct DbId(pub u64);

impl fmt::Display for DbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DbId {
    fn from(id: u64) -> Self {
        DbId(id)
    }
}

/// Read-only view of a vector dataset.
pub trait DataSet: Sync {
    /// Number of records.
    fn size(&self) -> usize;

    fn dimensionality(&self) -> usize;

    /// Every identifier exactly once.
    fn ids(&self) -> Box<dyn Iterator<Item = DbId> + '_>;

    /// The vector stored under `id`. May perform I/O.
    fn vector(&self, id: DbId) -> Result<Array1<f32>>;
}

/// A dataset held entirely in memory.
///
/// Identifiers iterate in insertion order.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct InMemoryDataSet {
    pub(crate) dim: usize,
    pub(crate) order: Vec<DbId>,
    pub(crate) vectors: HashMap<DbId, Array1<f32>>,
}

impl InMemoryDataSet {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(PartitionError::ZeroDimension);
        }
        Ok(Self {
            dim,
            order: Vec::new(),
            vectors: HashMap::new(),
        })
    }

    /// Build a dataset where row `i` gets identifier `i`.
    pub fn from_vectors<V: AsRef<[f32]>>(dim: usize, rows: &[V]) -> Result<Self> {
        let mut ds = Self::new(dim)?;
        for (i, row) in rows.iter().enumerate() {
            ds.insert(DbId(i as u64), row.as_ref())?;
        }
        Ok(ds)
    }

    /// Insert a vector under `id`. An existing vector with the same id is
    /// replaced and keeps its position.
    pub fn insert(&mut self, id: DbId, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(PartitionError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        if self
            .vectors
            .insert(id, Array1::from_vec(vector.to_vec()))
            .is_none()
        {
            self.order.push(id);
        }
        Ok(())
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.vectors.contains_key(&id)
    }

    /// Borrow a stored vector without copying it.
    pub fn get(&self, id: DbId) -> Option<ArrayView1<'_, f32>> {
        self.vectors.get(&id).map(|v| v.view())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl DataSet for InMemoryDataSet {
    fn size(&self) -> usize {
        self.order.len()
    }

    fn dimensionality(&self) -> usize {
        self.dim
    }

    fn ids(&self) -> Box<dyn Iterator<Item = DbId> + '_> {
        Box::new(self.order.iter().copied())
    }

    fn vector(&self, id: DbId) -> Result<Array1<f32>> {
        self.vectors
            .get(&id)
            .cloned()
            .ok_or(PartitionError::NotFound(id))
    }
}

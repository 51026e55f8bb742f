//! Save and load configurations and datasets to/from disk.
//!
//! Requires the `persistence` feature flag.

use std::path::Path;

use hashbrown::HashSet;

use crate::dataset::{DbId, InMemoryDataSet};
use crate::error::{PartitionError, Result};
use crate::partitioner::PartitionerConfig;

impl PartitionerConfig {
    /// Serialize the configuration to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PartitionError::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Deserialize a configuration from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| PartitionError::Serialization(e.to_string()))
    }
}

impl InMemoryDataSet {
    /// Serialize the dataset to a compact bincode file.
    pub fn save_bincode(&self, path: &Path) -> Result<()> {
        let bytes =
            bincode::serialize(self).map_err(|e| PartitionError::Serialization(e.to_string()))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Deserialize a dataset from a bincode file.
    pub fn load_bincode(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let ds: InMemoryDataSet = bincode::deserialize(&data)
            .map_err(|e| PartitionError::Serialization(e.to_string()))?;
        if ds.dim == 0 {
            return Err(PartitionError::ZeroDimension);
        }
        // `order` must list every stored vector exactly once.
        let listed: HashSet<DbId> = ds
            .order
            .iter()
            .copied()
            .filter(|id| ds.vectors.contains_key(id))
            .collect();
        if ds.order.len() != ds.vectors.len() || listed.len() != ds.order.len() {
            return Err(PartitionError::InconsistentDataSet {
                reported: ds.order.len(),
                actual: listed.len(),
            });
        }
        Ok(ds)
    }
}

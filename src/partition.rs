//! Containers that receive the output of a partitioning run.
//!
//! A partition accepts `(id, vector)` pairs until it is closed. Nothing is
//! dropped silently: a write to a closed partition or with the wrong
//! dimensionality is an error.

use ndarray::{Array1, ArrayView1};

use crate::dataset::DbId;
use crate::error::{PartitionError, Result};

/// A growable container of `(id, vector)` pairs.
pub trait Partition {
    /// Position of this partition in the output of its run.
    fn index(&self) -> usize;

    fn dimensionality(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one pair. May perform I/O.
    fn add_vector(&mut self, id: DbId, vector: ArrayView1<'_, f32>) -> Result<()>;

    /// Finalize the partition. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Abandon the partition and release what it stored. Used on every
    /// partition of a run that failed; a discarded partition is closed and
    /// empty.
    fn discard(&mut self) -> Result<()>;

    /// All pairs in insertion order.
    fn entries(&self) -> Result<Vec<(DbId, Array1<f32>)>>;

    fn ids(&self) -> Result<Vec<DbId>> {
        Ok(self.entries()?.into_iter().map(|(id, _)| id).collect())
    }
}

/// Creates empty partitions for a run.
pub trait PartitionFactory {
    type Partition: Partition;

    fn create(&self, index: usize, dimensionality: usize) -> Result<Self::Partition>;
}

fn check_write(index: usize, closed: bool, dim: usize, got: usize) -> Result<()> {
    if closed {
        return Err(PartitionError::PartitionClosed(index));
    }
    if got != dim {
        return Err(PartitionError::DimensionMismatch { expected: dim, got });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MemoryPartition {
    index: usize,
    dim: usize,
    entries: Vec<(DbId, Array1<f32>)>,
    closed: bool,
}

impl MemoryPartition {
    pub fn new(index: usize, dim: usize) -> Self {
        Self {
            index,
            dim,
            entries: Vec::new(),
            closed: false,
        }
    }

    /// Borrow the stored pairs.
    pub fn as_slice(&self) -> &[(DbId, Array1<f32>)] {
        &self.entries
    }
}

impl Partition for MemoryPartition {
    fn index(&self) -> usize {
        self.index
    }

    fn dimensionality(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn add_vector(&mut self, id: DbId, vector: ArrayView1<'_, f32>) -> Result<()> {
        check_write(self.index, self.closed, self.dim, vector.len())?;
        self.entries.push((id, vector.to_owned()));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn discard(&mut self) -> Result<()> {
        self.entries.clear();
        self.closed = true;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(DbId, Array1<f32>)>> {
        Ok(self.entries.clone())
    }

    fn ids(&self) -> Result<Vec<DbId>> {
        Ok(self.entries.iter().map(|(id, _)| *id).collect())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryPartitionFactory;

impl PartitionFactory for MemoryPartitionFactory {
    type Partition = MemoryPartition;

    fn create(&self, index: usize, dimensionality: usize) -> Result<MemoryPartition> {
        if dimensionality == 0 {
            return Err(PartitionError::ZeroDimension);
        }
        Ok(MemoryPartition::new(index, dimensionality))
    }
}

// ---------------------------------------------------------------------------
// Disk-backed (behind `persistence` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "persistence")]
pub use disk::{DiskBackedPartition, DiskPartitionFactory, DEFAULT_BUFFER_SIZE};

#[cfg(feature = "persistence")]
mod disk {
    use std::fs::{self, File};
    use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
    use std::path::{Path, PathBuf};

    use ndarray::{Array1, ArrayView1};
    use serde::{Deserialize, Serialize};

    use super::{check_write, Partition, PartitionFactory};
    use crate::dataset::DbId;
    use crate::error::{PartitionError, Result};

    /// Entries held in memory before they are written out.
    pub const DEFAULT_BUFFER_SIZE: usize = 1024;

    /// Header length of a partition that has not been closed. `open` refuses
    /// such files.
    const UNFINALIZED: u64 = u64::MAX;

    /// Fixed-size file header, rewritten with the final length on close.
    #[derive(Debug, Serialize, Deserialize)]
    struct Header {
        index: u64,
        dimensionality: u64,
        len: u64,
    }

    #[derive(Serialize)]
    struct RecordRef<'a> {
        id: DbId,
        vector: &'a [f32],
    }

    #[derive(Deserialize)]
    struct Record {
        id: DbId,
        vector: Vec<f32>,
    }

    fn serialization(e: bincode::Error) -> PartitionError {
        PartitionError::Serialization(e.to_string())
    }

    fn write_records(
        writer: &mut BufWriter<File>,
        records: &[(DbId, Vec<f32>)],
    ) -> Result<()> {
        for (id, vector) in records {
            let record = RecordRef { id: *id, vector };
            bincode::serialize_into(&mut *writer, &record).map_err(serialization)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// A partition stored in one file: a bincode header followed by bincode
    /// records. Appends are buffered and written in batches.
    ///
    /// The header carries the entry count only once the partition is closed.
    /// A partition that is dropped without `close`, or whose writes failed,
    /// leaves a file that [`open`](Self::open) rejects.
    #[derive(Debug)]
    pub struct DiskBackedPartition {
        index: usize,
        dim: usize,
        path: PathBuf,
        writer: Option<BufWriter<File>>,
        buffer: Vec<(DbId, Vec<f32>)>,
        buffer_size: usize,
        /// Accepted entries: written plus buffered.
        len: usize,
        poisoned: bool,
        discarded: bool,
    }

    impl DiskBackedPartition {
        /// Create (or truncate) the file at `path`.
        pub fn create(
            path: impl Into<PathBuf>,
            index: usize,
            dim: usize,
            buffer_size: usize,
        ) -> Result<Self> {
            if dim == 0 {
                return Err(PartitionError::ZeroDimension);
            }
            let path = path.into();
            let mut writer = BufWriter::new(File::create(&path)?);
            let header = Header {
                index: index as u64,
                dimensionality: dim as u64,
                len: UNFINALIZED,
            };
            bincode::serialize_into(&mut writer, &header).map_err(serialization)?;
            Ok(Self {
                index,
                dim,
                path,
                writer: Some(writer),
                buffer: Vec::with_capacity(buffer_size.max(1)),
                buffer_size: buffer_size.max(1),
                len: 0,
                poisoned: false,
                discarded: false,
            })
        }

        /// Reopen a finalized partition for reading.
        pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
            let path = path.into();
            let mut reader = BufReader::new(File::open(&path)?);
            let header: Header =
                bincode::deserialize_from(&mut reader).map_err(serialization)?;
            if header.len == UNFINALIZED {
                return Err(PartitionError::Unfinalized(path));
            }
            Ok(Self {
                index: header.index as usize,
                dim: header.dimensionality as usize,
                path,
                writer: None,
                buffer: Vec::new(),
                buffer_size: DEFAULT_BUFFER_SIZE,
                len: header.len as usize,
                poisoned: false,
                discarded: false,
            })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Write out the buffer. The buffer is only cleared once the whole
        /// batch reached the file; any failure poisons the partition, since
        /// part of the batch may already be on disk.
        fn flush_buffer(&mut self) -> Result<()> {
            if self.poisoned {
                return Err(PartitionError::PartitionPoisoned(self.index));
            }
            let writer = self
                .writer
                .as_mut()
                .ok_or(PartitionError::PartitionClosed(self.index))?;
            if let Err(e) = write_records(writer, &self.buffer) {
                self.poisoned = true;
                log::warn!("partition {}: write failed: {}", self.index, e);
                return Err(e);
            }
            log::trace!(
                "partition {}: flushed {} entries",
                self.index,
                self.buffer.len()
            );
            self.buffer.clear();
            Ok(())
        }
    }

    impl Partition for DiskBackedPartition {
        fn index(&self) -> usize {
            self.index
        }

        fn dimensionality(&self) -> usize {
            self.dim
        }

        fn len(&self) -> usize {
            self.len
        }

        fn add_vector(&mut self, id: DbId, vector: ArrayView1<'_, f32>) -> Result<()> {
            check_write(self.index, self.writer.is_none(), self.dim, vector.len())?;
            if self.poisoned {
                return Err(PartitionError::PartitionPoisoned(self.index));
            }
            self.buffer.push((id, vector.to_vec()));
            if self.buffer.len() >= self.buffer_size {
                if let Err(e) = self.flush_buffer() {
                    // The call failed, so this record was never accepted.
                    self.buffer.pop();
                    return Err(e);
                }
            }
            self.len += 1;
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            if self.writer.is_none() {
                return Ok(());
            }
            if self.poisoned {
                return Err(PartitionError::PartitionPoisoned(self.index));
            }
            self.flush_buffer()?;
            let Some(writer) = self.writer.take() else {
                return Ok(());
            };
            let mut file = writer.into_inner().map_err(|e| e.into_error())?;
            file.seek(SeekFrom::Start(0))?;
            let header = Header {
                index: self.index as u64,
                dimensionality: self.dim as u64,
                len: self.len as u64,
            };
            bincode::serialize_into(&mut file, &header).map_err(serialization)?;
            file.sync_all()?;
            log::debug!(
                "partition {} closed with {} entries at {}",
                self.index,
                self.len,
                self.path.display()
            );
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.writer.is_none()
        }

        fn discard(&mut self) -> Result<()> {
            if self.discarded {
                return Ok(());
            }
            // Dropping the writer may still push buffered bytes; the file is
            // removed right after.
            drop(self.writer.take());
            self.buffer.clear();
            self.len = 0;
            self.discarded = true;
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            log::debug!(
                "partition {} discarded, removed {}",
                self.index,
                self.path.display()
            );
            Ok(())
        }

        fn entries(&self) -> Result<Vec<(DbId, Array1<f32>)>> {
            if self.discarded {
                return Ok(Vec::new());
            }
            if self.poisoned {
                return Err(PartitionError::PartitionPoisoned(self.index));
            }
            let on_disk = self.len - self.buffer.len();
            let mut out = Vec::with_capacity(self.len);
            // Nothing has reached the file before the first flush.
            if on_disk > 0 {
                let mut reader = BufReader::new(File::open(&self.path)?);
                let _: Header =
                    bincode::deserialize_from(&mut reader).map_err(serialization)?;
                for _ in 0..on_disk {
                    let record: Record =
                        bincode::deserialize_from(&mut reader).map_err(serialization)?;
                    out.push((record.id, Array1::from_vec(record.vector)));
                }
            }
            out.extend(
                self.buffer
                    .iter()
                    .map(|(id, v)| (*id, Array1::from_vec(v.clone()))),
            );
            Ok(out)
        }
    }

    impl Drop for DiskBackedPartition {
        fn drop(&mut self) {
            if self.writer.is_some() {
                log::warn!(
                    "partition {} dropped before close, {} left unfinalized",
                    self.index,
                    self.path.display()
                );
            }
        }
    }

    /// Creates one `partition_NNNNN.bin` file per partition in a directory.
    #[derive(Debug, Clone)]
    pub struct DiskPartitionFactory {
        directory: PathBuf,
        buffer_size: usize,
    }

    impl DiskPartitionFactory {
        /// Use `directory`, creating it if needed.
        pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
            let directory = directory.into();
            fs::create_dir_all(&directory)?;
            Ok(Self {
                directory,
                buffer_size: DEFAULT_BUFFER_SIZE,
            })
        }

        pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
            self.buffer_size = buffer_size.max(1);
            self
        }

        pub fn directory(&self) -> &Path {
            &self.directory
        }

        pub fn path_for(&self, index: usize) -> PathBuf {
            self.directory.join(format!("partition_{index:05}.bin"))
        }
    }

    impl PartitionFactory for DiskPartitionFactory {
        type Partition = DiskBackedPartition;

        fn create(&self, index: usize, dimensionality: usize) -> Result<DiskBackedPartition> {
            DiskBackedPartition::create(
                self.path_for(index),
                index,
                dimensionality,
                self.buffer_size,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_memory_append_and_close() {
        let mut p = MemoryPartitionFactory.create(2, 2).unwrap();
        p.add_vector(DbId(1), array![1.0, 2.0].view()).unwrap();
        p.add_vector(DbId(3), array![3.0, 4.0].view()).unwrap();
        assert_eq!(p.index(), 2);
        assert_eq!(p.len(), 2);
        assert_eq!(p.ids().unwrap(), vec![DbId(1), DbId(3)]);

        p.close().unwrap();
        assert!(p.is_closed());
        let err = p.add_vector(DbId(4), array![0.0, 0.0].view()).unwrap_err();
        assert!(matches!(err, PartitionError::PartitionClosed(2)));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_memory_discard_empties() {
        let mut p = MemoryPartition::new(0, 1);
        p.add_vector(DbId(1), array![1.0].view()).unwrap();
        p.discard().unwrap();
        assert!(p.is_closed());
        assert!(p.is_empty());
    }

    #[test]
    fn test_memory_dimension_checked() {
        let mut p = MemoryPartition::new(0, 3);
        let err = p.add_vector(DbId(0), array![1.0].view()).unwrap_err();
        assert!(matches!(
            err,
            PartitionError::DimensionMismatch { expected: 3, got: 1 }
        ));
        assert!(p.is_empty());
    }

    #[cfg(feature = "persistence")]
    mod disk_tests {
        use super::*;

        #[test]
        fn test_disk_roundtrip_through_buffer() {
            let dir = tempfile::tempdir().unwrap();
            let factory = DiskPartitionFactory::new(dir.path()).unwrap().with_buffer_size(3);
            let mut p = factory.create(7, 2).unwrap();
            for i in 0..8u64 {
                p.add_vector(DbId(i), array![i as f32, -(i as f32)].view())
                    .unwrap();
            }
            // 6 entries flushed, 2 still buffered.
            let entries = p.entries().unwrap();
            assert_eq!(entries.len(), 8);
            assert_eq!(entries[7].0, DbId(7));
            assert_eq!(entries[7].1, array![7.0, -7.0]);

            p.close().unwrap();
            let reopened = DiskBackedPartition::open(factory.path_for(7)).unwrap();
            assert_eq!(reopened.index(), 7);
            assert_eq!(reopened.dimensionality(), 2);
            assert_eq!(reopened.len(), 8);
            assert!(reopened.is_closed());
            assert_eq!(
                reopened.ids().unwrap(),
                (0..8).map(DbId).collect::<Vec<_>>()
            );
        }

        #[test]
        fn test_disk_rejects_writes_after_close() {
            let dir = tempfile::tempdir().unwrap();
            let factory = DiskPartitionFactory::new(dir.path()).unwrap();
            let mut p = factory.create(0, 1).unwrap();
            p.close().unwrap();
            p.close().unwrap();
            assert!(matches!(
                p.add_vector(DbId(0), array![1.0].view()),
                Err(PartitionError::PartitionClosed(0))
            ));
            assert!(p.entries().unwrap().is_empty());
        }

        #[test]
        fn test_disk_drop_without_close_is_not_reopenable() {
            let dir = tempfile::tempdir().unwrap();
            let factory = DiskPartitionFactory::new(dir.path()).unwrap().with_buffer_size(1);
            {
                let mut p = factory.create(1, 1).unwrap();
                p.add_vector(DbId(42), array![0.5].view()).unwrap();
            }
            assert!(matches!(
                DiskBackedPartition::open(factory.path_for(1)),
                Err(PartitionError::Unfinalized(_))
            ));
        }

        #[test]
        fn test_disk_discard_removes_file() {
            let dir = tempfile::tempdir().unwrap();
            let factory = DiskPartitionFactory::new(dir.path()).unwrap();
            let mut p = factory.create(3, 2).unwrap();
            p.add_vector(DbId(1), array![1.0, 1.0].view()).unwrap();
            p.close().unwrap();
            assert!(factory.path_for(3).exists());

            p.discard().unwrap();
            p.discard().unwrap();
            assert!(!factory.path_for(3).exists());
            assert!(p.is_closed());
            assert!(p.is_empty());
            assert!(p.entries().unwrap().is_empty());
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn test_disk_failed_write_is_not_counted() {
            // Every write to /dev/full fails with ENOSPC.
            let mut p = DiskBackedPartition::create("/dev/full", 0, 1, 1).unwrap();
            let err = p.add_vector(DbId(5), array![1.0].view()).unwrap_err();
            assert!(matches!(err, PartitionError::Io(_)));
            assert_eq!(p.len(), 0);

            assert!(matches!(
                p.entries(),
                Err(PartitionError::PartitionPoisoned(0))
            ));
            assert!(matches!(
                p.add_vector(DbId(6), array![2.0].view()),
                Err(PartitionError::PartitionPoisoned(0))
            ));
            assert!(matches!(p.close(), Err(PartitionError::PartitionPoisoned(0))));
            assert!(!p.is_closed());
            assert_eq!(p.len(), 0);
        }
    }
}

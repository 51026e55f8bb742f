use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Collects runtime statistics about partitioning runs using lock-free atomic counters.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    run_count: AtomicU64,
    partitions_created: AtomicU64,
    vectors_read: AtomicU64,
    vectors_written: AtomicU64,
    hash_evaluations: AtomicU64,
    total_run_time_ns: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_run(&self, duration_ns: u64) {
        self.run_count.fetch_add(1, Ordering::Relaxed);
        self.total_run_time_ns
            .fetch_add(duration_ns, Ordering::Relaxed);
    }

    pub fn record_partition(&self) {
        self.partitions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read(&self) {
        self.vectors_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.vectors_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hash(&self) {
        self.hash_evaluations.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let run_count = self.run_count.load(Ordering::Relaxed);
        let total_run_time_ns = self.total_run_time_ns.load(Ordering::Relaxed);

        MetricsSnapshot {
            run_count,
            partitions_created: self.partitions_created.load(Ordering::Relaxed),
            vectors_read: self.vectors_read.load(Ordering::Relaxed),
            vectors_written: self.vectors_written.load(Ordering::Relaxed),
            hash_evaluations: self.hash_evaluations.load(Ordering::Relaxed),
            avg_run_time_ms: if run_count > 0 {
                total_run_time_ns as f64 / run_count as f64 / 1_000_000.0
            } else {
                0.0
            },
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.run_count.store(0, Ordering::Relaxed);
        self.partitions_created.store(0, Ordering::Relaxed);
        self.vectors_read.store(0, Ordering::Relaxed);
        self.vectors_written.store(0, Ordering::Relaxed);
        self.hash_evaluations.store(0, Ordering::Relaxed);
        self.total_run_time_ns.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of partitioning metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub run_count: u64,
    pub partitions_created: u64,
    /// Dataset lookups, including the extra pass a hash-guided run makes.
    pub vectors_read: u64,
    pub vectors_written: u64,
    pub hash_evaluations: u64,
    pub avg_run_time_ms: f64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runs: {}, Partitions: {}, Read: {}, Written: {}, Hashes: {}, Avg run: {:.2}ms",
            self.run_count,
            self.partitions_created,
            self.vectors_read,
            self.vectors_written,
            self.hash_evaluations,
            self.avg_run_time_ms,
        )
    }
}

/// RAII timer for measuring run durations.
pub(crate) struct RunTimer {
    start: Instant,
}

impl RunTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ns(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
}

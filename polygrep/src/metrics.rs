use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters shared by every extractor of a run
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    files_enumerated: Arc<AtomicU64>,
    files_processed: Arc<AtomicU64>,
    files_failed: Arc<AtomicU64>,
    enumeration_errors: Arc<AtomicU64>,
    units_scanned: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
    extractors_run: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            files_enumerated: Arc::new(AtomicU64::new(0)),
            files_processed: Arc::new(AtomicU64::new(0)),
            files_failed: Arc::new(AtomicU64::new(0)),
            enumeration_errors: Arc::new(AtomicU64::new(0)),
            units_scanned: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            extractors_run: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_enumerated(&self, count: u64) {
        self.files_enumerated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_enumeration_error(&self) {
        self.enumeration_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a file that was read into `units` text units
    pub fn record_file_processed(&self, units: u64, bytes: u64) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        self.units_scanned.fetch_add(units, Ordering::Relaxed);
        let total = self.bytes_read.fetch_add(bytes, Ordering::Relaxed) + bytes;
        debug!("Read {} bytes, total: {} bytes", bytes, total);
    }

    pub fn record_file_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extractor_run(&self) {
        self.extractors_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets a point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_enumerated: self.files_enumerated.load(Ordering::Relaxed),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            enumeration_errors: self.enumeration_errors.load(Ordering::Relaxed),
            units_scanned: self.units_scanned.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            extractors_run: self.extractors_run.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.snapshot();
        info!(
            "Search stats:\n\
             Extractors run: {}\n\
             Files enumerated/processed/failed: {}/{}/{}\n\
             Enumeration errors: {}\n\
             Text units scanned: {}\n\
             Bytes read: {}",
            stats.extractors_run,
            stats.files_enumerated,
            stats.files_processed,
            stats.files_failed,
            stats.enumeration_errors,
            stats.units_scanned,
            stats.bytes_read
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about one search run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub files_enumerated: u64,
    pub files_processed: u64,
    pub files_failed: u64,
    pub enumeration_errors: u64,
    pub units_scanned: u64,
    pub bytes_read: u64,
    pub extractors_run: u64,
}

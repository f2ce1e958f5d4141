use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::search::processor::MMAP_THRESHOLD;

/// Counters shared by the worker threads of one search
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    files_walked: Arc<AtomicU64>,
    files_searched: Arc<AtomicU64>,
    files_matched: Arc<AtomicU64>,
    files_skipped: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,

    // Read strategy
    in_memory_reads: Arc<AtomicU64>,
    mmap_reads: Arc<AtomicU64>,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self {
            files_walked: Arc::new(AtomicU64::new(0)),
            files_searched: Arc::new(AtomicU64::new(0)),
            files_matched: Arc::new(AtomicU64::new(0)),
            files_skipped: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            in_memory_reads: Arc::new(AtomicU64::new(0)),
            mmap_reads: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_walk(&self, files: usize) {
        self.files_walked.fetch_add(files as u64, Ordering::Relaxed);
    }

    /// Records a file read, classified by the strategy its size selects
    pub fn record_read(&self, size: u64) {
        self.bytes_read.fetch_add(size, Ordering::Relaxed);
        if size >= MMAP_THRESHOLD {
            self.mmap_reads.fetch_add(1, Ordering::Relaxed);
        } else {
            self.in_memory_reads.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_searched(&self, matched: bool) {
        self.files_searched.fetch_add(1, Ordering::Relaxed);
        if matched {
            self.files_matched.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> SearchStats {
        SearchStats {
            files_walked: self.files_walked.load(Ordering::Relaxed),
            files_searched: self.files_searched.load(Ordering::Relaxed),
            files_matched: self.files_matched.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            in_memory_reads: self.in_memory_reads.load(Ordering::Relaxed),
            mmap_reads: self.mmap_reads.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        debug!(
            "Search stats:\n\
             Files walked/searched/matched/skipped: {}/{}/{}/{}\n\
             Bytes read: {}\n\
             Reads (in-memory/mmap): {}/{}",
            stats.files_walked,
            stats.files_searched,
            stats.files_matched,
            stats.files_skipped,
            stats.bytes_read,
            stats.in_memory_reads,
            stats.mmap_reads
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`SearchMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub files_walked: u64,
    pub files_searched: u64,
    pub files_matched: u64,
    pub files_skipped: u64,
    pub bytes_read: u64,
    pub in_memory_reads: u64,
    pub mmap_reads: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_counters() {
        let metrics = SearchMetrics::new();
        metrics.record_walk(3);
        metrics.record_searched(true);
        metrics.record_searched(false);
        metrics.record_skipped();

        let stats = metrics.get_stats();
        assert_eq!(stats.files_walked, 3);
        assert_eq!(stats.files_searched, 2);
        assert_eq!(stats.files_matched, 1);
        assert_eq!(stats.files_skipped, 1);
    }

    #[test]
    fn test_read_strategy_tracking() {
        let metrics = SearchMetrics::new();
        metrics.record_read(1000);
        metrics.record_read(MMAP_THRESHOLD);

        let stats = metrics.get_stats();
        assert_eq!(stats.in_memory_reads, 1);
        assert_eq!(stats.mmap_reads, 1);
        assert_eq!(stats.bytes_read, 1000 + MMAP_THRESHOLD);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = SearchMetrics::new();
        let worker = metrics.clone();
        worker.record_searched(true);
        assert_eq!(metrics.get_stats().files_matched, 1);
    }
}

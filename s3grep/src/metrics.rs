use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::results::SearchSummary;

/// Counters shared by every worker of one search
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    objects_scanned: Arc<AtomicU64>,
    empty_objects: Arc<AtomicU64>,
    fetch_failures: Arc<AtomicU64>,
    matches: Arc<AtomicU64>,
    bytes_scanned: Arc<AtomicU64>,
    largest_object: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            objects_scanned: Arc::new(AtomicU64::new(0)),
            empty_objects: Arc::new(AtomicU64::new(0)),
            fetch_failures: Arc::new(AtomicU64::new(0)),
            matches: Arc::new(AtomicU64::new(0)),
            bytes_scanned: Arc::new(AtomicU64::new(0)),
            largest_object: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a downloaded object body
    pub fn record_object(&self, bytes: u64) {
        self.objects_scanned.fetch_add(1, Ordering::Relaxed);
        if bytes == 0 {
            self.empty_objects.fetch_add(1, Ordering::Relaxed);
        }
        let total = self.bytes_scanned.fetch_add(bytes, Ordering::Relaxed) + bytes;

        let mut largest = self.largest_object.load(Ordering::Relaxed);
        while bytes > largest {
            match self.largest_object.compare_exchange_weak(
                largest,
                bytes,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => largest = current,
            }
        }
        debug!("Object scanned: {} bytes, total: {} bytes", bytes, total);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets a snapshot of the counters
    pub fn get_stats(&self) -> SearchStats {
        SearchStats {
            objects_scanned: self.objects_scanned.load(Ordering::Relaxed),
            empty_objects: self.empty_objects.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            largest_object: self.largest_object.load(Ordering::Relaxed),
        }
    }

    /// Fills the worker-side totals of `summary`
    pub fn apply_to(&self, summary: &mut SearchSummary) {
        let stats = self.get_stats();
        summary.objects_scanned = stats.objects_scanned as usize;
        summary.empty_objects = stats.empty_objects as usize;
        summary.fetch_failures = stats.fetch_failures as usize;
        summary.bytes_scanned = stats.bytes_scanned;
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Objects scanned: {} ({} empty)\n\
             Fetch failures: {}\n\
             Matches: {}\n\
             Bytes scanned: {} (largest object: {} bytes)",
            stats.objects_scanned,
            stats.empty_objects,
            stats.fetch_failures,
            stats.matches,
            stats.bytes_scanned,
            stats.largest_object
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SearchMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub objects_scanned: u64,
    pub empty_objects: u64,
    pub fetch_failures: u64,
    pub matches: u64,
    pub bytes_scanned: u64,
    pub largest_object: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_tracking() {
        let metrics = SearchMetrics::new();

        metrics.record_object(1000);
        metrics.record_object(0);
        metrics.record_object(500);
        let stats = metrics.get_stats();
        assert_eq!(stats.objects_scanned, 3);
        assert_eq!(stats.empty_objects, 1);
        assert_eq!(stats.bytes_scanned, 1500);
        assert_eq!(stats.largest_object, 1000);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = SearchMetrics::new();
        let worker = metrics.clone();

        worker.record_match();
        worker.record_match();
        worker.record_fetch_failure();

        let stats = metrics.get_stats();
        assert_eq!(stats.matches, 2);
        assert_eq!(stats.fetch_failures, 1);
    }

    #[test]
    fn test_apply_to_summary() {
        let metrics = SearchMetrics::new();
        metrics.record_object(10);
        metrics.record_fetch_failure();

        let mut summary = SearchSummary::new();
        summary.objects_listed = 2;
        metrics.apply_to(&mut summary);
        assert_eq!(summary.objects_scanned, 1);
        assert_eq!(summary.fetch_failures, 1);
        assert_eq!(summary.bytes_scanned, 10);
        assert!(summary.is_complete());
    }
}

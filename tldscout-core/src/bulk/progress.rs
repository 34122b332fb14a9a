use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Called after each domain completes with `(processed, total, domain)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Live counters for one batch. Safe to read from other tasks mid-flight.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: AtomicUsize,
    processed: AtomicUsize,
    successful: AtomicUsize,
    failed: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_total(&self, count: usize) {
        self.total.fetch_add(count, Ordering::SeqCst);
    }

    /// Records a success and returns the new processed count.
    pub(crate) fn record_success(&self) -> usize {
        self.successful.fetch_add(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records a failure and returns the new processed count.
    pub(crate) fn record_failure(&self) -> usize {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            successful: self.successful.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters() {
        let tracker = ProgressTracker::new();
        tracker.add_total(3);
        assert_eq!(tracker.record_success(), 1);
        assert_eq!(tracker.record_failure(), 2);

        let snapshot = tracker.snapshot();
        assert_eq!(
            snapshot,
            ProgressSnapshot {
                total: 3,
                processed: 2,
                successful: 1,
                failed: 1
            }
        );
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_concurrent_updates_balance() {
        let tracker = Arc::new(ProgressTracker::new());
        tracker.add_total(800);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for n in 0..100 {
                        if (i + n) % 3 == 0 {
                            tracker.record_failure();
                        } else {
                            tracker.record_success();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.processed, snapshot.successful + snapshot.failed);
        assert!(snapshot.is_complete());
    }
}

// Lock-free delivery statistics using atomic operations

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the dispatcher after every flush attempt.
#[derive(Debug, Default)]
pub struct TransmissionStats {
    batches_sent: AtomicU64,
    entries_sent: AtomicU64,
    batches_dropped: AtomicU64,
    entries_dropped: AtomicU64,
    bytes_sent: AtomicU64,
}

impl TransmissionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, entries: usize, bytes: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.entries_sent.fetch_add(entries as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_drop(&self, entries: usize) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
        self.entries_dropped.fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            entries_sent: self.entries_sent.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            entries_dropped: self.entries_dropped.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub batches_sent: u64,
    pub entries_sent: u64,
    pub batches_dropped: u64,
    pub entries_dropped: u64,
    pub bytes_sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_outcomes() {
        let stats = TransmissionStats::new();
        stats.record_success(3, 120);
        stats.record_success(1, 30);
        stats.record_drop(2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.batches_sent, 2);
        assert_eq!(snapshot.entries_sent, 4);
        assert_eq!(snapshot.bytes_sent, 150);
        assert_eq!(snapshot.batches_dropped, 1);
        assert_eq!(snapshot.entries_dropped, 2);
    }
}

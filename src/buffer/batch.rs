use crate::domain::LogRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a batch was cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchType {
    /// The accumulator reached `batch_entries_number`.
    SizeBased,
    /// The flush timer fired with entries pending.
    TimeBased,
    /// Final drain on the way out of the dispatch loop.
    Shutdown,
}

/// An ordered, non-empty run of records bound for one push request, tagged
/// with the client's static label set.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    labels: String,
    entries: Vec<LogRecord>,
    batch_type: BatchType,
}

impl Batch {
    pub fn new(labels: impl Into<String>, entries: Vec<LogRecord>, batch_type: BatchType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            labels: labels.into(),
            entries,
            batch_type,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn labels(&self) -> &str {
        &self.labels
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[LogRecord] {
        &self.entries
    }

    pub fn batch_type(&self) -> BatchType {
        self.batch_type
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pending records owned by the dispatcher between flushes.
///
/// Arrival order is preserved and the accumulator never holds more than
/// `max_entries` records: `push` reports when the limit is hit so the caller
/// flushes before accepting another record.
#[derive(Debug)]
pub struct BatchAccumulator {
    pending: Vec<LogRecord>,
    max_entries: usize,
}

impl BatchAccumulator {
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            pending: Vec::with_capacity(max_entries.min(1024)),
            max_entries,
        }
    }

    /// Appends a record. Returns `true` once the batch is full.
    pub fn push(&mut self, record: LogRecord) -> bool {
        self.pending.push(record);
        self.pending.len() >= self.max_entries
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drains everything pending into a batch, leaving the accumulator empty.
    /// Returns `None` when nothing is pending.
    pub fn take(&mut self, labels: &str, batch_type: BatchType) -> Option<Batch> {
        if self.pending.is_empty() {
            return None;
        }

        let entries = std::mem::take(&mut self.pending);
        Some(Batch::new(labels, entries, batch_type))
    }
}

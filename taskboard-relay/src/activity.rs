//! Bounded, newest-first activity log.
//!
//! Every successful board mutation appends one [`ActivityRecord`] to the
//! front of the log. The log is capped: once full, the oldest entry at the
//! tail is evicted. Entries are never mutated after insertion.

use std::collections::VecDeque;

use taskboard_proto::activity::ActivityRecord;

/// Default maximum number of retained activity records.
pub const DEFAULT_ACTIVITY_CAP: usize = 100;

/// Capacity-bounded activity log, newest entry first.
#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<ActivityRecord>,
    cap: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    /// Creates an empty log with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_ACTIVITY_CAP)
    }

    /// Creates an empty log with a custom capacity.
    #[must_use]
    pub const fn with_cap(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap,
        }
    }

    /// Seeds the log with previously persisted records (newest first),
    /// trimming to capacity.
    #[must_use]
    pub fn from_records(records: Vec<ActivityRecord>, cap: usize) -> Self {
        let mut entries: VecDeque<ActivityRecord> = records.into();
        entries.truncate(cap);
        Self { entries, cap }
    }

    /// Appends a record at the front; evicts the oldest entry if the log
    /// is at capacity.
    pub fn record(&mut self, record: ActivityRecord) {
        self.entries.push_front(record);
        self.entries.truncate(self.cap);
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `n` most recent records, newest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<ActivityRecord> {
        self.entries.iter().take(n).cloned().collect()
    }

    /// All retained records, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActivityRecord> {
        self.entries.iter().cloned().collect()
    }
}

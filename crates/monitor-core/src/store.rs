//! Bounded window of the most recent call records.

use parking_lot::RwLock;
use std::collections::VecDeque;

use crate::types::CallRecord;

/// Number of records retained when no capacity is configured.
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Ring buffer of [`CallRecord`]s.
///
/// Records are kept in insertion order; appending past `capacity` evicts the
/// oldest record. The capacity check and the push happen under one write lock,
/// so a store can be shared behind an `Arc`.
#[derive(Debug)]
pub struct CallRecordStore {
    records: RwLock<VecDeque<CallRecord>>,
    capacity: usize,
}

impl CallRecordStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { records: RwLock::new(VecDeque::with_capacity(capacity)), capacity }
    }

    /// Appends a record, returning the one evicted to make room, if any.
    pub fn append(&self, record: CallRecord) -> Option<CallRecord> {
        let mut records = self.records.write();
        records.push_back(record);
        if records.len() > self.capacity {
            records.pop_front()
        } else {
            None
        }
    }

    /// Newest-first copy of the window.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CallRecord> {
        self.records.read().iter().rev().cloned().collect()
    }

    /// Insertion-order copy of the window.
    #[must_use]
    pub fn records(&self) -> Vec<CallRecord> {
        self.records.read().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CallRecordStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

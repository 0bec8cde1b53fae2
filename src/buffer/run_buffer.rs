//! Run buffer implementation
//!
//! Vec-backed, insertion-ordered, sorted only right before a spill.

use crate::compare::{KeyComparator, SortAlgorithm};
use crate::record::{Record, RecordPool};

/// Records waiting to be spilled as one section
pub struct RunBuffer {
    records: Vec<Record>,
    /// Sum of key + value lengths
    byte_size: usize,
    pool: RecordPool,
}

impl RunBuffer {
    /// Create an empty buffer drawing records from `pool`
    pub fn new(pool: RecordPool) -> Self {
        Self {
            records: Vec::new(),
            byte_size: 0,
            pool,
        }
    }

    /// Copy `key` and `value` into a pooled record at the end
    pub fn append(&mut self, key: &[u8], value: &[u8]) {
        self.records.push(self.pool.acquire_with(key, value));
        self.byte_size += key.len() + value.len();
    }

    /// Key + value bytes held (O(1))
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reorder records by key
    pub fn sort(&mut self, comparator: &dyn KeyComparator, algorithm: SortAlgorithm) {
        let by_key = |a: &Record, b: &Record| comparator.compare(a.key(), b.key());
        match algorithm {
            SortAlgorithm::Stable => self.records.sort_by(by_key),
            SortAlgorithm::Unstable => self.records.sort_unstable_by(by_key),
        }
    }

    /// Records in current order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Release every record to the pool and zero the size
    pub fn reset(&mut self) {
        self.pool.release_all(self.records.drain(..));
        self.byte_size = 0;
    }
}

impl Drop for RunBuffer {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<'a> IntoIterator for &'a RunBuffer {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

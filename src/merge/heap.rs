//! Merge heap
//!
//! Binary min-heap holding at most one pending record per section.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::compare::KeyComparator;
use crate::record::Record;

struct HeapEntry {
    section: usize,
    record: Record,
}

/// K-way merge primitive ordered by key, then by section index
///
/// On equal keys the entry from the lower (earlier flushed) section pops
/// first, so a later section's duplicate is always seen after an earlier one.
pub struct MergeHeap {
    entries: Vec<HeapEntry>,
    comparator: Arc<dyn KeyComparator>,
}

impl MergeHeap {
    pub fn new(comparator: Arc<dyn KeyComparator>) -> Self {
        Self::with_capacity(comparator, 0)
    }

    pub fn with_capacity(comparator: Arc<dyn KeyComparator>, capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            comparator,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add the pending record of `section`
    pub fn push_entry(&mut self, section: usize, record: Record) {
        self.entries.push(HeapEntry { section, record });
        self.sift_up(self.entries.len() - 1);
    }

    /// Remove and return the minimum entry
    pub fn pop_entry(&mut self) -> Option<(usize, Record)> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let entry = self.entries.pop()?;
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some((entry.section, entry.record))
    }

    /// Key of the minimum entry
    pub fn peek_key(&self) -> Option<&[u8]> {
        self.entries.first().map(|e| e.record.key())
    }

    /// Empty the heap, yielding the records so they can be released
    pub fn drain(&mut self) -> impl Iterator<Item = Record> + '_ {
        self.entries.drain(..).map(|e| e.record)
    }

    fn less(&self, i: usize, j: usize) -> bool {
        let (a, b) = (&self.entries[i], &self.entries[j]);
        match self.comparator.compare(a.record.key(), b.record.key()) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => a.section < b.section,
        }
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(i, parent) {
                break;
            }
            self.entries.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.entries.len();
        loop {
            let left = 2 * i + 1;
            if left >= n {
                break;
            }
            let right = left + 1;
            let mut smallest = left;
            if right < n && self.less(right, left) {
                smallest = right;
            }
            if !self.less(smallest, i) {
                break;
            }
            self.entries.swap(i, smallest);
            i = smallest;
        }
    }
}

//! Merge Module
//!
//! K-way merge of the spilled sections into one sorted stream.
//!
//! ## Responsibilities
//! - Keep one pending record per active section in a min-heap
//! - Break key ties by section index so later flushes are seen last
//! - Collapse duplicates across sections (last write wins)
//! - Expose the result through a forward-only cursor

mod heap;
mod iterator;

pub use heap::MergeHeap;
pub use iterator::MergeIterator;

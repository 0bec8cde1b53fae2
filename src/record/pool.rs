//! Record pool
//!
//! Free list of record buffers shared behind a cloneable handle.

use std::fmt;
use std::sync::{Arc, OnceLock};

use bytes::BytesMut;
use parking_lot::Mutex;

use super::Record;

/// Buffers kept on the free list by default
const DEFAULT_MAX_IDLE: usize = 4096;

/// Buffers larger than this are dropped instead of pooled
const DEFAULT_MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// Shared pool of record buffers
///
/// Cloning yields another handle to the same free list. The pool does no
/// ownership tracking: `release` takes the record by value, so the type
/// system enforces one owner per record.
#[derive(Clone)]
pub struct RecordPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    free: Mutex<Vec<BytesMut>>,
    max_idle: usize,
    max_retained_capacity: usize,
}

impl RecordPool {
    /// Create a private pool with default limits
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_IDLE, DEFAULT_MAX_RETAINED_CAPACITY)
    }

    /// Create a private pool
    ///
    /// - `max_idle`: buffers retained on the free list
    /// - `max_retained_capacity`: larger buffers are freed on release
    pub fn with_limits(max_idle: usize, max_retained_capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::new()),
                max_idle,
                max_retained_capacity,
            }),
        }
    }

    /// Process-wide pool used when no pool is injected
    pub fn global() -> Self {
        static GLOBAL: OnceLock<RecordPool> = OnceLock::new();
        GLOBAL.get_or_init(RecordPool::new).clone()
    }

    /// Take an empty record, reusing a pooled buffer when one is idle
    pub fn acquire(&self) -> Record {
        let buffer = self.inner.free.lock().pop().unwrap_or_default();
        Record::from_buffer(buffer)
    }

    /// Take a record holding a copy of `key` and `value`
    pub fn acquire_with(&self, key: &[u8], value: &[u8]) -> Record {
        let mut record = self.acquire();
        record.set(key, value);
        record
    }

    /// Return a record's buffer to the free list
    pub fn release(&self, record: Record) {
        if record.capacity() > self.inner.max_retained_capacity {
            return;
        }
        let mut free = self.inner.free.lock();
        if free.len() < self.inner.max_idle {
            let mut buffer = record.into_buffer();
            buffer.clear();
            free.push(buffer);
        }
    }

    /// Release every record yielded by `records`
    pub fn release_all(&self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.release(record);
        }
    }

    /// Number of idle buffers on the free list
    pub fn idle(&self) -> usize {
        self.inner.free.lock().len()
    }

    /// True when both handles point at the same free list
    pub fn same_pool(&self, other: &RecordPool) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for RecordPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordPool")
            .field("idle", &self.idle())
            .field("max_idle", &self.inner.max_idle)
            .field("max_retained_capacity", &self.inner.max_retained_capacity)
            .finish()
    }
}

//! Record Module
//!
//! One key/value pair stored back to back in a single pooled buffer.
//!
//! ## Layout
//! ```text
//! data: ┌──────────────┬──────────────────────┐
//!       │ key          │ value                │
//!       └──────────────┴──────────────────────┘
//!       0          key_len               data.len()
//! ```
//!
//! Records are drawn from a [`RecordPool`] and handed back with
//! [`RecordPool::release`], which takes the record by value. A released
//! record can therefore never be read again or released twice.

mod pool;

use bytes::BytesMut;

pub use pool::RecordPool;

/// A key/value pair backed by one growable buffer
#[derive(Debug, Default)]
pub struct Record {
    data: BytesMut,
    key_len: usize,
}

impl Record {
    pub(crate) fn from_buffer(mut data: BytesMut) -> Self {
        data.clear();
        Self { data, key_len: 0 }
    }

    pub(crate) fn into_buffer(self) -> BytesMut {
        self.data
    }

    /// Key bytes
    pub fn key(&self) -> &[u8] {
        &self.data[..self.key_len]
    }

    /// Value bytes
    pub fn value(&self) -> &[u8] {
        &self.data[self.key_len..]
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }

    pub fn value_len(&self) -> usize {
        self.data.len() - self.key_len
    }

    /// Key length plus value length (what counts against the spill threshold)
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Replace contents with `key` followed by `value`
    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        self.data.clear();
        self.data.reserve(key.len() + value.len());
        self.data.extend_from_slice(key);
        self.data.extend_from_slice(value);
        self.key_len = key.len();
    }

    /// Deep-copy `src` into this record's own buffer
    pub fn copy_from(&mut self, src: &Record) {
        self.data.clear();
        self.data.extend_from_slice(&src.data);
        self.key_len = src.key_len;
    }

    /// Resize to hold a `key_len + value_len` frame and return the writable
    /// bytes. Used by the run reader to decode straight into the buffer.
    pub(crate) fn frame_mut(&mut self, key_len: usize, value_len: usize) -> &mut [u8] {
        self.data.clear();
        self.data.resize(key_len + value_len, 0);
        self.key_len = key_len;
        &mut self.data[..]
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

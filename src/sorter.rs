//! Sorter Module
//!
//! The public entry point that coordinates buffering, spilling and merging.
//!
//! ## Responsibilities
//! - Accumulate `put`/`append` calls in the run buffer
//! - Spill a sorted, deduplicated section when the threshold would be exceeded
//! - Hand the merge over to a [`MergeIterator`] on `sort`
//! - Tear down the spill file when abandoned

use std::path::Path;

use crate::buffer::RunBuffer;
use crate::config::Options;
use crate::error::Result;
use crate::merge::MergeIterator;
use crate::spill::RunWriter;

/// External sorter for key/value records
///
/// ## Lifecycle
/// `put`/`append` any number of times, then either `sort` (yielding the
/// merge cursor) or `close` (discarding everything). Both consume the
/// sorter, so sorting twice or writing after `sort` does not compile.
///
/// Not safe for concurrent use; all I/O happens inline in `put` and `sort`.
///
/// ```compile_fail
/// use spillsort::{Options, Sorter};
///
/// let mut sorter = Sorter::new(Options::default()).unwrap();
/// let _iter = sorter.sort().unwrap();
/// sorter.put(b"late", b"").unwrap(); // `sorter` was moved by `sort`
/// ```
pub struct Sorter {
    /// Sort configuration
    options: Options,

    /// Records not yet spilled
    buffer: RunBuffer,

    /// Spill file writer, created on the first flush
    writer: Option<RunWriter>,

    /// Records dropped as duplicates during flushes
    deduplicated: u64,
}

impl Sorter {
    /// Create a sorter after validating `options`
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        let buffer = RunBuffer::new(options.pool.clone());

        Ok(Self {
            options,
            buffer,
            writer: None,
            deduplicated: 0,
        })
    }

    /// Add a key with an empty value
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.put(data, &[])
    }

    /// Add a key/value pair
    ///
    /// Spills the buffer first when it is non-empty and this record would
    /// push it past the threshold.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let size = self.buffer.byte_size();
        if size > 0 && size + key.len() + value.len() > self.options.buffer_size {
            let mut writer = self.take_writer()?;
            let spilled = self.spill(&mut writer);
            self.writer = Some(writer);
            spilled?;
        }

        self.buffer.append(key, value);
        Ok(())
    }

    /// Spill what is left and return the merged output
    pub fn sort(mut self) -> Result<MergeIterator> {
        let mut writer = self.take_writer()?;
        self.spill(&mut writer)?;
        let spilled = writer.finish()?;

        tracing::info!(
            sections = spilled.sections.len(),
            bytes = spilled.sections.last().map(|s| s.end).unwrap_or(0),
            deduplicated = self.deduplicated,
            "merging spilled sections"
        );

        MergeIterator::new(spilled, &self.options)
    }

    /// Discard buffered records and remove the spill file (unless kept)
    pub fn close(mut self) -> Result<()> {
        self.buffer.reset();
        match self.writer.take() {
            Some(mut writer) => writer.close(),
            None => Ok(()),
        }
    }

    /// Buffered bytes plus bytes written to the spill file
    pub fn size(&self) -> u64 {
        let spilled = self.writer.as_ref().map(RunWriter::size).unwrap_or(0);
        self.buffer.byte_size() as u64 + spilled
    }

    /// Records waiting in memory
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Sections spilled so far
    pub fn section_count(&self) -> usize {
        self.writer.as_ref().map_or(0, |w| w.sections().len())
    }

    /// Spill file location, once the first run has been spilled
    pub fn temp_path(&self) -> Option<&Path> {
        self.writer.as_ref().map(RunWriter::path)
    }

    /// Get the configuration
    pub fn options(&self) -> &Options {
        &self.options
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// The spill file writer, created on first use
    fn take_writer(&mut self) -> Result<RunWriter> {
        match self.writer.take() {
            Some(writer) => Ok(writer),
            None => RunWriter::create(
                &self.options.work_dir,
                self.options.codec.clone(),
                self.options.keep_files,
            ),
        }
    }

    /// Sort the buffer, drop adjacent duplicates (keeping the later one) and
    /// write the rest as one section
    fn spill(&mut self, writer: &mut RunWriter) -> Result<()> {
        self.buffer.sort(
            self.options.comparator.as_ref(),
            self.options.sort_algorithm,
        );

        let records = self.buffer.records();
        let mut dropped = 0u64;
        for (i, record) in records.iter().enumerate() {
            if let Some(next) = records.get(i + 1) {
                if self.options.is_duplicate(record.key(), next.key()) {
                    dropped += 1;
                    continue;
                }
            }
            writer.encode(record)?;
        }
        writer.flush()?;

        tracing::debug!(
            section = writer.sections().len() - 1,
            records = records.len() as u64 - dropped,
            deduplicated = dropped,
            bytes = writer.size(),
            "spilled run"
        );

        self.deduplicated += dropped;
        self.buffer.reset();
        Ok(())
    }
}

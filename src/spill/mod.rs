//! Spill Module
//!
//! Sorted runs ("sections") written to one temporary file per sort.
//!
//! ## Responsibilities
//! - Append framed records for the section being spilled
//! - Optional per-section compression through a [`Codec`]
//! - Commit section boundaries and checksums only after a successful flush
//! - Random-access decoding with one cursor per section during the merge
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Section 0   (optionally one codec stream)            │
//! │   [KeyLen: u32 LE][ValLen: u32 LE][Key][Value]       │
//! │   ... repeated for each record ...                   │
//! ├──────────────────────────────────────────────────────┤
//! │ Section 1                                            │
//! │   ...                                                │
//! └──────────────────────────────────────────────────────┘
//! ```
//! Boundaries are not embedded in the file; they live in [`SectionMeta`]
//! alongside the record count, the longest frame, and a CRC32 of the stored
//! bytes.

pub mod codec;
mod reader;
mod writer;

use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::error::Result;

pub use codec::{Codec, Compression, SectionEncoder};
pub use reader::{RunReader, SectionReader, SectionSource};
pub use writer::{RunWriter, SpillSink, SpilledRuns};

// =============================================================================
// Shared Constants
// =============================================================================

/// Frame header: KeyLen (4) + ValLen (4)
pub(crate) const FRAME_HEADER_SIZE: usize = 8;

/// Bounds for the per-section read buffer
pub(crate) const MIN_READ_BUFFER: usize = 4 * 1024;
pub(crate) const MAX_READ_BUFFER: usize = 1024 * 1024;

/// Prefix for spill file names in the work dir
pub(crate) const FILE_PREFIX: &str = "spillsort-";

/// Per-section read buffer derived from the spill threshold
pub(crate) fn read_buffer_size(buffer_size: usize) -> usize {
    buffer_size.clamp(MIN_READ_BUFFER, MAX_READ_BUFFER)
}

// =============================================================================
// Section Metadata
// =============================================================================

/// Out-of-band description of one committed section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMeta {
    /// First stored byte
    pub start: u64,
    /// One past the last stored byte
    pub end: u64,
    /// Records in the section
    pub records: u64,
    /// Longest key + value in the section
    pub max_frame: u64,
    /// CRC32 of the stored bytes in `[start, end)`
    pub crc32: u32,
}

impl SectionMeta {
    /// Stored (possibly compressed) size in bytes
    pub fn stored_len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

// =============================================================================
// Spill File Lifetime
// =============================================================================

/// Owns the spill file on disk
///
/// Removing happens on [`RunFile::remove`] or on drop. With `keep` set the
/// file is detached from cleanup and left in place instead.
#[derive(Debug)]
pub struct RunFile {
    path: PathBuf,
    temp: Option<TempPath>,
    keep: bool,
}

impl RunFile {
    pub(crate) fn new(temp: TempPath, keep: bool) -> Self {
        Self {
            path: temp.to_path_buf(),
            temp: Some(temp),
            keep,
        }
    }

    /// Location of the spill file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file survives `remove`
    pub fn is_kept(&self) -> bool {
        self.keep
    }

    /// Delete the file (or detach it when kept). Idempotent.
    pub fn remove(&mut self) -> Result<()> {
        let Some(temp) = self.temp.take() else {
            return Ok(());
        };

        if self.keep {
            let path = temp.keep().map_err(|e| e.error)?;
            tracing::debug!(path = %path.display(), "retained spill file");
        } else {
            temp.close()?;
            tracing::debug!(path = %self.path.display(), "removed spill file");
        }
        Ok(())
    }
}

impl Drop for RunFile {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to clean up spill file");
        }
    }
}

//! Configuration for spillsort
//!
//! Centralized sort options with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::compare::{Bytewise, KeyComparator, KeyEquality, SortAlgorithm};
use crate::error::Result;
use crate::record::RecordPool;
use crate::spill::{Codec, Compression};
use crate::SortError;

/// Default spill threshold: 64 MiB of key + value bytes
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Options for one sort operation
#[derive(Clone)]
pub struct Options {
    // -------------------------------------------------------------------------
    // Memory
    // -------------------------------------------------------------------------
    /// Key + value bytes buffered before a spill. Also sizes the per-section
    /// read buffers during the merge.
    pub buffer_size: usize,

    /// Pool that record buffers are drawn from and returned to
    pub pool: RecordPool,

    // -------------------------------------------------------------------------
    // Temporary Storage
    // -------------------------------------------------------------------------
    /// Directory for the spill file
    pub work_dir: PathBuf,

    /// Section codec; `None` stores raw frames
    pub codec: Option<Arc<dyn Codec>>,

    /// Leave the spill file in place after close (for inspection)
    pub keep_files: bool,

    // -------------------------------------------------------------------------
    // Ordering
    // -------------------------------------------------------------------------
    /// Key order
    pub comparator: Arc<dyn KeyComparator>,

    /// Key equality; when set, equal keys collapse to the last inserted
    pub dedupe: Option<Arc<dyn KeyEquality>>,

    /// Sort used on each run buffer before it is spilled
    pub sort_algorithm: SortAlgorithm,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            pool: RecordPool::global(),
            work_dir: std::env::temp_dir(),
            codec: None,
            keep_files: false,
            comparator: Arc::new(Bytewise),
            dedupe: None,
            sort_algorithm: SortAlgorithm::default(),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("buffer_size", &self.buffer_size)
            .field("work_dir", &self.work_dir)
            .field("codec", &self.codec.as_ref().map(|c| c.name()))
            .field("keep_files", &self.keep_files)
            .field("dedupe", &self.dedupe.is_some())
            .field("sort_algorithm", &self.sort_algorithm)
            .finish()
    }
}

impl Options {
    /// Create a new options builder
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Reject settings the sorter cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(SortError::Config(
                "buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.work_dir.exists() && !self.work_dir.is_dir() {
            return Err(SortError::Config(format!(
                "work_dir {} is not a directory",
                self.work_dir.display()
            )));
        }
        Ok(())
    }

    /// Whether deduplication is enabled
    pub fn dedupes(&self) -> bool {
        self.dedupe.is_some()
    }

    /// Whether two keys are duplicates (never, without an equality predicate)
    pub(crate) fn is_duplicate(&self, a: &[u8], b: &[u8]) -> bool {
        self.dedupe.as_ref().is_some_and(|eq| eq.equal(a, b))
    }
}

/// Builder for Options
#[derive(Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Set the spill threshold (in bytes)
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.options.buffer_size = size;
        self
    }

    /// Set the directory for the spill file
    pub fn work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.work_dir = path.into();
        self
    }

    /// Use one of the built-in codecs
    pub fn compression(mut self, compression: Compression) -> Self {
        self.options.codec = compression.codec();
        self
    }

    /// Use a caller-supplied codec
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.options.codec = Some(codec);
        self
    }

    /// Keep the spill file after close
    pub fn keep_files(mut self, keep: bool) -> Self {
        self.options.keep_files = keep;
        self
    }

    /// Set the key order
    pub fn comparator(mut self, comparator: impl KeyComparator + 'static) -> Self {
        self.options.comparator = Arc::new(comparator);
        self
    }

    /// Collapse keys that `equality` reports equal, keeping the last inserted
    pub fn dedupe(mut self, equality: impl KeyEquality + 'static) -> Self {
        self.options.dedupe = Some(Arc::new(equality));
        self
    }

    /// Collapse byte-identical keys
    pub fn dedupe_bytewise(self) -> Self {
        self.dedupe(Bytewise)
    }

    /// Set the run buffer sort
    pub fn sort_algorithm(mut self, algorithm: SortAlgorithm) -> Self {
        self.options.sort_algorithm = algorithm;
        self
    }

    /// Draw records from `pool` instead of the process-wide one
    pub fn pool(mut self, pool: RecordPool) -> Self {
        self.options.pool = pool;
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

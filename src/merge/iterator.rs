//! Merge Iterator
//!
//! Streams the total order of all sections through a forward-only cursor,
//! collapsing duplicates across sections.
//!
//! ## States
//! ```text
//!   Ready ──advance()──▶ Ready ... ──▶ Exhausted
//!     │                                   │
//!     └──── decode failure ──▶ Errored    │
//!                                 │       │
//!                 close() ────────┴───────┴──▶ Closed
//! ```

use std::sync::Arc;

use crate::compare::KeyEquality;
use crate::config::Options;
use crate::error::Result;
use crate::record::{Record, RecordPool};
use crate::spill::{read_buffer_size, RunFile, RunReader, SectionMeta, SpilledRuns};
use crate::SortError;

use super::MergeHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Ready,
    Exhausted,
    Errored,
    Closed,
}

/// Cursor over the sorted, deduplicated output of a sort
///
/// ```no_run
/// # fn run(mut iter: spillsort::MergeIterator) -> spillsort::Result<()> {
/// while iter.advance() {
///     println!("{:?} => {:?}", iter.key(), iter.value());
/// }
/// if let Some(err) = iter.err() {
///     eprintln!("merge failed: {}", err);
/// }
/// iter.close()?;
/// # Ok(())
/// # }
/// ```
pub struct MergeIterator {
    reader: RunReader,
    heap: MergeHeap,
    pool: RecordPool,
    dedupe: Option<Arc<dyn KeyEquality>>,

    /// Record the caller observes
    current: Option<Record>,
    /// Lookahead popped from the heap
    pending: Option<Record>,
    /// Whether `pending` still has to be emitted
    has_pending: bool,

    state: CursorState,
    err: Option<SortError>,
    run_file: RunFile,
}

impl MergeIterator {
    /// Open the merge over every spilled section
    pub(crate) fn new(spilled: SpilledRuns, options: &Options) -> Result<Self> {
        let SpilledRuns {
            file,
            sections,
            run_file,
        } = spilled;

        let num_sections = sections.len();
        let reader = RunReader::open(
            file,
            sections,
            options.codec.clone(),
            read_buffer_size(options.buffer_size),
            options.pool.clone(),
        )?;

        let mut iter = Self {
            reader,
            heap: MergeHeap::with_capacity(Arc::clone(&options.comparator), num_sections),
            pool: options.pool.clone(),
            dedupe: options.dedupe.clone(),
            current: Some(options.pool.acquire()),
            pending: None,
            has_pending: false,
            state: CursorState::Ready,
            err: None,
            run_file,
        };

        for section in 0..num_sections {
            // Dropping `iter` releases what was read so far and the file.
            iter.fill_heap(section)?;
        }
        iter.has_pending = iter.next_pending();

        Ok(iter)
    }

    /// Move to the next record. Returns `false` when the output is exhausted
    /// or a failure was captured (see [`MergeIterator::err`]).
    ///
    /// A record already taken from the heap is still returned when the refill
    /// behind it fails; the failure then ends the merge on the next call.
    pub fn advance(&mut self) -> bool {
        if self.state != CursorState::Ready {
            return false;
        }
        if !self.has_pending {
            self.state = CursorState::Exhausted;
            return false;
        }

        if let (Some(current), Some(pending)) = (self.current.as_mut(), self.pending.as_ref()) {
            current.copy_from(pending);
        }

        while self.next_pending() {
            if self.is_duplicate() {
                if let (Some(current), Some(pending)) =
                    (self.current.as_mut(), self.pending.as_ref())
                {
                    current.copy_from(pending);
                }
                continue;
            }
            return true;
        }

        self.has_pending = false;
        true
    }

    /// Key at the cursor; empty before the first `advance` and after `close`
    pub fn key(&self) -> &[u8] {
        self.current.as_ref().map(Record::key).unwrap_or_default()
    }

    /// Value at the cursor
    pub fn value(&self) -> &[u8] {
        self.current.as_ref().map(Record::value).unwrap_or_default()
    }

    /// Alias for [`MergeIterator::key`], for data added with `append`
    pub fn data(&self) -> &[u8] {
        self.key()
    }

    /// Failure that stopped the merge, if any
    pub fn err(&self) -> Option<&SortError> {
        self.err.as_ref()
    }

    /// Sections being merged
    pub fn sections(&self) -> &[SectionMeta] {
        self.reader.sections()
    }

    /// Location of the spill file
    pub fn temp_path(&self) -> &std::path::Path {
        self.run_file.path()
    }

    /// Release pooled records, close the reader, and remove the spill file
    /// unless it is kept. Idempotent; a captured merge error stays in `err`.
    pub fn close(&mut self) -> Result<()> {
        if self.state == CursorState::Closed {
            return Ok(());
        }
        self.state = CursorState::Closed;
        self.has_pending = false;

        if let Some(record) = self.current.take() {
            self.pool.release(record);
        }
        if let Some(record) = self.pending.take() {
            self.pool.release(record);
        }
        self.pool.release_all(self.heap.drain());

        self.reader.close()?;
        self.run_file.remove()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn is_duplicate(&self) -> bool {
        match (&self.dedupe, &self.current, &self.pending) {
            (Some(eq), Some(current), Some(pending)) => eq.equal(current.key(), pending.key()),
            _ => false,
        }
    }

    /// Pop the next lookahead and refill the heap from its section
    fn next_pending(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        let Some((section, record)) = self.heap.pop_entry() else {
            return false;
        };

        if let Err(e) = self.fill_heap(section) {
            self.pool.release(record);
            tracing::error!(section, error = %e, "merge stopped on a decode failure");
            self.err = Some(e);
            self.state = CursorState::Errored;
            return false;
        }

        if let Some(prev) = self.pending.replace(record) {
            self.pool.release(prev);
        }
        true
    }

    fn fill_heap(&mut self, section: usize) -> Result<()> {
        if let Some(record) = self.reader.read_next(section)? {
            self.heap.push_entry(section, record);
        }
        Ok(())
    }
}

impl Drop for MergeIterator {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close merge iterator");
        }
    }
}

impl std::fmt::Debug for MergeIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeIterator")
            .field("state", &self.state)
            .field("sections", &self.reader.num_sections())
            .field("heap", &self.heap.len())
            .field("err", &self.err)
            .finish()
    }
}

//! # spillsort
//!
//! External sorting for key/value records that do not fit in memory:
//! - Records buffered in RAM up to a configured threshold
//! - Each full buffer sorted, deduplicated and spilled as one section
//! - Optional per-section compression through pluggable codecs
//! - Lazy k-way merge of all sections through a streaming cursor
//!
//! ## Architecture Overview
//!
//! ```text
//!          put / append
//!               │
//! ┌─────────────▼───────────────┐
//! │           Sorter            │
//! └─────────────┬───────────────┘
//!               │
//!        ┌──────▼──────┐   threshold   ┌─────────────┐
//!        │  RunBuffer  │ ────────────▶ │  RunWriter  │──▶ spill file
//!        │  (Records)  │  sort+dedup   │  (+ codec)  │    (sections)
//!        └─────────────┘               └─────────────┘        │
//!                                                             │ sort()
//!        ┌──────────────┐   ┌────────────┐   ┌────────────┐   │
//! caller ◀ MergeIterator ◀──│ MergeHeap  │◀──│ RunReader  │◀──┘
//!        └──────────────┘   └────────────┘   └────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use spillsort::{Options, Sorter};
//!
//! # fn main() -> spillsort::Result<()> {
//! let options = Options::builder()
//!     .buffer_size(16 * 1024 * 1024)
//!     .dedupe_bytewise()
//!     .build();
//!
//! let mut sorter = Sorter::new(options)?;
//! sorter.put(b"b", b"1")?;
//! sorter.put(b"a", b"1")?;
//! sorter.put(b"b", b"2")?;
//!
//! let mut iter = sorter.sort()?;
//! while iter.advance() {
//!     println!("{:?} = {:?}", iter.key(), iter.value());
//! }
//! if let Some(err) = iter.err() {
//!     eprintln!("merge failed: {}", err);
//! }
//! iter.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod compare;

pub mod record;
pub mod buffer;
pub mod spill;
pub mod merge;
pub mod sorter;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SortError, Result};
pub use config::{Options, OptionsBuilder};
pub use compare::{Bytewise, KeyComparator, KeyEquality, Reversed, SortAlgorithm};
pub use record::{Record, RecordPool};
pub use spill::{Codec, Compression};
pub use merge::MergeIterator;
pub use sorter::Sorter;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of spillsort
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

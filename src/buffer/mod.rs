//! Run Buffer Module
//!
//! In-memory staging area for records before they are spilled.
//!
//! ## Responsibilities
//! - Copy incoming key/value pairs into pooled records
//! - Track key + value bytes for the spill trigger
//! - Sort in place by the configured comparator
//! - Hand every record back to the pool on reset

mod run_buffer;

pub use run_buffer::RunBuffer;

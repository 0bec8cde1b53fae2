//! Error types for spillsort
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using SortError
pub type Result<T> = std::result::Result<T, SortError>;

/// Unified error type for spillsort operations
#[derive(Debug, Error)]
pub enum SortError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Spill File Errors
    // -------------------------------------------------------------------------
    #[error("Section {section} corrupted: {reason}")]
    Corruption { section: usize, reason: String },

    #[error("Record too large: {len} bytes exceeds the u32 frame limit")]
    RecordTooLarge { len: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SortError {
    pub(crate) fn corruption(section: usize, reason: impl Into<String>) -> Self {
        SortError::Corruption {
            section,
            reason: reason.into(),
        }
    }
}

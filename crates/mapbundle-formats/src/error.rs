//! Error types for binary map format parsing.

use thiserror::Error;

/// Result type for bsp/md3 parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing bsp or md3 data.
#[derive(Debug, Error)]
pub enum Error {
    /// The buffer was too short to contain a field at the expected offset.
    #[error("truncated {what}: need at least {needed} bytes, have {actual}")]
    Truncated {
        /// What was being read when the buffer ran out.
        what: &'static str,
        /// Bytes required to read the field.
        needed: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// I/O error while reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

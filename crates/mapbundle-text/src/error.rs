//! Error types for game text parsing.

use thiserror::Error;

/// Result type for game text operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while escaping, tokenizing, or parsing entity text.
#[derive(Debug, Error)]
pub enum Error {
    /// The escaped form contained a byte sequence that isn't valid ASCII.
    #[error("escaped text is not valid ASCII: {0}")]
    NotAscii(#[from] std::string::FromUtf8Error),

    /// A `#hh` escape did not carry two valid hex digits.
    #[error("invalid byte escape: {0}")]
    InvalidEscape(String),
}

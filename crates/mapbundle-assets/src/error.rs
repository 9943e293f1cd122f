//! Error types for pk3 indexing and dependency resolution.

use thiserror::Error;

/// Result type for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while indexing a pk3 archive or resolving
/// dependencies against it.
#[derive(Debug, Error)]
pub enum Error {
    /// The archive itself couldn't be opened or read as a zip.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error while reading archive contents.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source was registered twice in the same `AssetIndex`.
    #[error("source already registered: {0}")]
    DuplicateSource(String),

    /// A `SourceList` entry referenced a source not present in its index.
    #[error("source not registered in asset index: {0}")]
    UnregisteredSource(String),

    /// Attempted to lower a source's priority category via `add_source`.
    #[error("cannot downgrade priority category for source: {0}")]
    PriorityDowngrade(String),
}

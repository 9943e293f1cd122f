//! Error types for the export orchestrator.

use thiserror::Error;

/// Result type for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the orchestrator itself. Per-map and per-archive
/// failures are recorded in a [`crate::logger::Logger`] instead of
/// propagated here; only conditions the run cannot proceed past land here.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error creating, reading, or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A zip archive could not be read or written.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A cached or manifest JSON document failed to parse.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A resource hash couldn't be located in any local directory, the
    /// cache, or via the external fetcher.
    #[error("could not acquire resource '{0}'")]
    Acquisition(String),

    /// Error indexing or resolving assets for a pk3.
    #[error(transparent)]
    Assets(#[from] mapbundle_assets::Error),

    /// Error parsing a binary format.
    #[error(transparent)]
    Formats(#[from] mapbundle_formats::Error),
}

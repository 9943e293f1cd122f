//! The caller-supplied, genuinely blocking operation: acquiring bytes for
//! a content hash from an external mirror.

use std::path::Path;

/// Implemented by the host application to resolve a resource hash to
/// bytes, typically over HTTP. A successful fetch writes `target_path`
/// directly; the implementation is responsible for verifying the content
/// matches `hash` before returning `true`.
pub trait ResourceFetcher {
    /// Attempt to resolve `hash` and write its bytes to `target_path`.
    /// Returns `Ok(true)` on success, `Ok(false)` if no configured source
    /// had it. A successful source should be tried first on the next call.
    fn fetch(&mut self, hash: &str, target_path: &Path) -> std::io::Result<bool>;
}

/// A fetcher with no sources configured; every lookup fails. Used when a
/// run is restricted to local directories and the cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFetcher;

impl ResourceFetcher for NullFetcher {
    fn fetch(&mut self, _hash: &str, _target_path: &Path) -> std::io::Result<bool> {
        Ok(false)
    }
}

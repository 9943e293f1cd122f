//! Resolves a content hash to bytes by checking local directories, then
//! the cache, then falling back to the external fetcher.

use std::path::PathBuf;

use crate::dir::DirectoryHandler;
use crate::error::{Error, Result};
use crate::fetcher::ResourceFetcher;

/// Hash-addressed resource acquisition, shared across an entire run.
pub struct FileImporter<F: ResourceFetcher> {
    /// Directories searched, in order, before falling back to the cache.
    pub local_directories: Vec<DirectoryHandler>,
    cache_dir: DirectoryHandler,
    fetcher: Option<F>,
}

impl<F: ResourceFetcher> FileImporter<F> {
    /// Build an importer rooted at `cache_dir`, optionally backed by a
    /// fetcher for hashes absent from every local directory and the cache.
    #[must_use]
    pub fn new(cache_dir: DirectoryHandler, fetcher: Option<F>) -> Self {
        Self { local_directories: Vec::new(), cache_dir, fetcher }
    }

    /// Resolve `hash` to a path on disk, downloading into the cache if
    /// necessary.
    pub fn get_path(&mut self, hash: &str) -> Result<PathBuf> {
        for directory in &self.local_directories {
            let candidate = directory.get_read_path(hash);
            if candidate.exists() {
                return Ok(candidate);
            }
        }

        let cache_path = self.cache_dir.get_write_path(hash)?;
        if cache_path.exists() {
            return Ok(cache_path);
        }

        if let Some(fetcher) = &mut self.fetcher {
            if fetcher.fetch(hash, &cache_path)? {
                return Ok(cache_path);
            }
        }

        Err(Error::Acquisition(hash.to_string()))
    }

    /// Resolve `hash` and read its full contents.
    pub fn get_data(&mut self, hash: &str) -> Result<Vec<u8>> {
        let path = self.get_path(hash)?;
        Ok(std::fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::NullFetcher;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_from_local_directory_before_cache() {
        let local = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        std::fs::write(local.path().join("abc"), b"hello").unwrap();

        let mut importer = FileImporter::new(DirectoryHandler::new(cache.path()), Some(NullFetcher));
        importer.local_directories.push(DirectoryHandler::new(local.path()));

        assert_eq!(importer.get_data("abc").unwrap(), b"hello");
    }

    #[test]
    fn missing_hash_with_no_fetcher_is_acquisition_error() {
        let cache = tempfile::tempdir().unwrap();
        let mut importer: FileImporter<NullFetcher> = FileImporter::new(DirectoryHandler::new(cache.path()), None);
        assert!(matches!(importer.get_path("missing"), Err(Error::Acquisition(_))));
    }
}

//! Resolves a bsp/aas resource hash to bytes read straight out of an
//! already-indexed source archive, avoiding a second download/copy for
//! content the run already has on disk inside a pk3.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use crate::error::Result;

#[derive(Clone)]
struct Entry {
    pk3_path: PathBuf,
    internal_name: String,
}

/// Registry of `sha256 -> (archive, internal name)` for bsp/aas subfiles
/// already known from indexed source pk3s.
#[derive(Default)]
pub struct FileFromPk3Loader {
    entries: BTreeMap<String, Entry>,
}

impl FileFromPk3Loader {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register that `res_hash` can be read from `pk3_internal_name` inside
    /// the archive at `pk3_path`.
    pub fn add_resource(&mut self, res_hash: &str, pk3_path: PathBuf, pk3_internal_name: String) {
        self.entries.entry(res_hash.to_string()).or_insert(Entry { pk3_path, internal_name: pk3_internal_name });
    }

    /// Read `res_hash`'s bytes, if registered.
    pub fn read(&self, res_hash: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.entries.get(res_hash) else {
            return Ok(None);
        };
        let file = std::fs::File::open(&entry.pk3_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut zip_entry = archive.by_name(&entry.internal_name)?;
        let mut data = Vec::new();
        zip_entry.read_to_end(&mut data)?;
        Ok(Some(data))
    }
}

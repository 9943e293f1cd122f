//! Thin wrapper around a base directory: relative-path reads/writes with
//! on-demand directory creation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Resolves relative paths against a fixed base directory, creating parent
/// directories on first write to each subdirectory.
#[derive(Debug)]
pub struct DirectoryHandler {
    path: PathBuf,
    created_dirs: Mutex<HashSet<PathBuf>>,
}

impl DirectoryHandler {
    /// Root the handler at `path`, which need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), created_dirs: Mutex::new(HashSet::new()) }
    }

    /// The handler's base directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert a relative path to a full path without creating anything.
    #[must_use]
    pub fn get_read_path(&self, rel_path: impl AsRef<Path>) -> PathBuf {
        self.path.join(rel_path)
    }

    /// Convert a relative path to a full path, creating its parent
    /// directory the first time this subdirectory is written to.
    pub fn get_write_path(&self, rel_path: impl AsRef<Path>) -> Result<PathBuf> {
        let full_path = self.path.join(rel_path.as_ref());
        if let Some(parent) = full_path.parent() {
            let mut created = self.created_dirs.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if !created.contains(parent) {
                std::fs::create_dir_all(parent)?;
                created.insert(parent.to_path_buf());
            }
        }
        Ok(full_path)
    }

    /// Read and parse a JSON file, returning `None` if it doesn't exist or
    /// fails to parse.
    #[must_use]
    pub fn read_json<T: DeserializeOwned>(&self, rel_path: impl AsRef<Path>) -> Option<T> {
        let data = std::fs::read(self.get_read_path(rel_path)).ok()?;
        serde_json::from_slice(&data).ok()
    }

    /// Serialize and write a JSON file, creating parent directories as
    /// needed.
    pub fn write_json<T: Serialize>(&self, rel_path: impl AsRef<Path>, value: &T) -> Result<()> {
        let full_path = self.get_write_path(rel_path)?;
        let data = serde_json::to_vec(value)?;
        std::fs::write(full_path, data)?;
        Ok(())
    }

    /// A handler rooted at a subdirectory of this one.
    #[must_use]
    pub fn subdir(&self, rel_path: impl AsRef<Path>) -> Self {
        Self::new(self.path.join(rel_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_then_read_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let handler = DirectoryHandler::new(dir.path());
        handler.write_json("a/b.json", &serde_json::json!({"x": 1})).unwrap();
        let value: serde_json::Value = handler.read_json("a/b.json").unwrap();
        assert_eq!(value, serde_json::json!({"x": 1}));
    }

    #[test]
    fn read_json_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let handler = DirectoryHandler::new(dir.path());
        let value: Option<serde_json::Value> = handler.read_json("missing.json");
        assert!(value.is_none());
    }
}

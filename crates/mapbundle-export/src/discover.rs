//! Scans a directory of `{mod}/{file}.pk3` archives for offline/local
//! tooling, independent of any manifest.

use std::path::{Path, PathBuf};

/// One archive found by [`pk3_files_in_directory`].
#[derive(Debug, Clone)]
pub struct DiscoveredPk3 {
    /// The archive's mod directory (immediate child of the scanned root).
    pub mod_dir: String,
    /// The base filename, without its `.pk3` extension.
    pub filename: String,
    /// Full path to the archive on disk.
    pub full_path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: u64,
}

/// Enumerate `{root}/{mod}/{file}.pk3`, one level of mod directories deep,
/// sorted by `(mod_dir, filename)`.
pub fn pk3_files_in_directory(root: &Path) -> std::io::Result<Vec<DiscoveredPk3>> {
    let mut out = Vec::new();

    for mod_entry in std::fs::read_dir(root)? {
        let mod_entry = mod_entry?;
        if !mod_entry.file_type()?.is_dir() {
            continue;
        }
        let mod_dir = mod_entry.file_name().to_string_lossy().into_owned();

        for file_entry in std::fs::read_dir(mod_entry.path())? {
            let file_entry = file_entry?;
            if !file_entry.file_type()?.is_file() {
                continue;
            }
            let name = file_entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = name.strip_suffix(".pk3").or_else(|| name.strip_suffix(".PK3")) else {
                continue;
            };

            let metadata = file_entry.metadata()?;
            let mtime = metadata.modified().ok().and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok()).map_or(0, |d| d.as_secs());

            out.push(DiscoveredPk3 {
                mod_dir: mod_dir.clone(),
                filename: stem.to_string(),
                full_path: file_entry.path(),
                size: metadata.len(),
                mtime,
            });
        }
    }

    out.sort_by(|a, b| (&a.mod_dir, &a.filename).cmp(&(&b.mod_dir, &b.filename)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_pk3s_one_level_deep_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("baseEF")).unwrap();
        std::fs::write(dir.path().join("baseEF/pak1.pk3"), b"b").unwrap();
        std::fs::write(dir.path().join("baseEF/pak0.pk3"), b"a").unwrap();
        std::fs::write(dir.path().join("baseEF/readme.txt"), b"ignored").unwrap();

        let found = pk3_files_in_directory(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].filename, "pak0");
        assert_eq!(found[1].filename, "pak1");
        assert_eq!(found[0].mod_dir, "baseEF");
    }
}

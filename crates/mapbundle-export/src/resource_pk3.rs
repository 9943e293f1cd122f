//! Wraps a single bsp or aas resource in its own small compressed archive,
//! cached by hash so repeat maps reuse the same file.

use std::io::Write;
use std::path::PathBuf;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::dir::DirectoryHandler;
use crate::error::Result;

/// Which resource kind is being wrapped; selects the cache subdirectory
/// and internal archive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A `.bsp` map file.
    Bsp,
    /// A `.aas` bot navigation file.
    Aas,
}

impl ResourceKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Bsp => "bsp",
            Self::Aas => "aas",
        }
    }
}

/// Build (or reuse, from cache) a one-entry pk3 containing `data` for
/// `resource_hash`. Returns the archive's path and its internal entry name.
pub fn write_resource_pk3(
    cache_dir: &DirectoryHandler,
    resource_hash: &str,
    kind: ResourceKind,
    data: impl FnOnce() -> Result<Vec<u8>>,
) -> Result<(PathBuf, String)> {
    let kind_str = kind.as_str();
    let cache_rel = format!("pk3resource_{kind_str}/{resource_hash}.pk3");
    let internal_name = format!("mapdb_{kind_str}/{resource_hash}.{kind_str}");
    let full_path = cache_dir.get_read_path(&cache_rel);

    if !full_path.exists() {
        let bytes = data()?;
        let write_path = cache_dir.get_write_path(&cache_rel)?;
        let file = std::fs::File::create(&write_path)?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(4));
        writer.start_file(&internal_name, options)?;
        writer.write_all(&bytes)?;
        writer.finish()?;
    }

    Ok((full_path, internal_name))
}

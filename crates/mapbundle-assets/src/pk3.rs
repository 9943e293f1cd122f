//! Pk3 archive indexing: enumerate entries, dispatch per-type extractors,
//! and compute the archive's client-visible identity hash.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use md4::{Digest, Md4};
use mapbundle_formats::{BspData, Md3Data};
use mapbundle_shader::extract_shaders;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::Result;

fn path_matches_single_segment(name: &str, dir: &str, ext: &str) -> bool {
    let lower = name.to_lowercase();
    let Some(rest) = lower.strip_prefix(&format!("{dir}/")) else {
        return false;
    };
    let Some(stem) = rest.strip_suffix(&format!(".{ext}")) else {
        return false;
    };
    !stem.is_empty() && !stem.contains('/') && !stem.contains('\\')
}

fn is_bsp_path(name: &str) -> bool {
    path_matches_single_segment(name, "maps", "bsp")
}

fn is_aas_path(name: &str) -> bool {
    path_matches_single_segment(name, "maps", "aas")
}

fn is_shader_script_path(name: &str) -> bool {
    let lower = name.to_lowercase();
    let Some(rest) = lower.strip_prefix("scripts/") else {
        return false;
    };
    let Some(stem) = rest.strip_suffix(".shader") else {
        return false;
    };
    !stem.contains('/') && !stem.contains('\\')
}

fn is_md3_path(name: &str) -> bool {
    name.to_lowercase().ends_with(".md3")
}

/// One declared shader's verbatim text, as stored in a subfile record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderText {
    /// The shader's re-normalized body text.
    pub text: String,
}

/// Summary of a single archive entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubfileRecord {
    /// The raw entry name as stored in the zip central directory.
    pub python_filename: String,
    /// The display name, decoded and passed through the game's byte escape.
    pub filename: String,
    /// Uncompressed size in bytes.
    pub filesize: u64,
    /// Parsed bsp summary, set only for `maps/*.bsp` entries.
    pub bspinfo: Option<mapbundle_formats::BspInfo>,
    /// Parsed md3 summary, set only for `*.md3` entries.
    pub md3info: Option<mapbundle_formats::Md3Info>,
    /// Declared shaders by lowercased name, set only for `scripts/*.shader` entries.
    pub shaders: Option<BTreeMap<String, ShaderText>>,
    /// Full content SHA-256, set only for bsp and aas entries.
    pub sha256: Option<String>,
    /// Set when this entry failed to parse; no typed payload is set alongside it.
    pub error: Option<String>,
}

/// Summary of an entire pk3 archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pk3Record {
    /// Per-entry summaries, in archive order.
    pub pk3_subfiles: Vec<SubfileRecord>,
    /// The game's archive identity hash, absent only when the archive
    /// itself could not be opened.
    pub pk3_hash: Option<i32>,
    /// Set when the archive as a whole failed to open.
    pub error: Option<String>,
}

fn index_subfile(name_raw: &str, display_name: &str, data: &[u8]) -> SubfileRecord {
    let mut record = SubfileRecord {
        python_filename: name_raw.to_string(),
        filename: display_name.to_string(),
        filesize: data.len() as u64,
        ..Default::default()
    };

    let mut needs_hash = false;
    let result: std::result::Result<(), String> = (|| {
        if is_bsp_path(display_name) {
            record.bspinfo = Some(BspData::parse(data).map_err(|e| e.to_string())?.get_info());
            needs_hash = true;
        }
        if is_aas_path(display_name) {
            needs_hash = true;
        }
        if is_md3_path(display_name) {
            record.md3info = Some(Md3Data::parse(data).map_err(|e| e.to_string())?.get_info());
        }
        if is_shader_script_path(display_name) {
            let text = String::from_utf8_lossy(data);
            let extracted = extract_shaders(&text);
            let mut shaders = BTreeMap::new();
            for shader in extracted.shaders {
                shaders.entry(shader.name.to_lowercase()).or_insert(ShaderText { text: shader.text });
            }
            record.shaders = Some(shaders);
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            if needs_hash {
                use sha2::Digest as _;
                let mut hasher = Sha256::new();
                hasher.update(data);
                record.sha256 = Some(hex::encode(hasher.finalize()));
            }
        }
        Err(e) => record.error = Some(e),
    }

    record
}

/// The game's 32-bit pk3 identity hash: pack every non-empty entry's CRC32
/// little-endian, MD4 the result, XOR the four 32-bit words of the digest,
/// and reinterpret the sum as a signed little-endian integer.
#[must_use]
pub fn pk3_hash(crcs: &[u32]) -> i32 {
    let mut packed = Vec::with_capacity(crcs.len() * 4);
    for crc in crcs {
        packed.extend_from_slice(&crc.to_le_bytes());
    }
    let digest = Md4::digest(&packed);
    let mut xor = 0u32;
    for word in digest.chunks_exact(4) {
        xor ^= u32::from_le_bytes(word.try_into().unwrap_or([0; 4]));
    }
    i32::from_le_bytes(xor.to_le_bytes())
}

/// Index every entry of a pk3 at `path`, computing per-entry summaries and
/// the archive's identity hash.
pub fn index_pk3(path: &Path) -> Result<Pk3Record> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut crcs = Vec::new();
    let mut subfiles = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name_raw = entry.name().to_string();
        if entry.size() > 0 {
            crcs.push(entry.crc32());
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        let display_name = mapbundle_text::escape::import(name_raw.as_bytes(), false);
        subfiles.push(index_subfile(&name_raw, &display_name, &data));
    }

    Ok(Pk3Record { pk3_subfiles: subfiles, pk3_hash: Some(pk3_hash(&crcs)), error: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recognizes_map_and_shader_paths() {
        assert!(is_bsp_path("maps/q3dm1.bsp"));
        assert!(is_bsp_path("MAPS/Q3DM1.BSP"));
        assert!(!is_bsp_path("maps/sub/q3dm1.bsp"));
        assert!(is_aas_path("maps/q3dm1.aas"));
        assert!(is_shader_script_path("scripts/base.shader"));
        assert!(is_md3_path("models/weapon/gun.md3"));
    }

    #[test]
    fn pk3_hash_is_deterministic_function_of_crcs() {
        let a = pk3_hash(&[1, 2, 3]);
        let b = pk3_hash(&[1, 2, 3]);
        let c = pk3_hash(&[3, 2, 1]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

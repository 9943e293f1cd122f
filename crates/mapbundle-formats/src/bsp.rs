//! Quake3-family (v46-style) bsp reader: header, lump directory, shaders,
//! surfaces, fogs, and the entity lump.

use std::collections::BTreeSet;

use byteorder::{ByteOrder, LittleEndian};
use mapbundle_text::{Entities, entity::ImportWarnings};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const LUMP_ENTITIES: usize = 0;
const LUMP_SHADERS: usize = 1;
const LUMP_FOGS: usize = 12;
const LUMP_SURFACES: usize = 13;
const LUMP_COUNT: usize = 17;
const HEADER_LEN: usize = 8 + LUMP_COUNT * 8;

const SHADER_RECORD_LEN: usize = 72;
const FOG_RECORD_LEN: usize = 72;
const SURFACE_RECORD_LEN: usize = 104;
const NAME_LEN: usize = 64;

/// Lump offsets this system zeroes when stripping client-only bsp data.
pub const STRIPPED_LUMPS: [usize; 4] = [11, 12, 14, 15];

fn read_i32(data: &[u8], offset: usize, what: &'static str) -> Result<i32> {
    data.get(offset..offset + 4)
        .map(LittleEndian::read_i32)
        .ok_or(Error::Truncated { what, needed: offset + 4, actual: data.len() })
}

/// `{offset, length}` directory entry for one lump.
#[derive(Debug, Clone, Copy)]
struct Lump {
    file_ofs: i32,
    file_len: i32,
}

impl Lump {
    fn read(data: &[u8], index: usize) -> Result<Self> {
        let base = 8 + index * 8;
        Ok(Self {
            file_ofs: read_i32(data, base, "lump offset")?,
            file_len: read_i32(data, base + 4, "lump length")?,
        })
    }

    fn slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        let start = usize::try_from(self.file_ofs).unwrap_or(0);
        let len = usize::try_from(self.file_len).unwrap_or(0);
        data.get(start..start + len)
            .ok_or(Error::Truncated { what: "lump data", needed: start + len, actual: data.len() })
    }
}

/// Parsed bsp shader, fog, and surface tables plus the raw entity lump.
#[derive(Debug, Clone)]
pub struct BspData {
    /// Shader names declared in lump 1, indexed as stored.
    pub shaders: Vec<String>,
    /// Shader indices (into `shaders`) referenced by surfaces in lump 13.
    pub surface_shader_indices: BTreeSet<i32>,
    /// Shader names declared directly by fogs in lump 12.
    pub fog_shaders: BTreeSet<String>,
    /// Raw bytes of the entity lump (lump 0), still in the game's ASCII form.
    pub entity_bytes: Vec<u8>,
}

/// Serializable summary of a bsp's contents, matching the subfile
/// `bspinfo` record shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BspInfo {
    /// Warnings raised while importing the entity lump.
    pub warnings: Vec<String>,
    /// Entities in their serializable (JSON-ready) form.
    pub entities: serde_json::Value,
    /// Every shader name referenced by a surface or fog, sorted.
    pub shaders: Vec<String>,
}

impl BspData {
    /// Parse the fixed 17-lump directory and the four lumps this system
    /// cares about out of a raw bsp file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::Truncated { what: "bsp header", needed: HEADER_LEN, actual: data.len() });
        }

        let entities_lump = Lump::read(data, LUMP_ENTITIES)?;
        let shaders_lump = Lump::read(data, LUMP_SHADERS)?;
        let fogs_lump = Lump::read(data, LUMP_FOGS)?;
        let surfaces_lump = Lump::read(data, LUMP_SURFACES)?;

        let shader_bytes = shaders_lump.slice(data)?;
        let mut shaders = Vec::with_capacity(shader_bytes.len() / SHADER_RECORD_LEN);
        for record in shader_bytes.chunks_exact(SHADER_RECORD_LEN) {
            shaders.push(mapbundle_text::escape::import(&record[..NAME_LEN], true));
        }

        let fog_bytes = fogs_lump.slice(data)?;
        let mut fog_shaders = BTreeSet::new();
        for record in fog_bytes.chunks_exact(FOG_RECORD_LEN) {
            fog_shaders.insert(mapbundle_text::escape::import(&record[..NAME_LEN], true));
        }

        let surface_bytes = surfaces_lump.slice(data)?;
        let mut surface_shader_indices = BTreeSet::new();
        for record in surface_bytes.chunks_exact(SURFACE_RECORD_LEN) {
            surface_shader_indices.insert(LittleEndian::read_i32(&record[..4]));
        }

        let entity_bytes = entities_lump.slice(data)?.to_vec();

        Ok(Self { shaders, surface_shader_indices, fog_shaders, entity_bytes })
    }

    /// Every shader name a surface or fog references.
    #[must_use]
    pub fn get_shaders(&self) -> BTreeSet<String> {
        let mut shaders: BTreeSet<String> = self
            .surface_shader_indices
            .iter()
            .filter_map(|&index| usize::try_from(index).ok())
            .filter_map(|index| self.shaders.get(index).cloned())
            .collect();
        shaders.extend(self.fog_shaders.iter().cloned());
        shaders
    }

    /// Import the entity lump and build the serializable summary used for
    /// a pk3 subfile's `bspinfo` record.
    #[must_use]
    pub fn get_info(&self) -> BspInfo {
        let (entities, ImportWarnings(warnings)) = Entities::import_text(&self.entity_bytes);
        let warnings = warnings.into_iter().map(|w| format!("entity warning: {w}")).collect();
        let mut shaders: Vec<String> = self.get_shaders().into_iter().collect();
        shaders.sort();
        BspInfo { warnings, entities: entities.export_serializable(), shaders }
    }
}

/// Zero the client-only lumps (lightmaps, light grid, visibility) and
/// rewrite the lump directory with compacted, contiguous offsets.
///
/// Preserves the remaining lumps byte-for-byte and in their original
/// numeric order.
pub fn strip_server_bsp(source: &[u8]) -> Result<Vec<u8>> {
    if source.len() < HEADER_LEN {
        return Err(Error::Truncated { what: "bsp header", needed: HEADER_LEN, actual: source.len() });
    }

    let skip: BTreeSet<usize> = STRIPPED_LUMPS.into_iter().collect();
    let mut header = source[0..8].to_vec();
    let mut data = Vec::new();

    for lump_num in 0..LUMP_COUNT {
        let lump = Lump::read(source, lump_num)?;
        let length = if skip.contains(&lump_num) { 0 } else { lump.file_len };

        let output_offset = data.len() + HEADER_LEN;
        if length > 0 {
            let slice = Lump { file_ofs: lump.file_ofs, file_len: length }.slice(source)?;
            data.extend_from_slice(slice);
        }

        let mut offset_bytes = [0u8; 4];
        LittleEndian::write_i32(&mut offset_bytes, i32::try_from(output_offset).unwrap_or(i32::MAX));
        header.extend_from_slice(&offset_bytes);
        let mut length_bytes = [0u8; 4];
        LittleEndian::write_i32(&mut length_bytes, length);
        header.extend_from_slice(&length_bytes);
    }

    header.extend_from_slice(&data);
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build_minimal_bsp(lump_payloads: &[(usize, Vec<u8>)]) -> Vec<u8> {
        let mut payloads = vec![Vec::new(); LUMP_COUNT];
        for (index, payload) in lump_payloads {
            payloads[*index] = payload.clone();
        }

        let mut data = Vec::new();
        data.extend_from_slice(b"IBSP");
        data.extend_from_slice(&46i32.to_le_bytes());

        let mut body = Vec::new();
        let mut directory = Vec::new();
        for payload in &payloads {
            let offset = HEADER_LEN + body.len();
            directory.extend_from_slice(&(offset as i32).to_le_bytes());
            directory.extend_from_slice(&(payload.len() as i32).to_le_bytes());
            body.extend_from_slice(payload);
        }

        data.extend_from_slice(&directory);
        data.extend_from_slice(&body);
        data
    }

    fn name_record(name: &str, len: usize) -> Vec<u8> {
        let mut record = vec![0u8; len];
        let bytes = name.as_bytes();
        record[..bytes.len()].copy_from_slice(bytes);
        record
    }

    #[test]
    fn parses_shader_and_surface_lumps() {
        let shader_record = name_record("textures/a/b", SHADER_RECORD_LEN);
        let mut surface_record = vec![0u8; SURFACE_RECORD_LEN];
        surface_record[..4].copy_from_slice(&0i32.to_le_bytes());

        let data = build_minimal_bsp(&[
            (LUMP_SHADERS, shader_record),
            (LUMP_SURFACES, surface_record),
        ]);

        let bsp = BspData::parse(&data).unwrap();
        assert_eq!(bsp.shaders, vec!["textures/a/b"]);
        assert_eq!(bsp.get_shaders(), BTreeSet::from(["textures/a/b".to_string()]));
    }

    #[test]
    fn strip_zeroes_client_only_lumps_and_keeps_others() {
        let entity_payload = b"{ \"classname\" \"worldspawn\" }".to_vec();
        let visibility_payload = vec![0xAB; 16];
        let data = build_minimal_bsp(&[(LUMP_ENTITIES, entity_payload.clone()), (15, visibility_payload)]);

        let stripped = strip_server_bsp(&data).unwrap();
        let bsp = BspData::parse(&stripped).unwrap();
        assert_eq!(bsp.entity_bytes, entity_payload);

        let lump15 = Lump::read(&stripped, 15).unwrap();
        assert_eq!(lump15.file_len, 0);
    }
}

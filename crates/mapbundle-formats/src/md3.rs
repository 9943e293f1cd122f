//! Quake3-family md3 model reader: surface shader tables.

use std::collections::BTreeSet;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const HEADER_NUM_SURFACES_OFS: usize = 84;
const HEADER_OFS_SURFACES_OFS: usize = 100;
const SURFACE_NUM_SHADERS_OFS: usize = 76;
const SURFACE_OFS_SHADERS_OFS: usize = 92;
const SURFACE_OFS_END_OFS: usize = 104;
const SHADER_RECORD_LEN: usize = 68;
const NAME_LEN: usize = 64;

fn read_i32(data: &[u8], offset: usize, what: &'static str) -> Result<i32> {
    data.get(offset..offset + 4)
        .map(LittleEndian::read_i32)
        .ok_or(Error::Truncated { what, needed: offset + 4, actual: data.len() })
}

fn read_slice<'a>(data: &'a [u8], start: usize, len: usize, what: &'static str) -> Result<&'a [u8]> {
    data.get(start..start + len)
        .ok_or(Error::Truncated { what, needed: start + len, actual: data.len() })
}

/// Shader names referenced by one surface's shader table.
fn parse_surface(data: &[u8], start: usize) -> Result<(BTreeSet<String>, i32)> {
    let num_shaders = read_i32(data, start + SURFACE_NUM_SHADERS_OFS, "surface shader count")?;
    let ofs_shaders = read_i32(data, start + SURFACE_OFS_SHADERS_OFS, "surface shader table offset")?;
    let ofs_end = read_i32(data, start + SURFACE_OFS_END_OFS, "surface end offset")?;

    let mut shaders = BTreeSet::new();
    for index in 0..num_shaders {
        let ofs = start + usize::try_from(ofs_shaders).unwrap_or(0) + usize::try_from(index).unwrap_or(0) * SHADER_RECORD_LEN;
        let name_bytes = read_slice(data, ofs, NAME_LEN, "surface shader name")?;
        shaders.insert(mapbundle_text::escape::import(name_bytes, true));
    }
    Ok((shaders, ofs_end))
}

/// Shader names referenced across every surface of an md3 model.
#[derive(Debug, Clone, Default)]
pub struct Md3Data {
    /// The union of shader names referenced by any surface.
    pub shaders: BTreeSet<String>,
}

/// Serializable summary matching the subfile `md3info` record shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Md3Info {
    /// Referenced shader names, sorted.
    pub shaders: Vec<String>,
}

impl Md3Data {
    /// Parse every surface's shader table out of a raw md3 file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let num_surfaces = read_i32(data, HEADER_NUM_SURFACES_OFS, "md3 surface count")?;
        let ofs_surfaces = read_i32(data, HEADER_OFS_SURFACES_OFS, "md3 surface table offset")?;

        let mut shaders = BTreeSet::new();
        let mut ofs = usize::try_from(ofs_surfaces).unwrap_or(0);
        for _ in 0..num_surfaces {
            let (surface_shaders, ofs_end) = parse_surface(data, ofs)?;
            shaders.extend(surface_shaders);
            ofs += usize::try_from(ofs_end).unwrap_or(0);
        }

        Ok(Self { shaders })
    }

    /// The serializable summary for this model.
    #[must_use]
    pub fn get_info(&self) -> Md3Info {
        let mut shaders: Vec<String> = self.shaders.iter().cloned().collect();
        shaders.sort();
        Md3Info { shaders }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name_record(name: &str, len: usize) -> Vec<u8> {
        let mut record = vec![0u8; len];
        let bytes = name.as_bytes();
        record[..bytes.len()].copy_from_slice(bytes);
        record
    }

    #[test]
    fn parses_single_surface_single_shader() {
        let mut data = vec![0u8; 200];
        LittleEndian::write_i32(&mut data[HEADER_NUM_SURFACES_OFS..], 1);
        LittleEndian::write_i32(&mut data[HEADER_OFS_SURFACES_OFS..], 100);

        let surface_start = 100;
        LittleEndian::write_i32(&mut data[surface_start + SURFACE_NUM_SHADERS_OFS..], 1);
        LittleEndian::write_i32(&mut data[surface_start + SURFACE_OFS_SHADERS_OFS..], 108);
        LittleEndian::write_i32(&mut data[surface_start + SURFACE_OFS_END_OFS..], 100);

        let shader_record = name_record("models/weapon/gun", SHADER_RECORD_LEN);
        data[surface_start + 108..surface_start + 108 + SHADER_RECORD_LEN].copy_from_slice(&shader_record);

        let md3 = Md3Data::parse(&data).unwrap();
        assert_eq!(md3.shaders, BTreeSet::from(["models/weapon/gun".to_string()]));
    }
}

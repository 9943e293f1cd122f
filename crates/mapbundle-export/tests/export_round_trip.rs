//! End-to-end export run: one pk3 with a single minimal bsp, acquired from
//! a local directory, exported into a fresh output root.

use std::io::Write as _;

use mapbundle_export::{ExportRun, NullFetcher};
use mapbundle_manifest::Manifest;
use serde_json::json;
use sha2::{Digest, Sha256};

const LUMP_COUNT: usize = 17;
const HEADER_LEN: usize = 8 + LUMP_COUNT * 8;

/// Build a minimal valid Quake3 bsp: correct header/lump directory, every
/// lump empty except `lump_payloads`.
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

fn build_pk3_with_bsp(entity_text: &[u8]) -> Vec<u8> {
    const LUMP_ENTITIES: usize = 0;
    let bsp = build_minimal_bsp(&[(LUMP_ENTITIES, entity_text.to_vec())]);

    let mut buf = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buf);
        let mut writer = zip::ZipWriter::new(cursor);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("maps/q3dm1.bsp", options).unwrap();
        writer.write_all(&bsp).unwrap();
        writer.finish().unwrap();
    }
    buf
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[test]
fn exports_a_single_map_from_a_local_directory_pk3() {
    let local_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let pk3_bytes = build_pk3_with_bsp(b"{ \"classname\" \"worldspawn\" }");
    let pk3_hash = sha256_hex(&pk3_bytes);

    std::fs::write(local_dir.path().join(&pk3_hash), &pk3_bytes).unwrap();

    let mut manifest = Manifest::new();
    manifest.import_manifest(&json!({
        "paks": {
            "baseq3/pak0": { "sha256": pk3_hash },
        },
    }));

    ExportRun::run(&manifest, output_dir.path(), &[local_dir.path().to_path_buf()], None::<NullFetcher>).unwrap();

    let mapinfo_path = output_dir.path().join("data/serverdata/servercfg/mapinfo.pk3");
    assert!(mapinfo_path.exists());

    let file = std::fs::File::open(&mapinfo_path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name("mapdb_info/q3dm1.json").unwrap();
    let mut contents = String::new();
    std::io::Read::read_to_string(&mut entry, &mut contents).unwrap();

    let info: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(info["client_bsp"], "q3dm1");
    assert_eq!(info["botsupport"], false);

    let entities_path = output_dir.path().join("data/serverdata/servercfg/mapentities.pk3");
    assert!(entities_path.exists());
}

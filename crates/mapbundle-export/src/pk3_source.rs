//! A single source pk3 registered from the manifest, with its cached
//! index info and derived dependency assets.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mapbundle_assets::{Pk3Record, assets_from_pk3, index_pk3};
use serde_json::Value;

use crate::dir::DirectoryHandler;
use crate::error::Result;
use crate::fetcher::ResourceFetcher;
use crate::importer::FileImporter;
use crate::logger::Logger;

/// One indexed source archive: its location, manifest metadata, and
/// derived asset contributions.
pub struct Pk3Source {
    /// `"<mod_dir>/<filename>"`.
    pub full_name: String,
    /// The directory component of `full_name`.
    pub mod_dir: String,
    /// The file component of `full_name`, without its `.pk3` extension.
    pub filename: String,
    /// Path to the archive on disk (inside the cache or a local directory).
    pub full_path: PathBuf,
    /// The archive's content hash, as declared by the manifest.
    pub res_hash: String,
    /// The manifest's `paks.<full_name>` entry verbatim.
    pub manifest_info: Value,
    /// The game's pk3 identity hash.
    pub pk3_hash: i32,
    info: Pk3Record,
}

impl Pk3Source {
    /// Index `full_path`, reading/writing `cache_dir/pk3info/<sha256>.json`
    /// as a read-through cache around the indexer.
    pub fn new(
        pak_name: &str,
        full_path: PathBuf,
        res_hash: String,
        manifest_info: Value,
        cache_dir: &DirectoryHandler,
    ) -> Result<Self> {
        let (mod_dir, filename) = pak_name
            .split_once('/')
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .unwrap_or_else(|| (String::new(), pak_name.to_string()));

        let cache_rel = format!("pk3info/{res_hash}.json");
        let info: Pk3Record = match cache_dir.read_json(&cache_rel) {
            Some(info) => info,
            None => {
                let info = index_pk3(&full_path)?;
                cache_dir.write_json(&cache_rel, &info)?;
                info
            }
        };
        let pk3_hash = info.pk3_hash.unwrap_or(0);

        Ok(Self { full_name: pak_name.to_string(), mod_dir, filename, full_path, res_hash, manifest_info, pk3_hash, info })
    }

    /// The cached index info for this archive.
    #[must_use]
    pub fn info(&self) -> &Pk3Record {
        &self.info
    }

    /// Group this archive's subfiles into the assets it contributes.
    #[must_use]
    pub fn dependency_assets(&self) -> BTreeMap<String, Vec<mapbundle_assets::Asset>> {
        assets_from_pk3(&self.full_name, &self.info)
    }
}

impl std::fmt::Display for Pk3Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pk3|{}", self.full_name)
    }
}

/// Every source pk3 registered so far, keyed by full name.
#[derive(Default)]
pub struct Pk3Sources {
    /// Indexed sources, in registration order (`full_name` -> source).
    pub pk3s: BTreeMap<String, Pk3Source>,
}

impl Pk3Sources {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every `paks` entry of `manifest` not already loaded. Acquisition
    /// or parse failures are logged as warnings and the pak is skipped.
    pub fn load_from_manifest<F: ResourceFetcher>(
        &mut self,
        paks: &BTreeMap<String, Value>,
        importer: &mut FileImporter<F>,
        cache_dir: &DirectoryHandler,
        logger: &mut Logger,
    ) {
        for (pak_name, manifest_info) in paks {
            if self.pk3s.contains_key(pak_name) {
                continue;
            }

            let Some(hash) = manifest_info.get("sha256").and_then(Value::as_str) else {
                logger.log_warning(format!("pk3 '{pak_name}' missing sha256 in manifest"));
                continue;
            };

            let result = importer
                .get_path(hash)
                .and_then(|path| Pk3Source::new(pak_name, path, hash.to_string(), manifest_info.clone(), cache_dir));

            match result {
                Ok(source) => {
                    self.pk3s.insert(pak_name.clone(), source);
                }
                Err(e) => logger.log_warning(format!("error loading pk3 '{pak_name}' with hash '{hash}': {e}")),
            }
        }
    }
}

//! Ties the indexer, asset model, resolver, patchers, and manifest merger
//! together into the full export pipeline.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::PathBuf;

use mapbundle_assets::{AssetIndex, Dependency, DependencyKind, SourceList, minimum_sources, resolve_dependencies};
use mapbundle_formats::{BspData, BspInfo, strip_server_bsp};
use mapbundle_manifest::Manifest;
use mapbundle_patch::{get_entity_info, patch_music_extensions, patch_q3_key_case, run_entity_edit, EntityEdit};
use mapbundle_text::{Entities, EntityDependencySeeds};
use serde_json::{Value, json};
use tracing::info;

use crate::dir::DirectoryHandler;
use crate::error::Result;
use crate::exporter::FileExporter;
use crate::fetcher::ResourceFetcher;
use crate::file_from_pk3::FileFromPk3Loader;
use crate::importer::FileImporter;
use crate::logger::{Level, Logger};
use crate::pk3_source::{Pk3Source, Pk3Sources};
use crate::resource_pk3::{ResourceKind, write_resource_pk3};

fn string_field(value: &Value, key: &str, default: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or(default).to_string()
}

fn entity_edit_from_value(edit: &Value) -> Option<EntityEdit> {
    let pair = edit.as_array()?;
    let match_fields = pair
        .first()?
        .as_object()
        .map(|m| m.iter().filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string()))).collect())
        .unwrap_or_default();
    let set_fields = pair
        .get(1)?
        .as_object()
        .map(|m| m.iter().filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string()))).collect())
        .unwrap_or_default();
    Some(EntityEdit { match_fields, set_fields })
}

struct ClientPakRef {
    pak_name: String,
    priority: f64,
    download: String,
    pure: String,
    dep_group: Option<i64>,
    pure_sort: Option<String>,
}

fn client_paks_from_cfg(mapcfg: &Value) -> Vec<ClientPakRef> {
    let Some(paks) = mapcfg.get("client_paks").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut out: Vec<ClientPakRef> = paks
        .iter()
        .map(|(pak_name, info)| ClientPakRef {
            pak_name: pak_name.clone(),
            priority: info.get("priority").and_then(Value::as_f64).unwrap_or(0.0),
            download: string_field(info, "download", "auto"),
            pure: string_field(info, "pure", "auto"),
            dep_group: info.get("dep_group").and_then(Value::as_i64),
            pure_sort: info.get("pure_sort").and_then(Value::as_str).map(str::to_string),
        })
        .collect();
    out.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
    out
}

fn write_zip(path: &PathBuf, entries: &[(String, Vec<u8>)]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(name, options)?;
        writer.write_all(data)?;
    }
    writer.finish()?;
    Ok(())
}

/// Holds every piece of mutable state for one export run.
pub struct ExportRun<'a, F: ResourceFetcher> {
    manifest: &'a Manifest,
    cache_dir: DirectoryHandler,
    data_out_dir: DirectoryHandler,
    importer: FileImporter<F>,
    file_from_pk3_loader: FileFromPk3Loader,
    exporter: FileExporter,
    index_logger: Logger,
    warnings_out: Vec<String>,
    unresolved_info_out: Vec<String>,
    asset_index: AssetIndex,
    pk3_sources: Pk3Sources,
    bsp_resources_written: BTreeMap<String, String>,
    aas_resources_written: BTreeMap<String, String>,
    map_duplicate_check: BTreeMap<String, String>,
    map_unreplaced_check: BTreeMap<String, String>,
    entity_entries: Vec<(String, Vec<u8>)>,
    info_entries: Vec<(String, Vec<u8>)>,
    map_log_entries: Vec<(String, String)>,
    mapcfg_entries: Vec<(String, Vec<u8>)>,
}

impl<'a, F: ResourceFetcher> ExportRun<'a, F> {
    /// Run the full export pipeline for `manifest`, writing output under
    /// `output_path`. `local_dirs` are searched for resources before the
    /// cache and fetcher.
    pub fn run(manifest: &'a Manifest, output_path: impl Into<PathBuf>, local_dirs: &[PathBuf], fetcher: Option<F>) -> Result<()> {
        let base_dir = DirectoryHandler::new(output_path.into());
        let cache_dir = base_dir.subdir("cache");
        let data_out_path = base_dir.get_read_path("data_new");
        if data_out_path.exists() {
            std::fs::remove_dir_all(&data_out_path)?;
        }
        let data_out_dir = base_dir.subdir("data_new");

        let mut importer = FileImporter::new(cache_dir.subdir("resources"), fetcher);
        for dir in local_dirs {
            importer.local_directories.push(DirectoryHandler::new(dir.clone()));
        }

        let mut run = Self {
            manifest,
            cache_dir,
            data_out_dir,
            importer,
            file_from_pk3_loader: FileFromPk3Loader::new(),
            exporter: FileExporter::new(base_dir.subdir("data_new")),
            index_logger: Logger::new(),
            warnings_out: Vec::new(),
            unresolved_info_out: Vec::new(),
            asset_index: AssetIndex::new(),
            pk3_sources: Pk3Sources::new(),
            bsp_resources_written: BTreeMap::new(),
            aas_resources_written: BTreeMap::new(),
            map_duplicate_check: BTreeMap::new(),
            map_unreplaced_check: BTreeMap::new(),
            entity_entries: Vec::new(),
            info_entries: Vec::new(),
            map_log_entries: Vec::new(),
            mapcfg_entries: Vec::new(),
        };

        run.execute()?;
        run.finish(&base_dir)
    }

    fn execute(&mut self) -> Result<()> {
        self.pk3_sources.load_from_manifest(&self.manifest.paks, &mut self.importer, &self.cache_dir, &mut self.index_logger);
        self.index_logger.log_info(format!("Indexed {} pk3s", self.pk3_sources.pk3s.len()));

        let names: Vec<String> = self.pk3_sources.pk3s.keys().cloned().collect();
        for name in &names {
            let assets = self.pk3_sources.pk3s[name].dependency_assets();
            self.asset_index.register_assets(name, assets)?;
        }
        self.index_logger.log_info(format!("Initialized pk3 dependency index with {} pk3s", names.len()));
        self.index_logger.log_info(format!("Dependency asset types: {}", self.asset_index.asset_counts_str()));

        for name in &names {
            self.process_source_pk3(name)?;
        }

        self.index_logger.log_info(format!("Written {} maps", self.map_duplicate_check.len()));
        for (map_name, src) in &self.map_unreplaced_check {
            if !self.map_duplicate_check.contains_key(map_name) {
                self.index_logger.log_info(format!("Unreplaced skip/rename: {map_name} - {src}"));
            }
        }

        for (path, entry) in &self.manifest.server_resources {
            let Some(hash) = entry.get("sha256").and_then(Value::as_str) else { continue };
            match self.importer.get_path(hash) {
                Ok(src_path) => {
                    let dst = self.exporter.output_dir().get_write_path(format!("serverdata/{path}"))?;
                    let _ = std::fs::hard_link(&src_path, &dst);
                    self.exporter.write_mirror_resource(hash, &mut self.importer, &format!("server resource - {path}"))?;
                }
                Err(_) => self.index_logger.log_info(format!("Failed to load server resource {path}")),
            }
        }

        Ok(())
    }

    fn process_source_pk3(&mut self, name: &str) -> Result<()> {
        let manifest_info = self.pk3_sources.pk3s[name].manifest_info.clone();
        let profile_name = manifest_info.get("profile").and_then(Value::as_str);
        let mut pk3_mapcfg = self.manifest.merge_map_info(
            &profile_name.and_then(|p| self.manifest.profiles.get(p)).cloned().unwrap_or(Value::Null),
            &Value::Null,
        );
        pk3_mapcfg = self.manifest.merge_map_info(&manifest_info.get("mapcfg").cloned().unwrap_or(Value::Null), &pk3_mapcfg);

        {
            let pk3 = &self.pk3_sources.pk3s[name];
            self.exporter.write_mirror_resource(&pk3.res_hash, &mut self.importer, &format!("source pk3 - {}", pk3.full_name))?;
            self.exporter.write_server(pk3)?;
            if manifest_info.get("force_http_share").and_then(Value::as_bool).unwrap_or(false) {
                self.exporter.write_http(pk3)?;
            }
        }

        let mut aas_table: BTreeMap<String, String> = BTreeMap::new();
        {
            let pk3 = &self.pk3_sources.pk3s[name];
            for subfile in &pk3.info().pk3_subfiles {
                let lower = subfile.filename.to_lowercase();
                let Some(rest) = lower.strip_prefix("maps/") else { continue };
                let Some(map_name) = rest.strip_suffix(".aas") else { continue };
                if subfile.error.is_some() {
                    self.index_logger.log_info(format!("aas file error: {pk3} - {} - {}", subfile.filename, subfile.error.clone().unwrap_or_default()));
                    continue;
                }
                if let Some(sha256) = &subfile.sha256 {
                    self.file_from_pk3_loader.add_resource(sha256, pk3.full_path.clone(), subfile.python_filename.clone());
                    aas_table.insert(map_name.to_string(), sha256.clone());
                }
            }
        }

        let bsp_subfiles: Vec<_> = {
            let pk3 = &self.pk3_sources.pk3s[name];
            pk3.info()
                .pk3_subfiles
                .iter()
                .filter_map(|subfile| {
                    let lower = subfile.filename.to_lowercase();
                    let rest = lower.strip_prefix("maps/")?;
                    let map_name = rest.strip_suffix(".bsp")?;
                    Some((map_name.to_string(), subfile.clone()))
                })
                .collect()
        };

        for (source_bsp_name, subfile) in bsp_subfiles {
            {
                let pk3 = &self.pk3_sources.pk3s[name];
                if subfile.error.is_some() {
                    self.index_logger.log_info(format!(
                        "bsp file error: {pk3} - {} - {}",
                        subfile.filename,
                        subfile.error.clone().unwrap_or_default()
                    ));
                } else if let Some(sha256) = &subfile.sha256 {
                    self.file_from_pk3_loader.add_resource(sha256, pk3.full_path.clone(), subfile.python_filename.clone());
                }
            }

            let mut mapcfg = manifest_info.get(&format!("mapcfg_{source_bsp_name}")).cloned().unwrap_or(json!({}));
            let versions = mapcfg.as_object_mut().and_then(|m| m.remove("versions")).and_then(|v| v.as_array().cloned());
            let versions = versions.unwrap_or_else(|| vec![json!({})]);
            let mapcfg = self.manifest.merge_map_info(&mapcfg, &pk3_mapcfg);

            for version_config in &versions {
                let version_config = self.manifest.merge_map_info(version_config, &mapcfg);
                self.load_map(&source_bsp_name, &version_config, name, &subfile, &aas_table)?;
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn load_map(
        &mut self,
        map_name_in: &str,
        mapcfg: &Value,
        pk3_name: &str,
        subfile: &mapbundle_assets::SubfileRecord,
        aas_table: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut map_name = map_name_in.to_string();

        if mapcfg.get("skip").and_then(Value::as_bool).unwrap_or(false) {
            self.map_unreplaced_check.insert(map_name, pk3_name.to_string());
            return Ok(());
        }
        if let Some(rename) = mapcfg.get("rename").and_then(Value::as_str) {
            self.map_unreplaced_check.insert(map_name.clone(), pk3_name.to_string());
            map_name = rename.to_string();
        }

        if let Some(existing) = self.map_duplicate_check.get(&map_name) {
            self.index_logger.log_warning(format!(
                "duplicate map '{map_name}': skipping version from pk3 '{pk3_name}'; keeping '{existing}'"
            ));
            return Ok(());
        }
        self.map_duplicate_check.insert(map_name.clone(), pk3_name.to_string());

        let mut map_logger = Logger::new();
        let result = self.load_map_inner(&map_name, mapcfg, pk3_name, subfile, aas_table, &mut map_logger);
        if let Err(e) = result {
            map_logger.log_warning(format!("Error processing map '{map_name}': {e}"));
        }

        self.mapcfg_entries.push((format!("mapcfg/{map_name}.json"), serde_json::to_vec_pretty(mapcfg)?));
        self.map_log_entries.push((format!("maps/{map_name}.txt"), map_logger.get_messages(Level::Info).join("\n")));
        self.warnings_out.extend(map_logger.get_messages(Level::Warning).into_iter().map(|line| format!("MAP '{map_name}': {line}")));

        Ok(())
    }

    fn load_map_inner(
        &mut self,
        map_name: &str,
        mapcfg: &Value,
        pk3_name: &str,
        subfile: &mapbundle_assets::SubfileRecord,
        aas_table: &BTreeMap<String, String>,
        map_logger: &mut Logger,
    ) -> Result<()> {
        let (bsp_hash, bsp_info): (String, BspInfo) = if let Some(hash) = mapcfg.get("bsp").and_then(Value::as_str) {
            self.exporter.write_mirror_resource(hash, &mut self.importer, "custom bsp")?;
            let data = self.importer.get_data(hash)?;
            (hash.to_string(), BspData::parse(&data)?.get_info())
        } else {
            let hash = subfile.sha256.clone().unwrap_or_default();
            let info = subfile.bspinfo.clone().unwrap_or_default();
            (hash, info)
        };
        for warning in &bsp_info.warnings {
            map_logger.log_warning(format!("bsp warning: {warning}"));
        }

        let aas_hash: Option<String> = if let Some(hash) = mapcfg.get("aas").and_then(Value::as_str) {
            self.exporter.write_mirror_resource(hash, &mut self.importer, "custom aas")?;
            Some(hash.to_string())
        } else {
            None
        };

        let mut entities = if let Some(hash) = mapcfg.get("ent").and_then(Value::as_str) {
            let text = self.importer.get_data(hash)?;
            self.exporter.write_mirror_resource(hash, &mut self.importer, "custom entities")?;
            Entities::import_text(&text).0
        } else {
            Entities::import_serializable(&bsp_info.entities)
        };

        let mut info_out = serde_json::Map::new();
        info_out.insert("client_bsp".to_string(), Value::String(map_name.to_string()));
        if let Some(fields) = mapcfg.get("server_fields").and_then(Value::as_object) {
            for (key, value) in fields {
                info_out.insert(key.clone(), value.clone());
            }
        }

        map_logger.log_info("processing entities");
        if mapcfg.get("patch_q3_entity_key_case").and_then(Value::as_bool).unwrap_or(false) {
            patch_q3_key_case(&mut entities);
        }
        if let Some(patches) = mapcfg.get("music_extension_patch").and_then(Value::as_object) {
            let patches: BTreeMap<String, bool> =
                patches.iter().filter_map(|(k, v)| Some((k.clone(), v.as_bool()?))).collect();
            patch_music_extensions(&mut entities, &patches);
        }
        if let Some(edits) = mapcfg.get("entity_edit").and_then(Value::as_array) {
            let edits: Vec<EntityEdit> = edits.iter().filter_map(entity_edit_from_value).collect();
            run_entity_edit(&mut entities, &edits);
        }
        map_logger.log_info("");

        let entity_path = format!("mapdb_ent/{map_name}.ent");
        self.entity_entries.push((entity_path.clone(), entities.export_text()));
        info_out.insert("ent_file".to_string(), Value::String(entity_path));

        let entity_info = get_entity_info(&entities);
        info_out.insert("classnames".to_string(), serde_json::to_value(&entity_info.classnames)?);

        if !self.bsp_resources_written.contains_key(&bsp_hash) {
            let hash = bsp_hash.clone();
            let importer = &mut self.importer;
            let loader = &self.file_from_pk3_loader;
            let (resource_pk3, internal_name) = write_resource_pk3(&self.cache_dir, &bsp_hash, ResourceKind::Bsp, || {
                let data = match loader.read(&hash)? {
                    Some(data) => data,
                    None => importer.get_data(&hash)?,
                };
                Ok(strip_server_bsp(&data)?)
            })?;
            let dst = self.exporter.output_dir().get_write_path(format!("serverdata/servercfg/bsp_{bsp_hash}.pk3"))?;
            let _ = std::fs::hard_link(&resource_pk3, &dst);
            self.bsp_resources_written.insert(bsp_hash.clone(), internal_name);
        }
        info_out.insert("bsp_file".to_string(), Value::String(self.bsp_resources_written[&bsp_hash].clone()));

        let aas_hash = aas_hash.or_else(|| aas_table.get(map_name).cloned());
        if let Some(aas_hash) = &aas_hash {
            if !self.aas_resources_written.contains_key(aas_hash) {
                let hash = aas_hash.clone();
                let importer = &mut self.importer;
                let loader = &self.file_from_pk3_loader;
                let (resource_pk3, internal_name) = write_resource_pk3(&self.cache_dir, aas_hash, ResourceKind::Aas, || {
                    match loader.read(&hash)? {
                        Some(data) => Ok(data),
                        None => Ok(importer.get_data(&hash)?),
                    }
                })?;
                let dst = self.exporter.output_dir().get_write_path(format!("serverdata/servercfg/aas_{aas_hash}.pk3"))?;
                let _ = std::fs::hard_link(&resource_pk3, &dst);
                self.aas_resources_written.insert(aas_hash.clone(), internal_name);
            }
            info_out.insert("aas_file".to_string(), Value::String(self.aas_resources_written[aas_hash].clone()));
            info_out.insert("botsupport".to_string(), Value::Bool(true));
        } else {
            info_out.insert("botsupport".to_string(), Value::Bool(false));
        }

        let manifest_paks = client_paks_from_cfg(mapcfg);
        let mut client_paks_added = BTreeSet::new();
        let mut client_paks_temp = Vec::new();
        for mut client_pak in manifest_paks {
            if client_pak.pak_name == "*map_pak" {
                client_pak.pak_name = pk3_name.to_string();
            }
            if !client_paks_added.insert(client_pak.pak_name.clone()) {
                continue;
            }
            if !self.pk3_sources.pk3s.contains_key(&client_pak.pak_name) {
                map_logger.log_warning(format!("referenced unindexed pk3 '{}'", client_pak.pak_name));
                continue;
            }
            client_paks_temp.push(client_pak);
        }

        let mut source_list = SourceList::new(&self.asset_index);
        for client_pak in &client_paks_temp {
            if let Some(category) = client_pak.dep_group {
                source_list.add_source(&client_pak.pak_name, category)?;
            }
        }

        let seeds = build_dependency_seeds(&bsp_info, &entities);
        let pool = resolve_dependencies(&source_list, &seeds);
        for warning in pool.log_dependencies() {
            map_logger.log_warning(format!("dependency warning: {warning}"));
        }
        let needed_sources: BTreeSet<String> = minimum_sources(&source_list, &pool).into_iter().collect();

        let unresolved = pool.get_unsatisfied();
        for dep in &unresolved {
            self.unresolved_info_out.push(format!("{map_name}: {dep}"));
        }
        if !unresolved.is_empty() {
            map_logger.log_info(format!("{} unresolved dependencies", unresolved.len()));
        }

        let mut client_paks_out = Vec::new();
        for client_pak in &client_paks_temp {
            let referenced = needed_sources.contains(&client_pak.pak_name);
            let download = client_pak.download == "yes" || (client_pak.download == "auto" && referenced);
            let pure = client_pak.pure == "yes" || (client_pak.pure == "auto" && referenced);
            if !download && !pure {
                continue;
            }

            let client_pk3 = &self.pk3_sources.pk3s[&client_pak.pak_name];
            let mut result = serde_json::Map::new();
            result.insert("pk3_name".to_string(), Value::String(client_pak.pak_name.clone()));
            result.insert("pk3_hash".to_string(), Value::from(client_pk3.pk3_hash));
            result.insert(
                "pk3_source_path".to_string(),
                Value::String(format!("{}/refonly/{}.pk3", client_pk3.mod_dir, client_pk3.filename)),
            );
            result.insert("download".to_string(), Value::Bool(download));
            if let Some(sort) = &client_pak.pure_sort {
                result.insert("pure_sort".to_string(), Value::String(sort.clone()));
            }
            client_paks_out.push(Value::Object(result));

            if download {
                self.exporter.write_http(client_pk3)?;
            }
        }
        info_out.insert("client_paks".to_string(), Value::Array(client_paks_out));

        self.info_entries.push((format!("mapdb_info/{map_name}.json"), serde_json::to_vec(&Value::Object(info_out))?));
        info!(map = map_name, "processed map");
        Ok(())
    }

    fn finish(mut self, base_dir: &DirectoryHandler) -> Result<()> {
        self.warnings_out.extend(self.index_logger.get_messages(Level::Warning));

        let mut log_entries = Vec::new();
        log_entries.push(("index.txt".to_string(), self.index_logger.get_messages(Level::Info).join("\n").into_bytes()));
        log_entries.push(("download.txt".to_string(), Vec::new()));
        log_entries.push(("mirror_resources.txt".to_string(), self.exporter.get_mirror_resource_log().into_bytes()));
        log_entries.push(("warnings.txt".to_string(), self.warnings_out.join("\n").into_bytes()));
        log_entries.push(("unresolved.txt".to_string(), self.unresolved_info_out.join("\n").into_bytes()));
        for (name, text) in self.map_log_entries {
            log_entries.push((name, text.into_bytes()));
        }
        log_entries.extend(self.mapcfg_entries);

        write_zip(&self.exporter.output_dir().get_write_path("logs.zip")?, &log_entries)?;
        write_zip(&self.exporter.output_dir().get_write_path("serverdata/servercfg/mapinfo.pk3")?, &self.info_entries)?;
        write_zip(&self.exporter.output_dir().get_write_path("serverdata/servercfg/mapentities.pk3")?, &self.entity_entries)?;

        let data_old = base_dir.get_read_path("data_old");
        if data_old.exists() {
            std::fs::remove_dir_all(&data_old)?;
        }
        let data_dir = base_dir.get_read_path("data");
        if data_dir.exists() {
            std::fs::rename(&data_dir, &data_old)?;
        }
        std::fs::rename(self.exporter.output_dir().path(), &data_dir)?;

        Ok(())
    }
}

fn build_dependency_seeds(bsp_info: &BspInfo, entities: &Entities) -> Vec<Dependency> {
    let mut seeds = Vec::new();
    for shader in &bsp_info.shaders {
        seeds.push(Dependency::new(DependencyKind::Shader, shader, false));
    }
    let entity_seeds = EntityDependencySeeds::extract(entities);
    for sound in &entity_seeds.sounds {
        seeds.push(Dependency::new(DependencyKind::Sound, sound, false));
    }
    for model in &entity_seeds.models {
        seeds.push(Dependency::new(DependencyKind::Model, model, false));
    }
    seeds
}

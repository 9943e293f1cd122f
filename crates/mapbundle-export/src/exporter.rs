//! Writes resources into the output directory layout, hard-linking from
//! wherever the content was acquired.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::dir::DirectoryHandler;
use crate::error::Result;
use crate::fetcher::ResourceFetcher;
use crate::importer::FileImporter;
use crate::pk3_source::Pk3Source;

fn link_or_copy(src: &std::path::Path, dst: &std::path::Path) -> std::io::Result<()> {
    match std::fs::hard_link(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(_) => std::fs::copy(src, dst).map(|_| ()),
    }
}

/// Writes every output file under `data_new/`, deduplicating repeat
/// writes of the same source or resource.
pub struct FileExporter {
    output_dir: DirectoryHandler,
    server_written: HashSet<String>,
    http_written: HashSet<String>,
    mirror_written: BTreeMap<String, BTreeSet<String>>,
}

impl FileExporter {
    /// Create an exporter rooted at `output_dir`.
    #[must_use]
    pub fn new(output_dir: DirectoryHandler) -> Self {
        Self { output_dir, server_written: HashSet::new(), http_written: HashSet::new(), mirror_written: BTreeMap::new() }
    }

    /// Hard-link a source archive to `serverdata/<mod>/refonly/<file>.pk3`.
    pub fn write_server(&mut self, pk3: &Pk3Source) -> Result<()> {
        if self.server_written.insert(pk3.full_name.clone()) {
            let dst = self.output_dir.get_write_path(format!("serverdata/{}/refonly/{}.pk3", pk3.mod_dir, pk3.filename))?;
            link_or_copy(&pk3.full_path, &dst)?;
        }
        Ok(())
    }

    /// Hard-link a source archive to `httpshare/paks/<mod>/<file>.pk3`.
    pub fn write_http(&mut self, pk3: &Pk3Source) -> Result<()> {
        if self.http_written.insert(pk3.full_name.clone()) {
            let dst = self.output_dir.get_write_path(format!("httpshare/paks/{}/{}.pk3", pk3.mod_dir, pk3.filename))?;
            link_or_copy(&pk3.full_path, &dst)?;
        }
        Ok(())
    }

    /// Hard-link the content addressed by `res_hash` to
    /// `httpshare/resources/<hash>`, tracking `description` for the log.
    pub fn write_mirror_resource<F: ResourceFetcher>(
        &mut self,
        res_hash: &str,
        importer: &mut FileImporter<F>,
        description: &str,
    ) -> Result<()> {
        if !self.mirror_written.contains_key(res_hash) {
            let src_path = importer.get_path(res_hash)?;
            let dst = self.output_dir.get_write_path(format!("httpshare/resources/{res_hash}"))?;
            link_or_copy(&src_path, &dst)?;
        }
        self.mirror_written.entry(res_hash.to_string()).or_default().insert(description.to_string());
        Ok(())
    }

    /// One `<hash> - [descriptions...]` line per mirrored resource.
    #[must_use]
    pub fn get_mirror_resource_log(&self) -> String {
        self.mirror_written
            .iter()
            .map(|(hash, descriptions)| {
                let list: Vec<&str> = descriptions.iter().map(String::as_str).collect();
                format!("{hash} - {list:?}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The output directory this exporter writes into.
    #[must_use]
    pub fn output_dir(&self) -> &DirectoryHandler {
        &self.output_dir
    }
}

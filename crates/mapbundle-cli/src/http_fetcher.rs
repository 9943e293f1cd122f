//! A [`mapbundle_export::ResourceFetcher`] backed by a list of HTTP URL
//! templates, tried in order with the winning template promoted to the
//! front for subsequent lookups.

use std::path::Path;

use mapbundle_export::ResourceFetcher;
use sha2::{Digest, Sha256};

/// Fetches resources over HTTP from an ordered list of `…{hash}…` URL
/// templates, verifying each download's SHA-256 before accepting it.
pub struct HttpFetcher {
    templates: Vec<String>,
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Build a fetcher trying `templates` in order. Each must contain the
    /// literal substring `{hash}`.
    #[must_use]
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates, client: reqwest::blocking::Client::new() }
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&mut self, hash: &str, target_path: &Path) -> std::io::Result<bool> {
        for index in 0..self.templates.len() {
            let url = self.templates[index].replace("{hash}", hash);

            let response = match self.client.get(&url).send() {
                Ok(resp) if resp.status().is_success() => resp,
                _ => {
                    tracing::debug!(url, "resource fetch attempt failed");
                    continue;
                }
            };
            let Ok(bytes) = response.bytes() else {
                continue;
            };

            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            let digest = hex::encode(hasher.finalize());
            if digest != hash.to_lowercase() {
                tracing::warn!(url, expected = hash, actual = digest, "fetched content hash mismatch");
                continue;
            }

            let tmp_path = target_path.with_extension("tmp");
            std::fs::write(&tmp_path, &bytes)?;
            std::fs::rename(&tmp_path, target_path)?;

            self.templates.swap(0, index);
            return Ok(true);
        }

        Ok(false)
    }
}

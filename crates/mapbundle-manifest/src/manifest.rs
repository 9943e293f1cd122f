//! Accumulates manifest data across one or more loaded manifest files and
//! resolves a map's effective configuration from profiles and overrides.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::warn;

use crate::merge::update_delete_null;

/// Fields merged key-by-key rather than wholesale replaced, both when
/// importing a manifest's profile and when merging per-map config.
const FIELD_MERGED_FIELDS: &[&str] = &["client_paks", "server_fields", "music_extension_patch"];

/// Accumulated manifest state: resource mirrors, named profiles, indexed
/// source pk3s, and extra server resources. Later `import_manifest` calls
/// take precedence over earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// HTTP mirror base URLs, each containing a `{hash}` placeholder.
    pub resource_urls: BTreeSet<String>,
    /// Named reusable map-config profiles, referenced via `"import"`.
    pub profiles: BTreeMap<String, Value>,
    /// Indexed source pk3s by `"<mod_dir>/<filename>"`, each carrying its
    /// manifest-declared `sha256`, `profile`, `mapcfg_*` overrides, etc.
    pub paks: BTreeMap<String, Value>,
    /// Extra files placed under `serverdata/<path>`, each naming a `sha256`.
    pub server_resources: BTreeMap<String, Value>,
}

fn object_field<'a>(data: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    data.get(key).and_then(Value::as_object)
}

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one manifest document into the accumulated state. `resource_urls`
    /// accumulate; `paks`/`server_resources` are merged key-by-key with
    /// [`update_delete_null`]; each profile's `client_paks`/`server_fields`/
    /// `music_extension_patch` sub-dicts are merged key-by-key, every other
    /// profile field is replaced wholesale.
    pub fn import_manifest(&mut self, data: &Value) {
        if let Some(urls) = data.get("resource_urls").and_then(Value::as_array) {
            self.resource_urls.extend(urls.iter().filter_map(Value::as_str).map(str::to_string));
        }

        if let Some(paks) = object_field(data, "paks") {
            let mut target = paks_to_map(&self.paks);
            update_delete_null(paks, &mut target);
            self.paks = map_to_paks(target);
        }
        if let Some(resources) = object_field(data, "server_resources") {
            let mut target = paks_to_map(&self.server_resources);
            update_delete_null(resources, &mut target);
            self.server_resources = map_to_paks(target);
        }

        if let Some(profiles) = object_field(data, "profiles") {
            for (profile_name, profile) in profiles {
                let Some(profile_fields) = profile.as_object() else {
                    continue;
                };
                let entry = self.profiles.entry(profile_name.clone()).or_insert_with(|| Value::Object(Map::new()));
                let Value::Object(out) = entry else {
                    continue;
                };
                for (key, value) in profile_fields {
                    if FIELD_MERGED_FIELDS.contains(&key.as_str()) {
                        let sub = out.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()));
                        let Value::Object(sub_map) = sub else {
                            continue;
                        };
                        if let Some(value_map) = value.as_object() {
                            for (k, v) in value_map {
                                sub_map.insert(k.clone(), v.clone());
                            }
                        }
                    } else {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
        }
    }

    /// Merge `new_info` on top of `old_info`: a `purge_all: true` in
    /// `new_info` clears `old_info` first; an `"import": "<profile>"`
    /// recursively merges that named profile underneath; each
    /// [`FIELD_MERGED_FIELDS`] entry is merged key-by-key (or dropped
    /// wholesale via `purge_<field>: true`) rather than replaced; every
    /// other field in `new_info` overwrites `old_info` wholesale.
    #[must_use]
    pub fn merge_map_info(&self, new_info: &Value, old_info: &Value) -> Value {
        let mut output = old_info.as_object().cloned().unwrap_or_default();
        let mut new_info = new_info.as_object().cloned().unwrap_or_default();

        if new_info.remove("purge_all").and_then(|v| v.as_bool()).unwrap_or(false) {
            output.clear();
        }

        if let Some(profile_name) = new_info.remove("import").and_then(|v| v.as_str().map(str::to_string)) {
            let Some(profile) = self.profiles.get(&profile_name) else {
                warn!("merge_map_info: unknown profile '{profile_name}'");
                return Value::Object(output);
            };
            output = self.merge_map_info(profile, &Value::Object(output)).as_object().cloned().unwrap_or_default();
        }

        for field in FIELD_MERGED_FIELDS {
            if new_info.remove(&format!("purge_{field}")).and_then(|v| v.as_bool()).unwrap_or(false) {
                output.remove(*field);
            }
            if let Some(data) = new_info.remove(*field) {
                if let Some(data_map) = data.as_object() {
                    let entry = output.entry((*field).to_string()).or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(tgt) = entry {
                        update_delete_null(data_map, tgt);
                    }
                }
            }
        }

        for (key, value) in new_info {
            output.insert(key, value);
        }

        Value::Object(output)
    }
}

fn paks_to_map(paks: &BTreeMap<String, Value>) -> Map<String, Value> {
    paks.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn map_to_paks(map: Map<String, Value>) -> BTreeMap<String, Value> {
    map.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn import_manifest_accumulates_resource_urls() {
        let mut m = Manifest::new();
        m.import_manifest(&json!({"resource_urls": ["https://a/{hash}"]}));
        m.import_manifest(&json!({"resource_urls": ["https://b/{hash}"]}));
        assert_eq!(m.resource_urls.len(), 2);
    }

    #[test]
    fn import_manifest_merges_profile_subdicts() {
        let mut m = Manifest::new();
        m.import_manifest(&json!({"profiles": {"p1": {"client_paks": {"a/pak0": {"priority": 1}}}}}));
        m.import_manifest(&json!({"profiles": {"p1": {"client_paks": {"b/pak0": {"priority": 2}}}}}));
        let client_paks = m.profiles["p1"]["client_paks"].as_object().unwrap();
        assert_eq!(client_paks.len(), 2);
    }

    #[test]
    fn merge_map_info_purge_all_clears_old() {
        let m = Manifest::new();
        let old = json!({"skip": true});
        let new = json!({"purge_all": true, "rename": "q3dm1"});
        let merged = m.merge_map_info(&new, &old);
        assert_eq!(merged, json!({"rename": "q3dm1"}));
    }

    #[test]
    fn merge_map_info_merges_fields_not_replaces() {
        let m = Manifest::new();
        let old = json!({"client_paks": {"a/pak0": {"priority": 1}}});
        let new = json!({"client_paks": {"b/pak0": {"priority": 2}}});
        let merged = m.merge_map_info(&new, &old);
        assert_eq!(merged["client_paks"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn merge_map_info_resolves_import() {
        let mut m = Manifest::new();
        m.profiles.insert("base".to_string(), json!({"server_fields": {"timelimit": "20"}}));
        let new = json!({"import": "base"});
        let merged = m.merge_map_info(&new, &Value::Null);
        assert_eq!(merged["server_fields"]["timelimit"], "20");
    }
}

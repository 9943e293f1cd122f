//! Case-preserving, multi-valued entity key/value store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::escape;
use crate::tokenizer::Tokenizer;

/// One `(original-case key, value)` pair stored under a lowercased key.
pub type CaseValue = Vec<(String, String)>;

/// A single entity: a mapping from lowercased key to an ordered list of
/// case-preserving `(key, value)` pairs. The game consumes the first pair
/// for a given lowercased key, so insertion order matters — fields are
/// kept in a `Vec` rather than a sorted map so that order survives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entity {
    fields: Vec<(String, CaseValue)>,
}

impl Entity {
    /// Create an empty entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`. When `overwrite` is true, any existing pairs
    /// under `lower(key)` are dropped first. Otherwise a pair is appended
    /// only if no pair with the same original-case key already exists.
    pub fn set(&mut self, key: &str, value: &str, overwrite: bool) {
        let lower = key.to_lowercase();
        if overwrite {
            self.fields.retain(|(k, _)| *k != lower);
        }
        if let Some((_, case_value)) = self.fields.iter_mut().find(|(k, _)| *k == lower) {
            if case_value.iter().any(|(k, _)| k == key) {
                return;
            }
            case_value.push((key.to_string(), value.to_string()));
        } else {
            self.fields.push((lower, vec![(key.to_string(), value.to_string())]));
        }
    }

    /// Retrieve the value for `key`. Without `case_sensitive`, returns the
    /// first pair's value for `lower(key)`. With it, returns the value of
    /// the pair whose original-case key matches `key` exactly, if any.
    #[must_use]
    pub fn get(&self, key: &str, case_sensitive: bool) -> Option<&str> {
        let lower = key.to_lowercase();
        let case_value = &self.fields.iter().find(|(k, _)| *k == lower)?.1;
        if case_value.is_empty() {
            return None;
        }
        if case_sensitive {
            case_value
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        } else {
            Some(case_value[0].1.as_str())
        }
    }

    /// Convenience accessor returning an owned default when absent.
    #[must_use]
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key, false).unwrap_or(default).to_string()
    }

    /// Whether any value is stored for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key, false).is_some()
    }

    /// Iterate lowercased keys in insertion order, each with its case pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CaseValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serializable form: a bare string when the sole pair's case matches
    /// the lowercased key, otherwise a list of `[case, value]` pairs.
    #[must_use]
    pub fn export_serializable(&self) -> Value {
        let mut out = serde_json::Map::new();
        for (key, case_value) in &self.fields {
            if case_value.is_empty() {
                continue;
            }
            if case_value.len() == 1 && &case_value[0].0 == key {
                out.insert(key.clone(), Value::String(case_value[0].1.clone()));
            } else {
                let pairs: Vec<Value> = case_value
                    .iter()
                    .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), Value::String(v.clone())]))
                    .collect();
                out.insert(key.clone(), Value::Array(pairs));
            }
        }
        Value::Object(out)
    }

    /// Load fields from the format produced by [`Entity::export_serializable`].
    #[must_use]
    pub fn import_serializable(data: &Value) -> Self {
        let mut entity = Self::new();
        if let Value::Object(map) = data {
            for (key, value) in map {
                let lower = key.to_lowercase();
                let case_value = match value {
                    Value::String(s) => vec![(key.clone(), s.clone())],
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|item| {
                            let arr = item.as_array()?;
                            let k = arr.first()?.as_str()?.to_string();
                            let v = arr.get(1)?.as_str()?.to_string();
                            Some((k, v))
                        })
                        .collect(),
                    _ => continue,
                };
                entity.fields.push((lower, case_value));
            }
        }
        entity
    }
}

/// Warnings accumulated while importing entity text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportWarnings(pub Vec<String>);

/// An ordered sequence of entities, conventionally worldspawn first.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    /// The entities in file order.
    pub entities: Vec<Entity>,
}

impl Entities {
    /// Create an empty entity list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializable form of the whole list.
    #[must_use]
    pub fn export_serializable(&self) -> Value {
        Value::Array(self.entities.iter().map(Entity::export_serializable).collect())
    }

    /// Load from the format produced by [`Entities::export_serializable`].
    #[must_use]
    pub fn import_serializable(data: &Value) -> Self {
        let entities = data
            .as_array()
            .map(|items| items.iter().map(Entity::import_serializable).collect())
            .unwrap_or_default();
        Self { entities }
    }

    /// Import entities from the game's raw `{ "key" "value" ... }` text
    /// format, wrapped in the byte escape. Parsing stops at the first
    /// structural error, returning whatever was parsed plus warnings.
    #[must_use]
    pub fn import_text(text: &[u8]) -> (Self, ImportWarnings) {
        let mut warnings = Vec::new();
        let escaped = escape::import(text, false);
        let mut tok = Tokenizer::new(&escaped);
        let mut entities = Vec::new();

        loop {
            let token = tok.parse_ext(true);
            let completed = token.is_empty() && tok.completed();
            if completed {
                break;
            }
            if !token.starts_with('{') {
                warnings.push(format!("found '{token}' when expecting {{"));
                return (Self { entities }, ImportWarnings(warnings));
            }

            let mut entity = Entity::new();
            loop {
                let keyname = tok.parse_ext(true);
                let key_completed = keyname.is_empty() && tok.completed();
                if key_completed {
                    warnings.push("EOF without closing brace 1".to_string());
                    return (Self { entities }, ImportWarnings(warnings));
                }
                if keyname.starts_with('}') {
                    break;
                }

                let value = tok.parse_ext(true);
                let value_completed = value.is_empty() && tok.completed();
                if value_completed {
                    warnings.push("EOF without closing brace 2".to_string());
                    return (Self { entities }, ImportWarnings(warnings));
                }
                if value.starts_with('}') {
                    warnings.push("closing brace without data".to_string());
                    return (Self { entities }, ImportWarnings(warnings));
                }

                let (keyname, value) = if keyname.contains('"') || value.contains('"') {
                    warnings.push(format!("field '{keyname}' - '{value}' contains quote character"));
                    (keyname.replace('"', ""), value.replace('"', ""))
                } else {
                    (keyname, value)
                };

                entity.set(&keyname, &value, false);
            }
            entities.push(entity);
        }

        (Self { entities }, ImportWarnings(warnings))
    }

    /// Export entities back to the game's raw text format.
    #[must_use]
    pub fn export_text(&self) -> Vec<u8> {
        let mut lines = Vec::new();
        for entity in &self.entities {
            lines.push("{".to_string());
            for (_, case_value) in &entity.fields {
                for (key, value) in case_value {
                    lines.push(format!("\"{key}\" \"{value}\""));
                }
            }
            lines.push("}".to_string());
        }
        escape::export(&lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_get_roundtrip() {
        let mut e = Entity::new();
        e.set("Classname", "info_player_start", true);
        assert_eq!(e.get("classname", false), Some("info_player_start"));
    }

    #[test]
    fn set_without_overwrite_keeps_first_of_same_case() {
        let mut e = Entity::new();
        e.set("key", "first", true);
        e.set("key", "second", false);
        assert_eq!(e.get("key", false), Some("first"));
    }

    #[test]
    fn set_without_overwrite_appends_new_case_variant() {
        let mut e = Entity::new();
        e.set("Key", "first", true);
        e.set("KEY", "second", false);
        assert_eq!(e.get("key", false), Some("first"));
        assert_eq!(e.get("KEY", true), Some("second"));
    }

    #[test]
    fn import_export_text_round_trips() {
        let text = b"{\n\"classname\" \"worldspawn\"\n\"music\" \"track.wav\"\n}\n";
        let (entities, warnings) = Entities::import_text(text);
        assert!(warnings.0.is_empty());
        assert_eq!(entities.entities.len(), 1);
        assert_eq!(entities.entities[0].get("classname", false), Some("worldspawn"));
        let exported = entities.export_text();
        let (reimported, _) = Entities::import_text(&exported);
        assert_eq!(reimported.entities[0].get("music", false), Some("track.wav"));
    }

    #[test]
    fn serializable_round_trip() {
        let mut e = Entity::new();
        e.set("Classname", "worldspawn", true);
        let value = e.export_serializable();
        let back = Entity::import_serializable(&value);
        assert_eq!(back.get("classname", false), Some("worldspawn"));
    }

    #[test]
    fn unterminated_block_emits_warning() {
        let text = b"{\n\"classname\" \"worldspawn\"\n";
        let (entities, warnings) = Entities::import_text(text);
        assert!(entities.entities.is_empty());
        assert!(!warnings.0.is_empty());
    }

    #[test]
    fn export_text_preserves_insertion_order_not_sorted_order() {
        let text = b"{\n\"zz_last\" \"z\"\n\"aa_first\" \"a\"\n}\n";
        let (entities, _) = Entities::import_text(text);
        let exported = entities.export_text();
        let exported = String::from_utf8(exported).unwrap();
        let zz_pos = exported.find("zz_last").unwrap();
        let aa_pos = exported.find("aa_first").unwrap();
        assert!(zz_pos < aa_pos, "expected 'zz_last' to stay before 'aa_first':\n{exported}");
    }
}

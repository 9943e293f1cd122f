//! Patch worldspawn's `music` field to reference a profile's preferred
//! file extensions.

use std::collections::BTreeMap;

use mapbundle_text::{Entities, Tokenizer};

use crate::path::{convert_fs_path, strip_ext};

/// Substitute `music_start`/`music_loop` references in the first (worldspawn)
/// entity's `music` field with entries from `patches`, keyed by the
/// extension-stripped, fs-normalized path they replace. Disabled (`false`)
/// patch entries are never substituted.
pub fn patch_music_extensions(entities: &mut Entities, patches: &BTreeMap<String, bool>) {
    let subst: BTreeMap<String, String> = patches
        .iter()
        .filter(|(_, enabled)| **enabled)
        .map(|(patch, _)| (strip_ext(&convert_fs_path(patch)), patch.clone()))
        .collect();

    let patch_path = |path: &str| -> String {
        let key = strip_ext(&convert_fs_path(path));
        subst.get(&key).cloned().unwrap_or_else(|| path.to_string())
    };

    let Some(worldspawn) = entities.entities.first() else {
        return;
    };
    let Some(music_str) = worldspawn.get("music", false) else {
        return;
    };
    if music_str.is_empty() {
        return;
    }
    let music_str = music_str.to_string();

    let mut tok = Tokenizer::new(&music_str);
    let music_start = tok.parse_ext(true);
    let music_loop = tok.parse_ext(true);

    let patched_start = patch_path(&music_start);
    let patched_loop = if music_loop.is_empty() { String::new() } else { patch_path(&music_loop) };

    if patched_start != music_start || (!music_loop.is_empty() && patched_loop != music_loop) {
        let mut new_str = patched_start;
        if !music_loop.is_empty() {
            new_str.push(' ');
            new_str.push_str(&patched_loop);
        }
        entities.entities[0].set("music", &new_str, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn substitutes_enabled_patch_only() {
        let mut entities = Entities::new();
        let mut worldspawn = mapbundle_text::Entity::new();
        worldspawn.set("classname", "worldspawn", true);
        worldspawn.set("music", "music/track.wav music/track.wav", true);
        entities.entities.push(worldspawn);

        let mut patches = BTreeMap::new();
        patches.insert("music/track.ogg".to_string(), true);
        patches.insert("music/other.ogg".to_string(), false);

        patch_music_extensions(&mut entities, &patches);
        assert_eq!(entities.entities[0].get("music", false), Some("music/track.ogg music/track.ogg"));
    }

    #[test]
    fn leaves_music_untouched_when_no_patch_matches() {
        let mut entities = Entities::new();
        let mut worldspawn = mapbundle_text::Entity::new();
        worldspawn.set("music", "music/track.wav", true);
        entities.entities.push(worldspawn);

        let patches = BTreeMap::new();
        patch_music_extensions(&mut entities, &patches);
        assert_eq!(entities.entities[0].get("music", false), Some("music/track.wav"));
    }
}

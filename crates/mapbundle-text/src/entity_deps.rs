//! Classname-driven sound/model dependency seeding from a map's entities.
//!
//! Beyond the shader references a bsp's surface table carries directly,
//! several entity classnames imply their own asset dependencies: map
//! background music, breakable model variants, mover `model2` skins, and
//! speaker sound files.

use std::collections::BTreeSet;

use crate::entity::Entities;
use crate::tokenizer::Tokenizer;

const MODEL2_CLASSNAMES: &[&str] = &[
    "func_plat",
    "func_button",
    "func_door",
    "func_forcefield",
    "func_static",
    "func_rotating",
    "func_bobbing",
    "func_pendulum",
    "func_train",
    "func_usable",
    "func_breakable",
    "func_door_rotating",
];

const SPAWNFLAG_NODAMAGEMODEL: i64 = 8;

/// Sound and model names referenced by a map's entities, gathered
/// independently of shader parsing.
#[derive(Debug, Clone, Default)]
pub struct EntityDependencySeeds {
    /// Referenced sound file names (extension included, not yet normalized).
    pub sounds: BTreeSet<String>,
    /// Referenced model file names (extension included).
    pub models: BTreeSet<String>,
    /// Non-fatal extraction problems, keyed loosely by origin.
    pub errors: Vec<String>,
}

fn parse_int_field(entity: &crate::entity::Entity, key: &str) -> Result<i64, String> {
    let raw = entity.get_or(key, "0");
    raw.trim().parse::<i64>().map_err(|_| format!("field '{key}' is not numeric: '{raw}'"))
}

impl EntityDependencySeeds {
    /// Extract all entity-driven dependency seeds from a parsed entity list.
    #[must_use]
    pub fn extract(entities: &Entities) -> Self {
        let mut seeds = Self::default();

        if let Some(worldspawn) = entities.entities.first() {
            if let Some(music) = worldspawn.get("music", false) {
                if !music.is_empty() {
                    let mut tok = Tokenizer::new(music);
                    let start = tok.parse_ext(true);
                    let looping = tok.parse_ext(true);
                    if !start.is_empty() {
                        seeds.sounds.insert(start);
                    }
                    if !looping.is_empty() {
                        seeds.sounds.insert(looping);
                    }
                }
            }
        }

        for entity in &entities.entities {
            let classname = entity.get_or("classname", "");

            if classname == "misc_model_breakable" {
                let model = entity.get_or("model", "");
                if !model.is_empty() {
                    seeds.models.insert(model.clone());

                    let health = parse_int_field(entity, "health");
                    let spawnflags = parse_int_field(entity, "spawnflags");
                    match (health, spawnflags) {
                        (Ok(health), Ok(spawnflags)) => {
                            if health != 0 && (spawnflags & SPAWNFLAG_NODAMAGEMODEL) == 0 {
                                if let Some(stem) = model.get(..model.len().saturating_sub(4)) {
                                    seeds.models.insert(format!("{stem}_d1.md3"));
                                }
                            }
                        }
                        (Err(e), _) | (_, Err(e)) => {
                            seeds.errors.push(format!("exception on '{classname}': {e}"));
                        }
                    }
                }
            }

            if MODEL2_CLASSNAMES.contains(&classname.as_str()) {
                let model2 = entity.get_or("model2", "");
                if !model2.is_empty() {
                    seeds.models.insert(model2);
                }
            }

            if classname == "target_speaker" {
                if let Some(noise) = entity.get("noise", false) {
                    if !noise.is_empty() && !noise.starts_with('*') {
                        seeds.sounds.insert(noise.to_string());
                    }
                }
            }
        }

        seeds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use pretty_assertions::assert_eq;

    fn entities_with(list: Vec<Entity>) -> Entities {
        Entities { entities: list }
    }

    #[test]
    fn seeds_music_from_worldspawn() {
        let mut world = Entity::new();
        world.set("music", "music/track1.wav music/track1_loop.wav", true);
        let entities = entities_with(vec![world]);
        let seeds = EntityDependencySeeds::extract(&entities);
        assert!(seeds.sounds.contains("music/track1.wav"));
        assert!(seeds.sounds.contains("music/track1_loop.wav"));
    }

    #[test]
    fn seeds_damaged_model_variant() {
        let mut world = Entity::new();
        world.set("classname", "worldspawn", true);
        let mut breakable = Entity::new();
        breakable.set("classname", "misc_model_breakable", true);
        breakable.set("model", "models/mapobjects/crate.md3", true);
        breakable.set("health", "50", true);
        let entities = entities_with(vec![world, breakable]);
        let seeds = EntityDependencySeeds::extract(&entities);
        assert!(seeds.models.contains("models/mapobjects/crate.md3"));
        assert!(seeds.models.contains("models/mapobjects/crate_d1.md3"));
    }

    #[test]
    fn skips_damaged_model_when_nodamage_flag_set() {
        let mut world = Entity::new();
        world.set("classname", "worldspawn", true);
        let mut breakable = Entity::new();
        breakable.set("classname", "misc_model_breakable", true);
        breakable.set("model", "models/mapobjects/crate.md3", true);
        breakable.set("health", "50", true);
        breakable.set("spawnflags", "8", true);
        let entities = entities_with(vec![world, breakable]);
        let seeds = EntityDependencySeeds::extract(&entities);
        assert!(!seeds.models.contains("models/mapobjects/crate_d1.md3"));
    }

    #[test]
    fn target_speaker_skips_player_local_index() {
        let mut world = Entity::new();
        world.set("classname", "worldspawn", true);
        let mut speaker = Entity::new();
        speaker.set("classname", "target_speaker", true);
        speaker.set("noise", "*playerlocal", true);
        let entities = entities_with(vec![world, speaker]);
        let seeds = EntityDependencySeeds::extract(&entities);
        assert!(seeds.sounds.is_empty());
    }

    #[test]
    fn mover_model2_is_seeded() {
        let mut world = Entity::new();
        world.set("classname", "worldspawn", true);
        let mut door = Entity::new();
        door.set("classname", "func_door", true);
        door.set("model2", "models/mapobjects/door.md3", true);
        let entities = entities_with(vec![world, door]);
        let seeds = EntityDependencySeeds::extract(&entities);
        assert_eq!(seeds.models.len(), 1);
        assert!(seeds.models.contains("models/mapobjects/door.md3"));
    }
}

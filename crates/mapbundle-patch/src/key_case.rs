//! Normalize entity key case: Q3 key lookups are case-insensitive, EF
//! sometimes expects lowercase, so collapse any non-lowercase case variants
//! down to a single lowercase pair.

use mapbundle_text::Entities;

/// A lowercase-key rewrite recorded while patching, for diagnostics.
#[derive(Debug, Clone)]
pub struct KeyCasePatch {
    /// The case the key was actually stored under.
    pub from: String,
    /// The lowercased key it was rewritten to.
    pub to: String,
}

/// Keys the game treats specially regardless of case; never rewritten.
const EXEMPT_KEYS: &[&str] = &["timelimitwinningteam"];

/// For every entity, any field stored under more than one case variant (or
/// a single variant whose case doesn't already match the lowercased key)
/// is collapsed to a single lowercase pair, except for [`EXEMPT_KEYS`].
#[must_use]
pub fn patch_q3_key_case(entities: &mut Entities) -> Vec<KeyCasePatch> {
    let mut patches = Vec::new();

    for entity in &mut entities.entities {
        let mut updates: Vec<(String, String)> = Vec::new();
        for (key_lwr, case_value) in entity.iter() {
            if EXEMPT_KEYS.contains(&key_lwr) {
                continue;
            }
            let needs_patch = case_value.len() != 1 || case_value[0].0 != key_lwr;
            if needs_patch {
                let (from, value) = &case_value[0];
                patches.push(KeyCasePatch { from: from.clone(), to: key_lwr.to_string() });
                updates.push((key_lwr.to_string(), value.clone()));
            }
        }
        for (key, value) in updates {
            entity.set(&key, &value, true);
        }
    }

    patches
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapbundle_text::Entity;
    use pretty_assertions::assert_eq;

    #[test]
    fn collapses_mixed_case_to_lowercase() {
        let mut entities = Entities::new();
        let mut entity = Entity::new();
        entity.set("Angle", "90", true);
        entities.entities.push(entity);

        let patches = patch_q3_key_case(&mut entities);
        assert_eq!(patches.len(), 1);
        assert_eq!(entities.entities[0].get("angle", true), Some("90"));
    }

    #[test]
    fn exempts_timelimitwinningteam() {
        let mut entities = Entities::new();
        let mut entity = Entity::new();
        entity.set("timelimitWinningTeam", "red", true);
        entities.entities.push(entity);

        let patches = patch_q3_key_case(&mut entities);
        assert!(patches.is_empty());
    }
}

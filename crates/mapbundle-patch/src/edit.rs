//! Rule-based entity edits specified by a map's profile: match fields by
//! exact value, then set fields or delete the entity entirely.

use std::collections::BTreeMap;

use mapbundle_text::{Entities, Entity};

/// One edit rule: `match_fields` selects entities (every field must equal
/// the given value); `set_fields` is applied to matches, or the entity is
/// deleted if `set_fields` is empty. A rule with no `match_fields` adds a
/// brand-new entity built from `set_fields` instead of editing existing ones.
#[derive(Debug, Clone, Default)]
pub struct EntityEdit {
    /// Fields an entity must match exactly (case-insensitive key/value
    /// lookup) for this rule to apply. Empty means "add a new entity".
    pub match_fields: BTreeMap<String, String>,
    /// Fields to set on matches. Empty (with non-empty `match_fields`)
    /// deletes matching entities instead.
    pub set_fields: BTreeMap<String, String>,
}

fn matches(edit: &EntityEdit, entity: &Entity) -> bool {
    edit.match_fields.iter().all(|(key, value)| entity.get_or(key, "") == *value)
}

/// Apply every edit rule in order. For each existing entity, the first
/// matching rule with `match_fields` decides its fate (deleted if that
/// rule's `set_fields` is empty, otherwise the fields are set and
/// remaining rules are still tried against later entities). Rules with no
/// `match_fields` instead append a freshly built entity once.
pub fn run_entity_edit(entities: &mut Entities, edits: &[EntityEdit]) {
    let convert = |entity: &mut Entity| -> bool {
        for edit in edits {
            if edit.match_fields.is_empty() {
                continue;
            }
            if matches(edit, entity) {
                if edit.set_fields.is_empty() {
                    return false;
                }
                for (key, value) in &edit.set_fields {
                    entity.set(key, value, true);
                }
            }
        }
        true
    };

    let mut new_entities = Vec::new();
    for mut entity in std::mem::take(&mut entities.entities) {
        if convert(&mut entity) {
            new_entities.push(entity);
        }
    }

    for edit in edits {
        if edit.match_fields.is_empty() && !edit.set_fields.is_empty() {
            let mut entity = Entity::new();
            for (key, value) in &edit.set_fields {
                entity.set(key, value, true);
            }
            new_entities.push(entity);
        }
    }

    entities.entities = new_entities;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sets_fields_on_matching_entity() {
        let mut entities = Entities::new();
        let mut entity = Entity::new();
        entity.set("classname", "target_speaker", true);
        entities.entities.push(entity);

        let edit = EntityEdit {
            match_fields: BTreeMap::from([("classname".to_string(), "target_speaker".to_string())]),
            set_fields: BTreeMap::from([("wait".to_string(), "5".to_string())]),
        };
        run_entity_edit(&mut entities, &[edit]);
        assert_eq!(entities.entities[0].get("wait", false), Some("5"));
    }

    #[test]
    fn deletes_matching_entity_when_set_fields_empty() {
        let mut entities = Entities::new();
        let mut entity = Entity::new();
        entity.set("classname", "info_null", true);
        entities.entities.push(entity);

        let edit = EntityEdit {
            match_fields: BTreeMap::from([("classname".to_string(), "info_null".to_string())]),
            set_fields: BTreeMap::new(),
        };
        run_entity_edit(&mut entities, &[edit]);
        assert!(entities.entities.is_empty());
    }

    #[test]
    fn adds_new_entity_with_no_match_fields() {
        let mut entities = Entities::new();
        let edit = EntityEdit {
            match_fields: BTreeMap::new(),
            set_fields: BTreeMap::from([("classname".to_string(), "info_player_start".to_string())]),
        };
        run_entity_edit(&mut entities, &[edit]);
        assert_eq!(entities.entities.len(), 1);
        assert_eq!(entities.entities[0].get("classname", false), Some("info_player_start"));
    }
}

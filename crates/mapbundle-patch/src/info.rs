//! Summary entity data surfaced alongside a bundled map.

use std::collections::BTreeMap;

use mapbundle_text::Entities;
use serde::Serialize;

/// Classname histogram added to a map's server info.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityInfo {
    /// Count of entities per declared classname.
    pub classnames: BTreeMap<String, u32>,
}

/// Build the classname histogram for `entities`.
#[must_use]
pub fn get_entity_info(entities: &Entities) -> EntityInfo {
    let mut classnames = BTreeMap::new();
    for entity in &entities.entities {
        if let Some(classname) = entity.get("classname", false) {
            *classnames.entry(classname.to_string()).or_insert(0) += 1;
        }
    }
    EntityInfo { classnames }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapbundle_text::Entity;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_classnames() {
        let mut entities = Entities::new();
        for _ in 0..3 {
            let mut e = Entity::new();
            e.set("classname", "item_armor", true);
            entities.entities.push(e);
        }
        let info = get_entity_info(&entities);
        assert_eq!(info.classnames.get("item_armor"), Some(&3));
    }
}

//! Entity patching applied during map export: music extension
//! substitution, key-case normalization, profile-driven edits, and the
//! classname summary attached to exported map info.

pub mod edit;
pub mod info;
pub mod key_case;
pub mod music;
pub mod path;

pub use edit::{EntityEdit, run_entity_edit};
pub use info::{EntityInfo, get_entity_info};
pub use key_case::{KeyCasePatch, patch_q3_key_case};
pub use music::patch_music_extensions;

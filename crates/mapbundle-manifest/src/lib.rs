//! Manifest accumulation and per-map configuration resolution: profile
//! imports, field-level merge semantics, and delete-on-null overrides.

pub mod manifest;
pub mod merge;

pub use manifest::Manifest;
pub use merge::update_delete_null;

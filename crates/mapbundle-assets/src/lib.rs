//! Pk3 archive indexing, a typed asset/dependency model, and the
//! priority-ordered dependency resolver that picks which archives a map
//! needs to ship with.

pub mod asset;
pub mod error;
pub mod pk3;
pub mod resolver;

pub use asset::{
    Asset, AssetIndex, Dependency, DependencyKind, FileAsset, Md3Asset, ShaderAsset, SourceList, SourcePriority,
    assets_from_pk3,
};
pub use error::{Error, Result};
pub use pk3::{Pk3Record, ShaderText, SubfileRecord, index_pk3, pk3_hash};
pub use resolver::{DependencyPool, DependencySatisfiers, minimum_sources, resolve_dependencies};

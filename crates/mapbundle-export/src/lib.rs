//! Full export pipeline: indexes source pk3s from a manifest, resolves map
//! dependencies, patches entities, and assembles the server-ready output
//! tree under `data/`.

pub mod dir;
pub mod discover;
pub mod error;
pub mod exporter;
pub mod fetcher;
pub mod file_from_pk3;
pub mod importer;
pub mod logger;
pub mod orchestrate;
pub mod pk3_source;
pub mod resource_pk3;

pub use dir::DirectoryHandler;
pub use discover::{DiscoveredPk3, pk3_files_in_directory};
pub use error::{Error, Result};
pub use exporter::FileExporter;
pub use fetcher::{NullFetcher, ResourceFetcher};
pub use file_from_pk3::FileFromPk3Loader;
pub use importer::FileImporter;
pub use logger::{Level, Logger};
pub use orchestrate::ExportRun;
pub use pk3_source::{Pk3Source, Pk3Sources};
pub use resource_pk3::{ResourceKind, write_resource_pk3};

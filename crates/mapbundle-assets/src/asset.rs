//! Typed assets and dependencies, with equivalence, sort keys, and
//! sub-dependency expansion.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use mapbundle_shader::ShaderDependencies;

use crate::error::{Error, Result};
use crate::pk3::{Pk3Record, SubfileRecord};

fn strip_ext(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// A source's standing among candidate archives: higher `category` wins,
/// ties break on earlier `position` (insertion order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePriority {
    /// Configured priority group (from a map's `dep_group` fields).
    pub category: i64,
    /// Insertion order among sources sharing this `SourceList`.
    pub position: usize,
}

impl SourcePriority {
    /// Sort key used to rank candidate assets: shaders outrank same-priority
    /// images. `is_shader` should be `false` when ranking sources for
    /// minimum-set reduction (see [`crate::resolver::minimum_sources`]).
    #[must_use]
    pub fn sort_key(self, is_shader: bool) -> (i64, u8, usize) {
        (-self.category, if is_shader { 0 } else { 1 }, self.position)
    }
}

/// A concrete file-backed asset's shared fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAsset {
    /// The archive name (`"<mod>/<file>"`) that provides this asset.
    pub source: String,
    /// Display filename as stored in the subfile record.
    pub name: String,
    /// Lowercased extension.
    pub ext: String,
    /// Uncompressed size in bytes.
    pub filesize: u64,
}

/// A shader declared in a `scripts/*.shader` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderAsset {
    /// The archive name that provides this shader.
    pub source: String,
    /// The shader's declared name.
    pub name: String,
    /// The `.shader` file's display name, for diagnostics.
    pub source_file_name: String,
    /// The shader's verbatim body text.
    pub text: String,
}

/// An md3 model asset, carrying the shader names its surfaces reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Md3Asset {
    /// The underlying file asset fields.
    pub file: FileAsset,
    /// Shader names referenced by this model's surfaces.
    pub shader_dependencies: BTreeSet<String>,
}

/// Something that can satisfy a [`Dependency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    /// A shader script declaration.
    Shader(ShaderAsset),
    /// A `.tga`/`.jpg` image file.
    Image(FileAsset),
    /// A `.wav`/`.mp3`/`.ogg` sound file.
    Sound(FileAsset),
    /// A `.roq` cinematic file.
    Video(FileAsset),
    /// A `.md3` model file.
    Md3(Md3Asset),
}

impl Asset {
    /// The archive this asset was registered from.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Shader(a) => &a.source,
            Self::Image(a) | Self::Sound(a) | Self::Video(a) => &a.source,
            Self::Md3(a) => &a.file.source,
        }
    }

    /// Whether this is a shader asset (affects sort-key tie-breaking).
    #[must_use]
    pub fn is_shader(&self) -> bool {
        matches!(self, Self::Shader(_))
    }

    fn sort_key(&self, priority: SourcePriority) -> (i64, u8, usize) {
        priority.sort_key(self.is_shader())
    }

    /// Whether `self` and `other` are interchangeable for resolution
    /// purposes: equal shader text, or equal file size of the same kind.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Shader(a), Self::Shader(b)) => a.text == b.text,
            (Self::Image(a), Self::Image(b))
            | (Self::Sound(a), Self::Sound(b))
            | (Self::Video(a), Self::Video(b)) => a.filesize == b.filesize,
            (Self::Md3(a), Self::Md3(b)) => a.file.filesize == b.file.filesize,
            _ => false,
        }
    }

    /// Dependencies this asset itself implies (shader image/video refs,
    /// md3 shader refs).
    #[must_use]
    pub fn subdependencies(&self) -> Vec<Dependency> {
        match self {
            Self::Shader(shader) => {
                let deps = ShaderDependencies::extract(&shader.text);
                let mut out: Vec<Dependency> = Vec::new();
                for image in &deps.images {
                    out.push(Dependency::new(DependencyKind::Image, image, false));
                }
                for image in &deps.images_optional {
                    out.push(Dependency::new(DependencyKind::Image, image, true));
                }
                for video in &deps.videos {
                    let video = if video.contains('/') || video.contains('\\') {
                        video.clone()
                    } else {
                        format!("video/{video}")
                    };
                    out.push(Dependency::new(DependencyKind::Video, &video, false));
                }
                out
            }
            Self::Md3(md3) => md3
                .shader_dependencies
                .iter()
                .map(|name| Dependency::new(DependencyKind::Shader, name, false))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shader(a) => write!(f, "shaderasset|{}:{}:{}", a.source, a.source_file_name, a.name),
            Self::Image(a) => write!(f, "imageasset|{}:{}", a.source, a.name),
            Self::Sound(a) => write!(f, "soundasset|{}:{}", a.source, a.name),
            Self::Video(a) => write!(f, "videoasset|{}:{}", a.source, a.name),
            Self::Md3(a) => write!(f, "md3asset|{}:{}", a.file.source, a.file.name),
        }
    }
}

/// The kind of resource a [`Dependency`] requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Satisfied by a Shader or Image asset (shader-first on tie).
    Shader,
    /// Satisfied only by an Image asset.
    Image,
    /// Satisfied only by a Sound asset.
    Sound,
    /// Satisfied only by a Md3 asset.
    Model,
    /// Satisfied only by a Video asset.
    Video,
}

/// A named resource requirement. Equality and hashing ignore `optional`.
#[derive(Debug, Clone)]
pub struct Dependency {
    /// The kind of asset that can satisfy this dependency.
    pub kind: DependencyKind,
    /// Lowercased, extension-stripped resource name.
    pub name: String,
    /// Whether being unsatisfied is tolerable (e.g. a sky face image).
    pub optional: bool,
}

impl Dependency {
    /// Build a dependency, normalizing `name` the way the reference
    /// implementation does (strip extension, lowercase).
    #[must_use]
    pub fn new(kind: DependencyKind, name: &str, optional: bool) -> Self {
        Self { kind, name: strip_ext(name).to_lowercase(), optional }
    }

    fn matches_asset(&self, asset: &Asset) -> bool {
        match (self.kind, asset) {
            (DependencyKind::Shader, Asset::Shader(_) | Asset::Image(_)) => true,
            (DependencyKind::Image, Asset::Image(_)) => true,
            (DependencyKind::Sound, Asset::Sound(_)) => true,
            (DependencyKind::Model, Asset::Md3(_)) => true,
            (DependencyKind::Video, Asset::Video(_)) => true,
            _ => false,
        }
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
    }
}

impl PartialOrd for Dependency {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dependency {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.kind as u8, &self.name).cmp(&(other.kind as u8, &other.name))
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            DependencyKind::Shader => "shader",
            DependencyKind::Image => "image",
            DependencyKind::Sound => "sound",
            DependencyKind::Model => "model",
            DependencyKind::Video => "video",
        };
        let suffix = if self.optional { "_optional" } else { "" };
        write!(f, "{kind}dep{suffix}|{}", self.name)
    }
}

/// Group every subfile of a pk3 by lowercased base name into the assets it
/// provides.
#[must_use]
pub fn assets_from_pk3(source: &str, info: &Pk3Record) -> BTreeMap<String, Vec<Asset>> {
    let mut out: BTreeMap<String, Vec<Asset>> = BTreeMap::new();
    for subfile in &info.pk3_subfiles {
        register_subfile_assets(source, subfile, &mut out);
    }
    out
}

fn register_subfile_assets(source: &str, subfile: &SubfileRecord, out: &mut BTreeMap<String, Vec<Asset>>) {
    let Some((stem, ext)) = subfile.filename.rsplit_once('.') else {
        return;
    };
    let base_name = stem.to_lowercase();
    let ext = ext.to_lowercase();

    let file = FileAsset {
        source: source.to_string(),
        name: subfile.filename.clone(),
        ext: ext.clone(),
        filesize: subfile.filesize,
    };

    match ext.as_str() {
        "tga" | "jpg" => out.entry(base_name).or_default().push(Asset::Image(file)),
        "wav" | "mp3" | "ogg" => out.entry(base_name).or_default().push(Asset::Sound(file)),
        "md3" => {
            let shader_dependencies = subfile
                .md3info
                .as_ref()
                .map(|info| info.shaders.iter().cloned().collect())
                .unwrap_or_default();
            out.entry(base_name).or_default().push(Asset::Md3(Md3Asset { file, shader_dependencies }));
        }
        "roq" => out.entry(base_name).or_default().push(Asset::Video(file)),
        _ => {}
    }

    if let Some(shaders) = &subfile.shaders {
        for (name, shader) in shaders {
            let asset = Asset::Shader(ShaderAsset {
                source: source.to_string(),
                name: name.clone(),
                source_file_name: subfile.filename.clone(),
                text: shader.text.clone(),
            });
            out.entry(name.clone()).or_default().push(asset);
        }
    }
}

/// All assets registered from every indexed source, keyed by lowercased
/// base name.
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    asset_table: BTreeMap<String, Vec<Asset>>,
    registered_sources: BTreeSet<String>,
}

impl AssetIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one source's already-grouped assets. Fails if `source` was
    /// already registered.
    pub fn register_assets(&mut self, source: &str, assets: BTreeMap<String, Vec<Asset>>) -> Result<()> {
        if !self.registered_sources.insert(source.to_string()) {
            return Err(Error::DuplicateSource(source.to_string()));
        }
        for (base_name, mut asset_list) in assets {
            self.asset_table.entry(base_name).or_default().append(&mut asset_list);
        }
        Ok(())
    }

    /// Index and register a pk3's assets in one step.
    pub fn register_pk3(&mut self, source: &str, info: &Pk3Record) -> Result<()> {
        self.register_assets(source, assets_from_pk3(source, info))
    }

    /// Whether `source` has been registered.
    #[must_use]
    pub fn contains_source(&self, source: &str) -> bool {
        self.registered_sources.contains(source)
    }

    fn assets_for(&self, name: &str) -> &[Asset] {
        self.asset_table.get(name).map_or(&[], Vec::as_slice)
    }

    /// A human-readable `Kind: count, ...` summary, for diagnostics.
    #[must_use]
    pub fn asset_counts_str(&self) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for assets in self.asset_table.values() {
            for asset in assets {
                let kind = match asset {
                    Asset::Shader(_) => "Shader",
                    Asset::Image(_) => "Image",
                    Asset::Sound(_) => "Sound",
                    Asset::Video(_) => "Video",
                    Asset::Md3(_) => "Md3",
                };
                *counts.entry(kind).or_insert(0) += 1;
            }
        }
        counts.into_iter().map(|(kind, count)| format!("{kind}: {count}")).collect::<Vec<_>>().join(", ")
    }
}

/// A priority-ordered subset of an [`AssetIndex`]'s registered sources,
/// used to scope dependency resolution.
#[derive(Debug, Clone)]
pub struct SourceList<'a> {
    /// The backing index every source here must already be registered in.
    pub asset_index: &'a AssetIndex,
    priority_table: BTreeMap<String, SourcePriority>,
}

impl<'a> SourceList<'a> {
    /// Create an empty source list scoped to `asset_index`.
    #[must_use]
    pub fn new(asset_index: &'a AssetIndex) -> Self {
        Self { asset_index, priority_table: BTreeMap::new() }
    }

    /// Add `source` at `category`. Re-adding an already-present source is
    /// only allowed at the same or a lower category (never a priority
    /// upgrade masquerading as a downgrade-proof re-add).
    pub fn add_source(&mut self, source: &str, category: i64) -> Result<()> {
        if !self.asset_index.contains_source(source) {
            return Err(Error::UnregisteredSource(source.to_string()));
        }
        if let Some(existing) = self.priority_table.get(source) {
            if existing.category < category {
                return Err(Error::PriorityDowngrade(source.to_string()));
            }
            return Ok(());
        }
        let position = self.priority_table.len();
        self.priority_table.insert(source.to_string(), SourcePriority { category, position });
        Ok(())
    }

    /// The priority for `source`, if it has been added.
    #[must_use]
    pub fn priority(&self, source: &str) -> Option<SourcePriority> {
        self.priority_table.get(source).copied()
    }

    /// Every source currently in this list.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.priority_table.keys().map(String::as_str)
    }

    /// Candidate assets able to satisfy `dependency`, restricted to the
    /// top-ranked asset and whichever others are [`Asset::equivalent`] to
    /// it — a source holding only a non-equivalent asset (e.g. a
    /// different-filesize image under the same name) is not a provider.
    pub(crate) fn satisfiers(&self, dependency: &Dependency) -> Vec<&Asset> {
        let mut assets: Vec<&Asset> = self
            .asset_index
            .assets_for(&dependency.name)
            .iter()
            .filter(|asset| dependency.matches_asset(asset))
            .filter(|asset| self.priority_table.contains_key(asset.source()))
            .collect();
        assets.sort_by_key(|asset| asset.sort_key(self.priority_table[asset.source()]));
        if let Some(top) = assets.first().copied() {
            assets.retain(|asset| asset.equivalent(top));
        }
        assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file(source: &str, name: &str, filesize: u64) -> Asset {
        Asset::Image(FileAsset { source: source.to_string(), name: name.to_string(), ext: "tga".to_string(), filesize })
    }

    #[test]
    fn equivalent_images_compare_by_filesize() {
        let a = file("a/pak0", "x.tga", 100);
        let b = file("b/pak0", "x.tga", 100);
        let c = file("b/pak0", "x.tga", 200);
        assert!(a.equivalent(&b));
        assert!(!a.equivalent(&c));
    }

    #[test]
    fn dependency_equality_ignores_optional() {
        let a = Dependency::new(DependencyKind::Image, "textures/a/b.tga", false);
        let b = Dependency::new(DependencyKind::Image, "textures/a/b.tga", true);
        assert_eq!(a, b);
    }

    #[test]
    fn satisfiers_exclude_non_equivalent_lower_ranked_assets() {
        let mut index = AssetIndex::new();
        let mut top = BTreeMap::new();
        top.insert("textures/a".to_string(), vec![file("mod/pak0", "textures/a.tga", 100)]);
        index.register_assets("mod/pak0", top).unwrap();
        let mut other = BTreeMap::new();
        other.insert("textures/a".to_string(), vec![file("mod/pak1", "textures/a.tga", 200)]);
        index.register_assets("mod/pak1", other).unwrap();

        let mut sources = SourceList::new(&index);
        sources.add_source("mod/pak0", 10).unwrap();
        sources.add_source("mod/pak1", 0).unwrap();

        let dep = Dependency::new(DependencyKind::Image, "textures/a.tga", false);
        let satisfiers = sources.satisfiers(&dep);
        assert_eq!(satisfiers.len(), 1);
        assert_eq!(satisfiers[0].source(), "mod/pak0");
    }

    #[test]
    fn satisfiers_include_equivalent_tied_assets() {
        let mut index = AssetIndex::new();
        for (source, size) in [("mod/pak0", 100), ("mod/pak1", 100)] {
            let mut assets = BTreeMap::new();
            assets.insert("textures/a".to_string(), vec![file(source, "textures/a.tga", size)]);
            index.register_assets(source, assets).unwrap();
        }

        let mut sources = SourceList::new(&index);
        sources.add_source("mod/pak0", 0).unwrap();
        sources.add_source("mod/pak1", 0).unwrap();

        let dep = Dependency::new(DependencyKind::Image, "textures/a.tga", false);
        let satisfiers = sources.satisfiers(&dep);
        assert_eq!(satisfiers.len(), 2);
    }

    #[test]
    fn source_list_rejects_unregistered_source() {
        let index = AssetIndex::new();
        let mut list = SourceList::new(&index);
        assert!(list.add_source("mod/pak0", 0).is_err());
    }

    #[test]
    fn source_list_rejects_priority_downgrade() {
        let mut index = AssetIndex::new();
        index.register_assets("mod/pak0", BTreeMap::new()).unwrap();
        let mut list = SourceList::new(&index);
        list.add_source("mod/pak0", 5).unwrap();
        assert!(list.add_source("mod/pak0", 10).is_err());
        list.add_source("mod/pak0", 5).unwrap();
    }
}

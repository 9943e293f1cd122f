//! Recursive dependency resolution and minimum-covering-set reduction.

use std::collections::{BTreeMap, BTreeSet};

use crate::asset::{Asset, Dependency, SourceList};

/// Which sources can satisfy a dependency, best first, plus whichever
/// single source the resolver actually picked.
#[derive(Debug, Clone)]
pub struct DependencySatisfiers<'a> {
    /// Every candidate asset able to satisfy this dependency, sorted by
    /// sort key (best first).
    pub candidates: Vec<&'a Asset>,
    /// The dependency was declared optional by its referrer.
    pub optional: bool,
}

impl<'a> DependencySatisfiers<'a> {
    /// The candidate resolution picked (the best-ranked source), if any.
    #[must_use]
    pub fn chosen(&self) -> Option<&'a Asset> {
        self.candidates.first().copied()
    }

    /// Whether no candidate source exists at all.
    #[must_use]
    pub fn is_unsatisfied(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// The fixpoint result of resolving a set of seed dependencies: every
/// dependency reached, transitively, paired with its satisfiers.
#[derive(Debug, Default)]
pub struct DependencyPool<'a> {
    /// Resolved dependencies in first-seen order, each with its satisfiers.
    pub pool: Vec<(Dependency, DependencySatisfiers<'a>)>,
}

impl<'a> DependencyPool<'a> {
    /// Dependencies with no satisfying source at all, required ones first.
    #[must_use]
    pub fn get_unsatisfied(&self) -> Vec<&Dependency> {
        let mut out: Vec<&Dependency> = self
            .pool
            .iter()
            .filter(|(_, sat)| sat.is_unsatisfied())
            .map(|(dep, _)| dep)
            .collect();
        out.sort_by_key(|dep| (dep.optional, dep.name.clone()));
        out
    }

    /// Render a diagnostic log: one line per unsatisfied dependency, noting
    /// whether it was optional, for the per-map warnings surface.
    #[must_use]
    pub fn log_dependencies(&self) -> Vec<String> {
        self.get_unsatisfied()
            .into_iter()
            .map(|dep| {
                if dep.optional {
                    format!("optional dependency not found: {dep}")
                } else {
                    format!("dependency not found: {dep}")
                }
            })
            .collect()
    }
}

/// Resolve `seeds` against `sources`, following each chosen asset's own
/// sub-dependencies (shader image/video refs, md3 shader refs) to a
/// fixpoint. Dependencies already seen are never re-queued, which also
/// guards against cycles in the asset graph.
#[must_use]
pub fn resolve_dependencies<'a>(sources: &'a SourceList<'a>, seeds: &[Dependency]) -> DependencyPool<'a> {
    let mut seen: BTreeSet<Dependency> = BTreeSet::new();
    let mut queue: Vec<Dependency> = Vec::new();
    let mut pool = Vec::new();

    for seed in seeds {
        if seen.insert(seed.clone()) {
            queue.push(seed.clone());
        }
    }

    let mut i = 0;
    while i < queue.len() {
        let dep = queue[i].clone();
        i += 1;

        let candidates = sources.satisfiers(&dep);
        let satisfiers = DependencySatisfiers { candidates, optional: dep.optional };

        if let Some(chosen) = satisfiers.chosen() {
            for subdep in chosen.subdependencies() {
                if seen.insert(subdep.clone()) {
                    queue.push(subdep);
                }
            }
        }

        pool.push((dep, satisfiers));
    }

    DependencyPool { pool }
}

/// Reduce `sources` to the minimum subset still able to resolve every
/// dependency in `pool`. Sources are scanned in *descending* `sort_key`
/// order (lowest priority first, and within a tied priority, latest
/// insertion position first) so that when several equal-priority sources
/// are pruned down to one survivor, the earliest-inserted one is scanned
/// last and wins — matching the reference resolver's `reverse=True` scan.
/// A source is kept only if it is the sole remaining provider of some
/// dependency still needing one; otherwise it is discarded and its
/// contributions pruned. The accepted list is then reversed so the output
/// lists lowest-priority first (as the game's download order expects).
///
/// Sort key is non-shader-biased here: see `SourcePriority::sort_key`
/// called with `is_shader = false`.
#[must_use]
pub fn minimum_sources(sources: &SourceList<'_>, pool: &DependencyPool<'_>) -> Vec<String> {
    let mut by_source: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
    let mut remaining: BTreeSet<usize> = BTreeSet::new();

    for (idx, (_, sat)) in pool.pool.iter().enumerate() {
        if sat.is_unsatisfied() {
            continue;
        }
        remaining.insert(idx);
        for asset in &sat.candidates {
            by_source.entry(asset.source()).or_default().insert(idx);
        }
    }

    let mut ranked_sources: Vec<&str> = sources.sources().collect();
    ranked_sources.sort_by_key(|source| std::cmp::Reverse(sources.priority(source).unwrap().sort_key(false)));

    let mut discarded: BTreeSet<&str> = BTreeSet::new();
    let mut kept = Vec::new();
    for source in ranked_sources {
        let Some(covers) = by_source.get(source) else { continue };

        let is_sole_provider_of_any = covers.iter().any(|idx| {
            if !remaining.contains(idx) {
                return false;
            }
            pool.pool[*idx].1.candidates.iter().filter(|asset| !discarded.contains(asset.source())).count() == 1
        });

        if is_sole_provider_of_any {
            kept.push(source.to_string());
            for idx in covers {
                remaining.remove(idx);
            }
        } else {
            discarded.insert(source);
        }
    }

    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetIndex, DependencyKind, FileAsset};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn image(source: &str, name: &str, size: u64) -> Asset {
        Asset::Image(FileAsset { source: source.to_string(), name: name.to_string(), ext: "tga".to_string(), filesize: size })
    }

    #[test]
    fn resolves_simple_dependency() {
        let mut index = AssetIndex::new();
        let mut assets = BTreeMap::new();
        assets.insert("textures/a/b".to_string(), vec![image("mod/pak0", "textures/a/b.tga", 10)]);
        index.register_assets("mod/pak0", assets).unwrap();

        let mut sources = SourceList::new(&index);
        sources.add_source("mod/pak0", 0).unwrap();

        let dep = Dependency::new(DependencyKind::Image, "textures/a/b.tga", false);
        let pool = resolve_dependencies(&sources, &[dep]);
        assert_eq!(pool.get_unsatisfied().len(), 0);
    }

    #[test]
    fn unsatisfied_dependency_is_reported() {
        let index = AssetIndex::new();
        let sources = SourceList::new(&index);
        let dep = Dependency::new(DependencyKind::Image, "textures/missing.tga", false);
        let pool = resolve_dependencies(&sources, &[dep]);
        assert_eq!(pool.get_unsatisfied().len(), 1);
        assert!(pool.log_dependencies()[0].contains("dependency not found"));
    }

    #[test]
    fn minimum_sources_keeps_sole_providers_only() {
        let mut index = AssetIndex::new();
        let mut a = BTreeMap::new();
        a.insert("textures/a".to_string(), vec![image("mod/pak0", "textures/a.tga", 10)]);
        index.register_assets("mod/pak0", a).unwrap();
        let mut b = BTreeMap::new();
        b.insert("textures/a".to_string(), vec![image("mod/pak1", "textures/a.tga", 10)]);
        b.insert("textures/b".to_string(), vec![image("mod/pak1", "textures/b.tga", 20)]);
        index.register_assets("mod/pak1", b).unwrap();

        let mut sources = SourceList::new(&index);
        sources.add_source("mod/pak0", 0).unwrap();
        sources.add_source("mod/pak1", 0).unwrap();

        let deps = vec![
            Dependency::new(DependencyKind::Image, "textures/a.tga", false),
            Dependency::new(DependencyKind::Image, "textures/b.tga", false),
        ];
        let pool = resolve_dependencies(&sources, &deps);
        let kept = minimum_sources(&sources, &pool);
        assert!(kept.contains(&"mod/pak1".to_string()));
    }

    #[test]
    fn minimum_sources_ties_keep_the_first_inserted_source() {
        let mut index = AssetIndex::new();
        for (source, size) in [("mod/pak0", 10), ("mod/pak1", 10), ("mod/pak2", 10)] {
            let mut assets = BTreeMap::new();
            assets.insert("textures/a".to_string(), vec![image(source, "textures/a.tga", size)]);
            index.register_assets(source, assets).unwrap();
        }

        let mut sources = SourceList::new(&index);
        sources.add_source("mod/pak0", 0).unwrap();
        sources.add_source("mod/pak1", 0).unwrap();
        sources.add_source("mod/pak2", 0).unwrap();

        let dep = Dependency::new(DependencyKind::Image, "textures/a.tga", false);
        let pool = resolve_dependencies(&sources, &[dep]);
        let kept = minimum_sources(&sources, &pool);
        assert_eq!(kept, vec!["mod/pak0".to_string()]);
    }
}

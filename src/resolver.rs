//! Resolution of logical resource names to concrete file paths.
//!
//! A logical name like `icons/player_01` is suffixed for the active quality
//! tier and looked up in the search path roots in priority order: texture
//! pack overrides, then the primary resource root, then every root in list
//! order. Hits are cached for the lifetime of the owning context.
//!
//! ## Unresolved names
//!
//! When no root contains the file, [`ResourcePathResolver::resolve`] returns
//! [`ResolvedPath::Unresolved`] carrying the normalized file name instead of
//! failing. Callers must treat this as "path unknown" and skip the resource;
//! the name is never a usable path and is never cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::quality::{QualityTier, suffixed_filename};
use crate::search_path::{SearchPathEntry, primary_index, texture_pack_indices};
use crate::sync::lock;

/// Filesystem access used while resolving names.
///
/// Implementations must be cheap to call concurrently; the resolver only
/// holds its cache lock around lookups and inserts, never around probes.
pub trait SearchPathProbe: Send + Sync {
    /// Transform a suffixed file name before probing (e.g. alias tables).
    fn new_filename(&self, filename: &str) -> String {
        filename.to_string()
    }

    /// Return the full path if `filename` exists under `root`.
    fn path_for_filename(&self, filename: &str, root: &Path) -> Option<PathBuf>;

    /// Whether a file name is already an absolute path.
    fn is_absolute(&self, filename: &str) -> bool {
        Path::new(filename).is_absolute()
    }
}

/// Probe backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl SearchPathProbe for FsProbe {
    fn path_for_filename(&self, filename: &str, root: &Path) -> Option<PathBuf> {
        let candidate = root.join(filename);
        candidate.is_file().then_some(candidate)
    }
}

/// Outcome of resolving a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPath {
    /// The file exists at this path
    Found(PathBuf),
    /// No root contained the file; holds the normalized name that was tried
    Unresolved(String),
}

impl ResolvedPath {
    /// The resolved path, if the file was found.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolvedPath::Found(path) => Some(path),
            ResolvedPath::Unresolved(_) => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            ResolvedPath::Found(path) => Some(path),
            ResolvedPath::Unresolved(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ResolvedPath::Found(_))
    }
}

/// Resolves logical names against prioritized search paths with a
/// write-once cache.
pub struct ResourcePathResolver {
    entries: Vec<SearchPathEntry>,
    pack_indices: Vec<usize>,
    primary: Option<usize>,
    tier: QualityTier,
    probe: Arc<dyn SearchPathProbe>,
    cache: Mutex<HashMap<String, PathBuf>>,
    lookups: AtomicUsize,
}

impl ResourcePathResolver {
    /// Create a resolver for the given roots and tier.
    pub fn new(
        entries: Vec<SearchPathEntry>,
        tier: QualityTier,
        probe: Arc<dyn SearchPathProbe>,
    ) -> Self {
        let pack_indices = texture_pack_indices(&entries);
        let primary = primary_index(&entries);
        Self {
            entries,
            pack_indices,
            primary,
            tier,
            probe,
            cache: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Tier used by [`ResourcePathResolver::full_path`].
    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn entries(&self) -> &[SearchPathEntry] {
        &self.entries
    }

    /// Indices of texture pack roots.
    pub fn texture_pack_indices(&self) -> &[usize] {
        &self.pack_indices
    }

    /// Index of the primary resource root.
    pub fn primary_index(&self) -> Option<usize> {
        self.primary
    }

    /// Resolve a name for the resolver's own tier.
    pub fn full_path(&self, name: &str) -> ResolvedPath {
        self.resolve(name, self.tier)
    }

    /// Resolve a name for a specific tier.
    pub fn resolve(&self, name: &str, tier: QualityTier) -> ResolvedPath {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        let filename = suffixed_filename(name, tier);

        if self.probe.is_absolute(&filename) {
            return ResolvedPath::Found(PathBuf::from(filename));
        }

        if let Some(cached) = lock(&self.cache).get(&filename) {
            return ResolvedPath::Found(cached.clone());
        }

        let normalized = self.probe.new_filename(&filename);

        let known_roots = self
            .pack_indices
            .iter()
            .copied()
            .chain(self.primary)
            .map(|idx| &self.entries[idx]);
        if let Some(found) = self.probe_roots(known_roots, &normalized) {
            return ResolvedPath::Found(self.remember(filename, found));
        }

        log::warn!(
            "full path lookup missed known paths, trying everything: {}",
            name
        );

        if let Some(found) = self.probe_roots(self.entries.iter(), &normalized) {
            return ResolvedPath::Found(self.remember(filename, found));
        }

        log::warn!("failed to find full path for: {}", name);
        log::warn!("attempted transformed path was {}", normalized);

        ResolvedPath::Unresolved(normalized)
    }

    fn probe_roots<'a>(
        &self,
        roots: impl Iterator<Item = &'a SearchPathEntry>,
        filename: &str,
    ) -> Option<PathBuf> {
        for entry in roots {
            if let Some(path) = self.probe.path_for_filename(filename, &entry.root) {
                return Some(path);
            }
        }
        None
    }

    /// Insert a resolved path, keeping the first one if another thread won.
    fn remember(&self, filename: String, path: PathBuf) -> PathBuf {
        lock(&self.cache).entry(filename).or_insert(path).clone()
    }

    /// Number of cached resolutions.
    pub fn cached_len(&self) -> usize {
        lock(&self.cache).len()
    }

    /// Number of `resolve` calls since creation.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

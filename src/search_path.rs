//! Search path roots and their roles.
//!
//! The host hands over an ordered list of roots. Texture pack roots override
//! the primary resource root, which in turn is tried before every other root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TEXTURE_PACK_MARKER;

/// Role of a search path root during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchPathRole {
    /// Generic fallback root
    #[default]
    Normal,
    /// User-supplied replacement assets
    TexturePackOverride,
    /// The application's own resource directory
    PrimaryResourceRoot,
}

/// One root in the ordered search path list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPathEntry {
    /// Directory (or archive prefix) that is probed
    pub root: PathBuf,
    /// How the root takes part in resolution
    #[serde(default)]
    pub role: SearchPathRole,
    /// Also probed as a texture pack. Set for a primary root that carries
    /// the pack marker.
    #[serde(default)]
    pub texture_pack: bool,
}

impl SearchPathEntry {
    pub fn new(root: impl Into<PathBuf>, role: SearchPathRole) -> Self {
        Self {
            root: root.into(),
            role,
            texture_pack: role == SearchPathRole::TexturePackOverride,
        }
    }

    pub fn normal(root: impl Into<PathBuf>) -> Self {
        Self::new(root, SearchPathRole::Normal)
    }
}

/// Describes where the host keeps its resources, used to tag raw search paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPathLayout {
    /// Directory holding the application's own resources
    #[serde(default)]
    pub resource_dir: Option<PathBuf>,
    /// Substring that marks a texture pack root
    #[serde(default = "default_texture_pack_marker")]
    pub texture_pack_marker: String,
    /// Directory that contains the marker but is not a texture pack
    #[serde(default)]
    pub excluded_pack_dir: Option<PathBuf>,
    /// Literal root naming the packaged archive (e.g. `assets/`)
    #[serde(default)]
    pub archive_root: Option<String>,
}

fn default_texture_pack_marker() -> String {
    DEFAULT_TEXTURE_PACK_MARKER.to_string()
}

impl Default for SearchPathLayout {
    fn default() -> Self {
        Self {
            resource_dir: None,
            texture_pack_marker: default_texture_pack_marker(),
            excluded_pack_dir: None,
            archive_root: None,
        }
    }
}

/// Compare two paths after canonicalization. Paths that cannot be
/// canonicalized (e.g. they don't exist) are never equivalent.
pub fn paths_equivalent(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Tag raw search paths with roles according to the layout.
///
/// A root whose path contains the texture pack marker is an override, unless
/// it is the excluded directory. The last root equivalent to the resource
/// directory (or equal to the archive root) is the primary root, and stays a
/// texture pack if it was one.
pub fn classify_search_paths(raw: &[PathBuf], layout: &SearchPathLayout) -> Vec<SearchPathEntry> {
    let mut entries: Vec<SearchPathEntry> = Vec::with_capacity(raw.len());
    let mut primary = None;

    for (idx, path) in raw.iter().enumerate() {
        let text = path.to_string_lossy();
        let mut role = SearchPathRole::Normal;

        if !layout.texture_pack_marker.is_empty() && text.contains(&layout.texture_pack_marker) {
            let excluded = layout
                .excluded_pack_dir
                .as_deref()
                .is_some_and(|dir| paths_equivalent(path, dir));
            if !excluded {
                role = SearchPathRole::TexturePackOverride;
            }
        }

        let is_primary = match (&layout.archive_root, &layout.resource_dir) {
            (Some(archive_root), _) => text == archive_root.as_str(),
            (None, Some(resource_dir)) => paths_equivalent(path, resource_dir),
            (None, None) => false,
        };
        if is_primary {
            primary = Some(idx);
        }

        entries.push(SearchPathEntry::new(path.clone(), role));
    }

    if let Some(idx) = primary {
        entries[idx].role = SearchPathRole::PrimaryResourceRoot;
    }

    entries
}

/// Indices of texture pack roots, in list order.
pub fn texture_pack_indices(entries: &[SearchPathEntry]) -> Vec<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.texture_pack)
        .map(|(i, _)| i)
        .collect()
}

/// Index of the primary resource root, if any.
pub fn primary_index(entries: &[SearchPathEntry]) -> Option<usize> {
    entries
        .iter()
        .rposition(|e| e.role == SearchPathRole::PrimaryResourceRoot)
}

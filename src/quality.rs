//! Quality tier selection and file name suffixing.
//!
//! Resources ship in up to three resolutions. The tier is picked once from the
//! display's content scale, and every logical name gets the matching suffix
//! before it is resolved: `icon-41` becomes `icon-41.png`, `icon-41-hd.png` or
//! `icon-41-uhd.png`.

use std::fmt;

use crate::constants::{IMAGE_EXTENSION, METADATA_EXTENSION};

/// Resolution variant of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QualityTier {
    #[default]
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// Pick the tier for a content scale factor.
    pub fn from_content_scale(scale: f32) -> Self {
        if scale >= 4.0 {
            QualityTier::High
        } else if scale >= 2.0 {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }

    /// Suffix inserted between the name and the extension.
    pub fn suffix(&self) -> &'static str {
        match self {
            QualityTier::Low => "",
            QualityTier::Medium => "-hd",
            QualityTier::High => "-uhd",
        }
    }

    /// Get the display name for this tier.
    pub fn name(&self) -> &'static str {
        match self {
            QualityTier::Low => "Low",
            QualityTier::Medium => "Medium",
            QualityTier::High => "High",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of file a resource name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Sprite sheet image
    Image,
    /// Frame metadata for a sprite sheet
    Metadata,
}

impl ResourceKind {
    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ResourceKind::Image => IMAGE_EXTENSION,
            ResourceKind::Metadata => METADATA_EXTENSION,
        }
    }
}

/// Append the tier suffix and extension to a bare logical name.
pub fn append_suffix(name: &str, tier: QualityTier, kind: ResourceKind) -> String {
    let mut out = String::with_capacity(name.len() + 10);
    out.push_str(name);
    out.push_str(tier.suffix());
    out.push_str(kind.extension());
    out
}

/// Whether a file name already carries a quality suffix.
pub fn has_quality_suffix(name: &str) -> bool {
    ["-hd.png", "-uhd.png", "-hd.plist", "-uhd.plist"]
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

/// Turn a name with or without extension into its tier-specific file name.
///
/// Names that already carry a quality suffix are returned unchanged. A
/// trailing `.plist` selects the metadata extension, a trailing `.png` is
/// dropped before suffixing.
pub fn suffixed_filename(raw: &str, tier: QualityTier) -> String {
    if has_quality_suffix(raw) {
        return raw.to_string();
    }

    if let Some(stem) = raw.strip_suffix(METADATA_EXTENSION) {
        append_suffix(stem, tier, ResourceKind::Metadata)
    } else {
        let stem = raw.strip_suffix(IMAGE_EXTENSION).unwrap_or(raw);
        append_suffix(stem, tier, ResourceKind::Image)
    }
}

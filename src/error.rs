//! Error types for the preload pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while preloading resources.
///
/// Everything except [`PreloadError::PoolSpawn`] and
/// [`PreloadError::WrongThread`] is local to a single resource: the pipeline
/// logs it and moves on to the next one.
#[derive(Error, Debug)]
pub enum PreloadError {
    /// No search path root contains the resource
    #[error("Resource not found: {name}")]
    PathNotFound {
        /// Logical name (with quality suffix) that was looked up
        name: String,
    },

    /// Raw bytes could not be read
    #[error("Failed to read {path:?}: {message}")]
    Read {
        /// Path that was read
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// Raw bytes could not be decoded into an image
    #[error("Failed to decode {path:?}: {message}")]
    Decode {
        /// Path of the image
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// The texture backend rejected a decoded image
    #[error("Failed to create texture for {key}: {message}")]
    TextureCreate {
        /// Cache key the texture would have been registered under
        key: String,
        /// Backend message
        message: String,
    },

    /// A frame metadata file was missing or malformed
    #[error("Invalid frame metadata in {path:?}: {message}")]
    MetadataParse {
        /// Path of the metadata file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The worker pool could not start its threads
    #[error("Failed to spawn worker pool: {0}")]
    PoolSpawn(#[source] std::io::Error),

    /// A coordinator-only operation was called from another thread
    #[error("Operation '{operation}' must run on the coordinating thread")]
    WrongThread {
        /// Name of the rejected operation
        operation: &'static str,
    },
}

impl PreloadError {
    /// Create a read error for a path.
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a decode error for a path.
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a metadata parse error for a path.
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MetadataParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a texture creation error for a cache key.
    pub fn texture(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TextureCreate {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the error only affects a single resource.
    pub fn is_resource_local(&self) -> bool {
        !matches!(self, Self::PoolSpawn(_) | Self::WrongThread { .. })
    }
}

pub type Result<T> = std::result::Result<T, PreloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_local_classification() {
        assert!(PreloadError::read("a.png", "short read").is_resource_local());
        assert!(PreloadError::decode("a.png", "bad header").is_resource_local());
        assert!(
            PreloadError::PathNotFound {
                name: "a-hd.png".into()
            }
            .is_resource_local()
        );

        let spawn = PreloadError::PoolSpawn(std::io::Error::other("no threads"));
        assert!(!spawn.is_resource_local());
        assert!(
            !PreloadError::WrongThread {
                operation: "preload_stage"
            }
            .is_resource_local()
        );
    }

    #[test]
    fn test_display_messages() {
        let err = PreloadError::texture("icons/a.png", "zero size");
        assert_eq!(
            err.to_string(),
            "Failed to create texture for icons/a.png: zero size"
        );
    }
}

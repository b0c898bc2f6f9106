//! Global constants for the preload pipeline

/// Worker threads in the preload pool.
///
/// Reading and decoding is I/O bound, so this is well above the core count.
pub const DEFAULT_WORKER_THREADS: usize = 25;

/// Extension of sprite sheet images
pub const IMAGE_EXTENSION: &str = ".png";

/// Extension of sprite sheet frame metadata
pub const METADATA_EXTENSION: &str = ".plist";

/// Prefix for texture cache keys that are not backed by a resolved file path
pub const TEXTURE_KEY_PREFIX: &str = "atlas-preload-";

/// Archive entry prefix stripped before looking up packaged assets
pub const ARCHIVE_ASSET_PREFIX: &str = "assets/";

/// Default marker identifying texture pack search paths
pub const DEFAULT_TEXTURE_PACK_MARKER: &str = "texture-loader";

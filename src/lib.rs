//! atlas_preload - parallel sprite sheet preloading
//!
//! Resolves logical resource names to files across layered search paths,
//! reads and decodes sprite sheet images on a worker pool, creates textures
//! on one coordinating thread, and attaches frame metadata in a second
//! parallel pass.

mod macros;

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod decode;
pub mod error;
pub mod handoff;
pub mod metadata;
pub mod preloader;
pub mod quality;
pub mod reader;
pub mod resolver;
pub mod search_path;
pub mod stage;
pub mod timing;
pub mod worker_pool;

mod sync;

#[cfg(test)]
mod test_support;

pub use cache::{
    CachedFrame, CpuTexture, CpuTextureFactory, FrameCache, TextureCache, TextureFactory,
    TextureHandle, WgpuTextureFactory,
};
pub use config::{ConfigError, LogLevel, PreloadConfig};
pub use constants::ARCHIVE_ASSET_PREFIX;
pub use context::{HostEnvironment, PreloadContext, PreloadState};
pub use decode::DecodedImage;
pub use error::{PreloadError, Result};
pub use metadata::{FrameMetadataSet, FrameRect, SpriteFrame};
pub use preloader::{CoordinatorThread, Preloader, StageReport};
pub use quality::{QualityTier, ResourceKind};
pub use reader::{ArchiveReader, FileReader, RawDataReader};
pub use resolver::{FsProbe, ResolvedPath, ResourcePathResolver, SearchPathProbe};
pub use search_path::{SearchPathEntry, SearchPathLayout, SearchPathRole, classify_search_paths};
pub use stage::{AssetPreloadStage, IconRange, IconType, StagePlan};
pub use timing::PhaseTimings;
pub use worker_pool::WorkerPool;

//! Headless wgpu backend for creating sampled textures from decoded RGBA images.

pub mod config;
pub mod context;
pub mod error;
pub mod texture;

pub use config::{GpuConfig, TextureConfig};
pub use context::GpuContext;
pub use error::{GpuError, Result};
pub use texture::Texture;

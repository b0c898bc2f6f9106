//! Texture and sprite frame caches, plus the texture backends.
//!
//! The texture cache is only written by the coordinating thread. The frame
//! cache is written from pool threads, so every access goes through its
//! mutex, which doubles as the pipeline's shared-state lock.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use atlas_gpu::{GpuContext, Texture, TextureConfig};

use crate::decode::DecodedImage;
use crate::error::{PreloadError, Result};
use crate::metadata::{FrameMetadataSet, SpriteFrame};
use crate::sync::{lock, read, write};

/// Creates backend textures from decoded images.
///
/// Only ever called on the coordinating thread.
pub trait TextureFactory {
    type Texture: Send + Sync + 'static;

    fn create(&self, image: DecodedImage, key: &str) -> Result<Self::Texture>;
}

/// Shared reference to a created texture.
pub struct TextureHandle<T> {
    texture: Arc<T>,
    key: Arc<str>,
    width: u32,
    height: u32,
}

impl<T> TextureHandle<T> {
    pub fn new(texture: T, key: &str, width: u32, height: u32) -> Self {
        Self {
            texture: Arc::new(texture),
            key: Arc::from(key),
            width,
            height,
        }
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    /// Key the texture is cached under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether both handles refer to the same texture.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.texture, &other.texture)
    }
}

impl<T> Clone for TextureHandle<T> {
    fn clone(&self) -> Self {
        Self {
            texture: Arc::clone(&self.texture),
            key: Arc::clone(&self.key),
            width: self.width,
            height: self.height,
        }
    }
}

impl<T> fmt::Debug for TextureHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureHandle")
            .field("key", &self.key)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Textures keyed by resolved path (or a prefixed key for textures that are
/// not backed by a file).
pub struct TextureCache<T> {
    textures: RwLock<HashMap<String, TextureHandle<T>>>,
}

impl<T> TextureCache<T> {
    pub fn new() -> Self {
        Self {
            textures: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<TextureHandle<T>> {
        read(&self.textures).get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        read(&self.textures).contains_key(key)
    }

    /// Register a texture. An existing entry wins and is returned instead.
    pub(crate) fn insert(&self, handle: TextureHandle<T>) -> TextureHandle<T> {
        write(&self.textures)
            .entry(handle.key().to_string())
            .or_insert(handle)
            .clone()
    }

    /// Drop the entry under `key`. Handles already given out stay valid.
    pub(crate) fn remove(&self, key: &str) -> Option<TextureHandle<T>> {
        write(&self.textures).remove(key)
    }

    pub fn len(&self) -> usize {
        read(&self.textures).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.textures).is_empty()
    }

    /// Sorted cache keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = read(&self.textures).keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sprite frame together with the texture it samples from.
pub struct CachedFrame<T> {
    pub frame: SpriteFrame,
    pub texture: TextureHandle<T>,
}

impl<T> Clone for CachedFrame<T> {
    fn clone(&self) -> Self {
        Self {
            frame: self.frame.clone(),
            texture: self.texture.clone(),
        }
    }
}

struct FrameState<T> {
    frames: HashMap<String, CachedFrame<T>>,
    loaded: HashSet<String>,
}

/// Sprite frames by name, plus the set of metadata files already attached.
pub struct FrameCache<T> {
    state: Mutex<FrameState<T>>,
}

impl<T> FrameCache<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FrameState {
                frames: HashMap::new(),
                loaded: HashSet::new(),
            }),
        }
    }

    /// Whether the metadata file with this logical name was attached.
    pub fn is_loaded(&self, metadata_name: &str) -> bool {
        lock(&self.state).loaded.contains(metadata_name)
    }

    /// Attach every frame in `set` to `texture` and mark `metadata_name` as
    /// loaded. Returns the number of frames added, zero if the name was
    /// already loaded.
    pub fn attach(
        &self,
        metadata_name: &str,
        set: FrameMetadataSet,
        texture: &TextureHandle<T>,
    ) -> usize {
        let mut state = lock(&self.state);
        if !state.loaded.insert(metadata_name.to_string()) {
            return 0;
        }

        let count = set.frames.len();
        for frame in set.frames {
            state.frames.insert(
                frame.name.clone(),
                CachedFrame {
                    frame,
                    texture: texture.clone(),
                },
            );
        }
        count
    }

    /// Run `f` while holding the shared-state lock.
    pub fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = lock(&self.state);
        f()
    }

    pub fn frame(&self, name: &str) -> Option<CachedFrame<T>> {
        lock(&self.state).frames.get(name).cloned()
    }

    pub fn frame_count(&self) -> usize {
        lock(&self.state).frames.len()
    }

    pub fn loaded_count(&self) -> usize {
        lock(&self.state).loaded.len()
    }
}

impl<T> Default for FrameCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Texture kept in host memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Backend that keeps pixels in host memory, for headless runs.
#[derive(Debug, Clone)]
pub struct CpuTextureFactory {
    max_dimension: u32,
}

impl CpuTextureFactory {
    pub fn new() -> Self {
        Self {
            max_dimension: 16384,
        }
    }

    /// Reject images larger than `max_dimension` on either side.
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl Default for CpuTextureFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureFactory for CpuTextureFactory {
    type Texture = CpuTexture;

    fn create(&self, image: DecodedImage, key: &str) -> Result<CpuTexture> {
        if image.width == 0 || image.height == 0 {
            return Err(PreloadError::texture(key, "image has no pixels"));
        }
        if image.width > self.max_dimension || image.height > self.max_dimension {
            return Err(PreloadError::texture(
                key,
                format!(
                    "{}x{} exceeds maximum dimension {}",
                    image.width, image.height, self.max_dimension
                ),
            ));
        }
        let expected = image.width as usize * image.height as usize * 4;
        if image.rgba.len() != expected {
            return Err(PreloadError::texture(
                key,
                format!("expected {} bytes, got {}", expected, image.rgba.len()),
            ));
        }

        Ok(CpuTexture {
            label: key.to_string(),
            width: image.width,
            height: image.height,
            rgba: image.rgba,
        })
    }
}

/// Backend that uploads textures through wgpu.
pub struct WgpuTextureFactory {
    ctx: GpuContext,
    config: TextureConfig,
}

impl WgpuTextureFactory {
    pub fn new(ctx: GpuContext) -> Self {
        log::info!(
            "Texture backend: {} ({:?})",
            ctx.adapter_info.name,
            ctx.adapter_info.backend
        );
        Self {
            ctx,
            config: TextureConfig::default(),
        }
    }
}

impl TextureFactory for WgpuTextureFactory {
    type Texture = Texture;

    fn create(&self, image: DecodedImage, key: &str) -> Result<Texture> {
        Texture::from_rgba8(
            &self.ctx,
            &image.rgba,
            image.width,
            image.height,
            &self.config,
            key,
        )
        .map_err(|e| PreloadError::texture(key, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FrameRect;

    fn handle(key: &str) -> TextureHandle<u32> {
        TextureHandle::new(7, key, 2, 2)
    }

    fn frame(name: &str) -> SpriteFrame {
        SpriteFrame {
            name: name.to_string(),
            rect: FrameRect {
                x: 0.0,
                y: 0.0,
                width: 2.0,
                height: 2.0,
            },
            rotated: false,
            offset: [0.0, 0.0],
            original_size: [2.0, 2.0],
            anchor: None,
        }
    }

    #[test]
    fn test_texture_cache_keeps_first_insert() {
        let cache = TextureCache::new();
        let first = cache.insert(handle("a.png"));
        let second = cache.insert(TextureHandle::new(9, "a.png", 4, 4));

        assert!(first.ptr_eq(&second));
        assert_eq!(*second.texture(), 7);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("a.png"));
        assert!(cache.get("b.png").is_none());
    }

    #[test]
    fn test_texture_cache_remove() {
        let cache = TextureCache::new();
        let kept = cache.insert(handle("a.png"));

        let removed = cache.remove("a.png").expect("entry removed");
        assert!(removed.ptr_eq(&kept));
        assert!(cache.is_empty());
        assert!(cache.remove("a.png").is_none());
        assert_eq!(*kept.texture(), 7);
    }

    #[test]
    fn test_frame_attach_is_idempotent() {
        let cache = FrameCache::new();
        let tex = handle("sheet.png");
        let set = FrameMetadataSet {
            format: 3,
            texture_file: None,
            frames: vec![frame("a_001.png"), frame("a_002.png")],
        };

        assert_eq!(cache.attach("sheet.plist", set.clone(), &tex), 2);
        assert_eq!(cache.attach("sheet.plist", set, &tex), 0);
        assert!(cache.is_loaded("sheet.plist"));
        assert_eq!(cache.frame_count(), 2);
        assert_eq!(cache.loaded_count(), 1);

        let cached = cache.frame("a_002.png").expect("frame registered");
        assert!(cached.texture.ptr_eq(&tex));
    }

    #[test]
    fn test_cpu_factory_validates_buffer() {
        let factory = CpuTextureFactory::new();
        let ok = factory
            .create(DecodedImage::from_rgba8("a.png", 1, 1, vec![0; 4]), "a.png")
            .expect("valid image");
        assert_eq!((ok.width, ok.height), (1, 1));

        let short = factory.create(DecodedImage::from_rgba8("b.png", 2, 2, vec![0; 4]), "b.png");
        assert!(matches!(short, Err(PreloadError::TextureCreate { .. })));

        let small = CpuTextureFactory::with_max_dimension(1);
        assert!(small
            .create(DecodedImage::from_rgba8("c.png", 2, 2, vec![0; 16]), "c.png")
            .is_err());
    }
}

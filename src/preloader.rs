//! The preload coordinator.
//!
//! A batch runs in three phases:
//!
//! - **A** (pool): read and decode every sprite sheet image, pushing results
//!   onto a [`HandoffChannel`]
//! - **B** (coordinating thread): drain the channel, create textures and
//!   register them in the [`TextureCache`]
//! - **C** (pool): read and parse each sheet's frame metadata and attach it
//!   to the texture under the [`FrameCache`] lock
//!
//! Per-batch working state lives in a slot arena that is fully built before
//! the first task is submitted and never resized afterwards. Each slot's only
//! mutable field is a write-once texture cell, set in phase B and read in
//! phase C.
//!
//! Failures of a single resource are logged and skipped. Textures created
//! before a later failure stay cached, except a texture whose own frame
//! metadata cannot be found: the coordinating thread evicts it after phase C
//! so the next batch loads it again.

use std::collections::HashSet;
use std::fmt;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};

use crate::cache::{FrameCache, TextureCache, TextureFactory, TextureHandle};
use crate::constants::{IMAGE_EXTENSION, METADATA_EXTENSION, TEXTURE_KEY_PREFIX};
use crate::context::{HostEnvironment, PreloadContext};
use crate::decode::{DecodedImage, decode_png};
use crate::error::{PreloadError, Result};
use crate::handoff::HandoffChannel;
use crate::metadata::FrameMetadataSet;
use crate::preload_log;
use crate::reader::RawDataReader;
use crate::resolver::ResourcePathResolver;
use crate::stage::{AssetPreloadStage, StagePlan, death_effect_name};
use crate::sync::lock;
use crate::timing::PhaseTimings;

/// The thread allowed to create textures and mutate the texture cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorThread {
    owner: ThreadId,
}

impl CoordinatorThread {
    /// Designate the calling thread.
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Fail with [`PreloadError::WrongThread`] off the coordinating thread.
    pub fn check(&self, operation: &'static str) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(PreloadError::WrongThread { operation })
        }
    }
}

/// Counters for one stage or batch. Diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Logical names in the request
    pub requested: usize,
    /// Names no search path root contained
    pub unresolved: usize,
    /// Names whose texture was already cached
    pub already_cached: usize,
    /// Images submitted for decoding
    pub queued: usize,
    /// Images decoded and handed to the coordinating thread
    pub decoded: usize,
    /// Textures created
    pub created: usize,
    /// Metadata files attached
    pub sheets_attached: usize,
    /// Sprite frames registered
    pub frames_attached: usize,
    /// Textures evicted because their metadata could not be loaded
    pub evicted: usize,
}

impl AddAssign for StageReport {
    fn add_assign(&mut self, other: Self) {
        self.requested += other.requested;
        self.unresolved += other.unresolved;
        self.already_cached += other.already_cached;
        self.queued += other.queued;
        self.decoded += other.decoded;
        self.created += other.created;
        self.sheets_attached += other.sheets_attached;
        self.frames_attached += other.frames_attached;
        self.evicted += other.evicted;
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested {}, unresolved {}, cached {}, queued {}, decoded {}, created {}, sheets {}, frames {}, evicted {}",
            self.requested,
            self.unresolved,
            self.already_cached,
            self.queued,
            self.decoded,
            self.created,
            self.sheets_attached,
            self.frames_attached,
            self.evicted
        )
    }
}

/// Index into a batch's slot arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotId(usize);

/// Working state for one image in a batch.
struct ImageSlot<T> {
    /// Logical name without extension
    name: String,
    path: PathBuf,
    /// Texture cache key
    key: String,
    texture: OnceLock<TextureHandle<T>>,
}

/// Runs preload stages and owns the caches they fill.
pub struct Preloader<F: TextureFactory> {
    context: PreloadContext,
    reader: Arc<dyn RawDataReader>,
    factory: F,
    textures: Arc<TextureCache<F::Texture>>,
    frames: Arc<FrameCache<F::Texture>>,
    coordinator: CoordinatorThread,
    last_timings: Mutex<Option<PhaseTimings>>,
}

impl<F: TextureFactory> Preloader<F> {
    /// Create a preloader. The calling thread becomes the coordinating thread.
    pub fn new(context: PreloadContext, reader: Arc<dyn RawDataReader>, factory: F) -> Self {
        Self {
            context,
            reader,
            factory,
            textures: Arc::new(TextureCache::new()),
            frames: Arc::new(FrameCache::new()),
            coordinator: CoordinatorThread::current(),
            last_timings: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &PreloadContext {
        &self.context
    }

    pub fn textures(&self) -> &Arc<TextureCache<F::Texture>> {
        &self.textures
    }

    pub fn frames(&self) -> &Arc<FrameCache<F::Texture>> {
        &self.frames
    }

    pub fn coordinator(&self) -> CoordinatorThread {
        self.coordinator
    }

    /// Timings of the most recent batch.
    pub fn last_timings(&self) -> Option<PhaseTimings> {
        *lock(&self.last_timings)
    }

    fn debug(&self) -> bool {
        self.context.config().debug_preload
    }

    /// Run a named stage. Composite stages run their parts in order.
    pub fn preload_stage(&self, stage: AssetPreloadStage) -> Result<StageReport> {
        self.coordinator.check("preload_stage")?;
        preload_log!(self.debug(), "preload stage: {}", stage);

        match stage.plan() {
            StagePlan::Batch(names) => self.load_assets_parallel(&names),
            StagePlan::Composite(stages) => {
                let mut report = StageReport::default();
                for part in stages {
                    report += self.preload_stage(part)?;
                }
                Ok(report)
            }
        }
    }

    /// Load the sprite sheets for a list of logical names.
    ///
    /// Only fails if the worker pool cannot be created or when called off the
    /// coordinating thread.
    pub fn load_assets_parallel(&self, names: &[String]) -> Result<StageReport> {
        self.coordinator.check("load_assets_parallel")?;

        let debug = self.debug();
        let mut timings = PhaseTimings::start();
        let state = Arc::clone(self.context.state());
        let pool = self.context.ensure_pool()?;

        let mut report = StageReport {
            requested: names.len(),
            ..StageReport::default()
        };

        preload_log!(debug, "preparing {} textures", names.len());

        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(names.len());
        for name in names {
            let image_name = format!("{}{}", name, IMAGE_EXTENSION);
            let Some(path) = state.resolver.full_path(&image_name).into_path() else {
                report.unresolved += 1;
                continue;
            };

            let key = path.to_string_lossy().into_owned();
            if self.textures.contains(&key) {
                report.already_cached += 1;
                continue;
            }
            if !seen.insert(key.clone()) {
                continue;
            }

            slots.push(ImageSlot {
                name: name.clone(),
                path,
                key,
                texture: OnceLock::new(),
            });
        }
        let slots: Arc<[ImageSlot<F::Texture>]> = slots.into();

        timings.mark_preparation();

        if slots.is_empty() {
            preload_log!(debug, "all textures already loaded, skipping pass");
            timings.mark_finish();
            *lock(&self.last_timings) = Some(timings);
            return Ok(report);
        }
        report.queued = slots.len();

        // Phase A: read and decode on the pool
        preload_log!(debug, "loading images ({} total)", slots.len());
        let channel = Arc::new(HandoffChannel::<(SlotId, DecodedImage)>::new());
        for idx in 0..slots.len() {
            let slots = Arc::clone(&slots);
            let reader = Arc::clone(&self.reader);
            let channel = Arc::clone(&channel);
            pool.submit(move || {
                let slot = &slots[idx];
                let image = reader
                    .read_all(&slot.path)
                    .and_then(|data| decode_png(&slot.path, &data));
                match image {
                    Ok(image) => channel.push((SlotId(idx), image)),
                    Err(e) => log::warn!("preload: failed to load image: {}", e),
                }
            });
        }

        // Phase B: create textures here while the pool keeps decoding
        preload_log!(debug, "initializing textures");
        loop {
            if let Some((SlotId(idx), image)) = channel.try_pop() {
                report.decoded += 1;
                if self.create_slot_texture(&slots[idx], image) {
                    report.created += 1;
                }
                continue;
            }

            if pool.is_busy() {
                thread::yield_now();
                continue;
            }

            // Every push happens before its task finishes, so once the pool
            // is idle an empty channel stays empty.
            if channel.is_empty() {
                break;
            }
        }

        timings.mark_texture_creation();
        preload_log!(
            debug,
            "initialized {} textures, adding sprite frames",
            report.created
        );

        // Phase C: attach frame metadata on the pool
        let sheets = Arc::new(AtomicUsize::new(0));
        let frames_added = Arc::new(AtomicUsize::new(0));
        let missing = Arc::new(Mutex::new(Vec::new()));
        for idx in 0..slots.len() {
            if slots[idx].texture.get().is_none() {
                continue;
            }

            let slots = Arc::clone(&slots);
            let reader = Arc::clone(&self.reader);
            let state = Arc::clone(&state);
            let frames = Arc::clone(&self.frames);
            let sheets = Arc::clone(&sheets);
            let frames_added = Arc::clone(&frames_added);
            let missing = Arc::clone(&missing);
            pool.submit(move || {
                let outcome = attach_slot_frames(
                    &slots[idx],
                    reader.as_ref(),
                    &state.resolver,
                    &frames,
                    debug,
                );
                match outcome {
                    SlotFrames::Attached(added) => {
                        sheets.fetch_add(1, Ordering::Relaxed);
                        frames_added.fetch_add(added, Ordering::Relaxed);
                    }
                    SlotFrames::AlreadyLoaded => {}
                    SlotFrames::Missing => lock(&missing).push(SlotId(idx)),
                }
            });
        }
        pool.join();

        // Texture cache writes stay on this thread
        for SlotId(idx) in lock(&missing).drain(..) {
            if self.textures.remove(&slots[idx].key).is_some() {
                report.evicted += 1;
            }
        }

        report.sheets_attached = sheets.load(Ordering::Relaxed);
        report.frames_attached = frames_added.load(Ordering::Relaxed);

        preload_log!(debug, "initialized sprite frames. done.");
        timings.mark_finish();

        if debug {
            preload_log!(debug, "Preload time estimates:");
            for line in timings.report() {
                preload_log!(debug, "{}", line);
            }
        }
        *lock(&self.last_timings) = Some(timings);

        Ok(report)
    }

    fn create_slot_texture(&self, slot: &ImageSlot<F::Texture>, image: DecodedImage) -> bool {
        match self.create_texture(image, &slot.key) {
            Some(handle) => {
                if slot.texture.set(handle).is_err() {
                    log::warn!("preload: texture for {} created twice", slot.key);
                }
                true
            }
            None => false,
        }
    }

    /// Create a texture and register it under `key`.
    fn create_texture(&self, image: DecodedImage, key: &str) -> Option<TextureHandle<F::Texture>> {
        let (width, height) = (image.width, image.height);
        match self.factory.create(image, key) {
            Ok(texture) => Some(
                self.textures
                    .insert(TextureHandle::new(texture, key, width, height)),
            ),
            Err(e) => {
                log::warn!("preload: {}", e);
                None
            }
        }
    }

    /// Read, decode and create a texture for `path` right away.
    fn load_texture_now(&self, path: &Path, key: &str) -> Option<TextureHandle<F::Texture>> {
        let image = self
            .reader
            .read_all(path)
            .and_then(|data| decode_png(path, &data));
        match image {
            Ok(image) => self.create_texture(image, key),
            Err(e) => {
                log::warn!("Failed to load texture: {}", e);
                None
            }
        }
    }

    /// Texture for a sprite sheet file name, loaded on first use.
    ///
    /// Cached under a prefixed key so it never collides with batch entries.
    pub fn texture_from_sprite_name(&self, name: &str) -> Result<Option<TextureHandle<F::Texture>>> {
        self.coordinator.check("texture_from_sprite_name")?;

        let Some(path) = self.context.state().resolver.full_path(name).into_path() else {
            return Ok(None);
        };

        let key = format!("{}{}", TEXTURE_KEY_PREFIX, path.to_string_lossy());
        if let Some(cached) = self.textures.get(&key) {
            return Ok(Some(cached));
        }

        Ok(self.load_texture_now(&path, &key))
    }

    /// Texture for in-memory PNG bytes, cached under `key`.
    pub fn add_texture_from_data(
        &self,
        key: &str,
        data: &[u8],
    ) -> Result<Option<TextureHandle<F::Texture>>> {
        self.coordinator.check("add_texture_from_data")?;

        if let Some(cached) = self.textures.get(key) {
            return Ok(Some(cached));
        }
        if data.is_empty() {
            return Ok(None);
        }

        match decode_png(Path::new(key), data) {
            Ok(image) => Ok(self.create_texture(image, key)),
            Err(e) => {
                log::warn!("Failed to init image: {}", e);
                Ok(None)
            }
        }
    }

    /// Load the sheet for death effect `id` if it isn't cached yet.
    ///
    /// Ids are 1-based and effect 1 has no sheet. Returns whether anything
    /// was loaded.
    pub fn try_load_death_effect(&self, id: u32) -> Result<bool> {
        self.coordinator.check("try_load_death_effect")?;

        if id <= 1 {
            return Ok(false);
        }

        let name = death_effect_name(id - 1);
        let state = self.context.state();
        let Some(path) = state
            .resolver
            .full_path(&format!("{}{}", name, IMAGE_EXTENSION))
            .into_path()
        else {
            return Ok(false);
        };

        let key = path.to_string_lossy().into_owned();
        if self.textures.contains(&key) {
            return Ok(false);
        }

        let Some(texture) = self.load_texture_now(&path, &key) else {
            return Ok(false);
        };

        let metadata_name = format!("{}{}", name, METADATA_EXTENSION);
        let metadata = match state.resolver.full_path(&metadata_name).into_path() {
            Some(plist) => load_metadata(self.reader.as_ref(), &plist),
            None => Err(PreloadError::PathNotFound {
                name: metadata_name.clone(),
            }),
        };
        match metadata {
            Ok(set) => {
                self.frames.attach(&metadata_name, set, &texture);
            }
            Err(e) => log::warn!("Failed to load frames for {}: {}", name, e),
        }

        Ok(true)
    }

    /// Replace the host environment and start over with a fresh scan and pool.
    ///
    /// Cached textures and frames are kept.
    pub fn reset(&mut self, host: HostEnvironment) -> Result<()> {
        self.coordinator.check("reset")?;
        self.context.reset(host)
    }

    /// Stop the worker threads. The next batch starts a new pool.
    pub fn shutdown(&self) {
        self.context.destroy_pool();
    }
}

fn load_metadata(reader: &dyn RawDataReader, path: &Path) -> Result<FrameMetadataSet> {
    let data = reader.read_all(path)?;
    FrameMetadataSet::parse(path, &data)
}

/// Result of phase C for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotFrames {
    /// Metadata attached with this many frames
    Attached(usize),
    AlreadyLoaded,
    /// No readable metadata, the texture has to go
    Missing,
}

/// Attach a slot's frame metadata.
fn attach_slot_frames<T>(
    slot: &ImageSlot<T>,
    reader: &dyn RawDataReader,
    resolver: &ResourcePathResolver,
    frames: &FrameCache<T>,
    debug: bool,
) -> SlotFrames {
    let Some(texture) = slot.texture.get() else {
        return SlotFrames::Missing;
    };

    let metadata_name = format!("{}{}", slot.name, METADATA_EXTENSION);
    if frames.is_loaded(&metadata_name) {
        preload_log!(debug, "already contains, skipping {}", metadata_name);
        return SlotFrames::AlreadyLoaded;
    }

    let plist_path = slot.path.with_extension("plist");
    let metadata = load_metadata(reader, &plist_path).or_else(|e| {
        preload_log!(
            debug,
            "no metadata at {:?} ({}), trying slower fallback option",
            plist_path,
            e
        );
        let fallback = frames.exclusive(|| resolver.full_path(&metadata_name));
        match fallback.into_path() {
            Some(path) => {
                preload_log!(debug, "attempted fallback: {:?}", path);
                load_metadata(reader, &path)
            }
            None => Err(PreloadError::PathNotFound {
                name: metadata_name.clone(),
            }),
        }
    });

    match metadata {
        Ok(set) => SlotFrames::Attached(frames.attach(&metadata_name, set, texture)),
        Err(e) => {
            log::warn!("preload: failed to find the plist for {:?}: {}", slot.path, e);
            SlotFrames::Missing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CpuTextureFactory;
    use crate::config::PreloadConfig;
    use crate::search_path::{SearchPathEntry, SearchPathRole};
    use crate::test_support::{MemoryAssets, png_bytes};
    use std::time::Duration;

    fn preloader_with(
        assets: Arc<MemoryAssets>,
        workers: usize,
        search_paths: Vec<SearchPathEntry>,
    ) -> Preloader<CpuTextureFactory> {
        let config = PreloadConfig {
            worker_threads: workers,
            debug_preload: true,
            ..PreloadConfig::new()
        };
        let host = HostEnvironment::new(search_paths, 1.0);
        let context = PreloadContext::new(config, host, assets.clone());
        Preloader::new(context, assets, CpuTextureFactory::new())
    }

    fn preloader(assets: Arc<MemoryAssets>, workers: usize) -> Preloader<CpuTextureFactory> {
        preloader_with(
            assets,
            workers,
            vec![SearchPathEntry::new("res", SearchPathRole::PrimaryResourceRoot)],
        )
    }

    fn sheet_names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("sheet_{:02}", i)).collect()
    }

    #[test]
    fn test_death_effect_stage_loads_textures_and_frames() {
        let assets = Arc::new(MemoryAssets::new());
        for id in 1..20 {
            assets.insert_sheet("res", &death_effect_name(id));
        }
        let preloader = preloader(assets, 4);

        let report = preloader
            .preload_stage(AssetPreloadStage::DeathEffect)
            .expect("stage runs");

        assert_eq!(report.requested, 19);
        assert_eq!(report.created, 19);
        assert_eq!(report.sheets_attached, 19);
        assert_eq!(preloader.textures().len(), 19);
        assert!(preloader.frames().is_loaded("PlayerExplosion_07.plist"));

        let frame = preloader
            .frames()
            .frame("PlayerExplosion_07_001.png")
            .expect("frame registered");
        assert_eq!(frame.texture.key(), "res/PlayerExplosion_07.png");
        assert!(preloader.last_timings().is_some());
    }

    #[test]
    fn test_rerun_does_no_work() {
        let assets = Arc::new(MemoryAssets::new());
        for name in sheet_names(5) {
            assets.insert_sheet("res", &name);
        }
        let preloader = preloader(Arc::clone(&assets), 2);

        preloader.load_assets_parallel(&sheet_names(5)).expect("first run");
        let reads = assets.read_count();

        let report = preloader.load_assets_parallel(&sheet_names(5)).expect("second run");
        assert_eq!(report.already_cached, 5);
        assert_eq!(report.queued, 0);
        assert_eq!(report.created, 0);
        assert_eq!(assets.read_count(), reads);
        assert_eq!(preloader.textures().len(), 5);
    }

    #[test]
    fn test_injected_read_errors_are_skipped() {
        let assets = Arc::new(MemoryAssets::new());
        let names = sheet_names(20);
        for name in &names {
            assets.insert_sheet("res", name);
        }
        assets.fail_reads_of("res/sheet_03.png");
        assets.fail_reads_of("res/sheet_17.png");
        let preloader = preloader(assets, 8);

        let report = preloader.load_assets_parallel(&names).expect("batch runs");

        assert_eq!(report.queued, 20);
        assert_eq!(report.created, 18);
        assert_eq!(preloader.textures().len(), 18);
        assert!(!preloader.textures().contains("res/sheet_03.png"));
        assert_eq!(preloader.frames().loaded_count(), 18);
    }

    #[test]
    fn test_waits_for_slow_workers() {
        let assets = Arc::new(MemoryAssets::with_delay(Duration::from_millis(15)));
        let names = sheet_names(6);
        for name in &names {
            assets.insert_sheet("res", name);
        }
        let preloader = preloader(assets, 2);

        let report = preloader.load_assets_parallel(&names).expect("batch runs");

        assert_eq!(report.decoded, 6);
        assert_eq!(report.created, 6);
        assert_eq!(preloader.frames().loaded_count(), 6);
    }

    #[test]
    fn test_cube_stage_resolves_every_name_once() {
        let assets = Arc::new(MemoryAssets::new());
        for id in [1, 2, 40, 485] {
            assets.insert_sheet("res", &format!("icons/player_{:02}", id));
        }
        assets.insert("res/icons/player_03.png", b"not a png".to_vec());
        let preloader = preloader(assets, 4);

        let report = preloader
            .preload_stage(AssetPreloadStage::Cube)
            .expect("stage runs");

        assert_eq!(preloader.context().state().resolver.lookup_count(), 486);
        assert_eq!(report.requested, 486);
        assert_eq!(report.unresolved, 481);
        assert_eq!(report.queued, 5);
        assert_eq!(report.created, 4);
        assert_eq!(preloader.textures().len(), 4);
        assert!(preloader.frames().frame("player_485_001.png").is_some());
    }

    #[test]
    fn test_duplicate_names_in_batch_load_once() {
        let assets = Arc::new(MemoryAssets::new());
        assets.insert_sheet("res", "a");
        let preloader = preloader(assets, 2);

        let names = vec!["a".to_string(), "a".to_string()];
        let report = preloader.load_assets_parallel(&names).expect("batch runs");
        assert_eq!(report.queued, 1);
        assert_eq!(report.created, 1);
    }

    #[test]
    fn test_missing_metadata_evicts_texture() {
        let assets = Arc::new(MemoryAssets::new());
        assets.insert("res/lonely.png", png_bytes(2, 2));
        assets.insert_sheet("res", "fine");
        let preloader = preloader(assets, 2);

        let names = vec!["lonely".to_string(), "fine".to_string()];
        let report = preloader.load_assets_parallel(&names).expect("batch runs");

        assert_eq!(report.created, 2);
        assert_eq!(report.sheets_attached, 1);
        assert_eq!(report.evicted, 1);
        assert!(!preloader.textures().contains("res/lonely.png"));
        assert!(preloader.textures().contains("res/fine.png"));
        assert!(!preloader.frames().is_loaded("lonely.plist"));
    }

    #[test]
    fn test_unreadable_metadata_is_retried_next_batch() {
        let assets = Arc::new(MemoryAssets::new());
        assets.insert_sheet("res", "a");
        assets.fail_reads_of("res/a.plist");
        let preloader = preloader(Arc::clone(&assets), 2);

        let first = preloader
            .load_assets_parallel(&["a".to_string()])
            .expect("first batch");
        assert_eq!(first.created, 1);
        assert_eq!(first.evicted, 1);
        assert!(!preloader.textures().contains("res/a.png"));

        assets.allow_reads_of("res/a.plist");
        let second = preloader
            .load_assets_parallel(&["a".to_string()])
            .expect("second batch");
        assert_eq!(second.already_cached, 0);
        assert_eq!(second.queued, 1);
        assert_eq!(second.sheets_attached, 1);
        assert_eq!(second.evicted, 0);
        assert!(preloader.textures().contains("res/a.png"));
        assert!(preloader.frames().is_loaded("a.plist"));
    }

    #[test]
    fn test_fully_cached_batch_records_timings() {
        let assets = Arc::new(MemoryAssets::new());
        let preloader = preloader(assets, 1);
        assert!(preloader.last_timings().is_none());

        let report = preloader
            .load_assets_parallel(&["nothing".to_string()])
            .expect("batch runs");

        assert_eq!(report.unresolved, 1);
        let timings = preloader.last_timings().expect("timings recorded");
        assert!(timings.total() >= timings.preparation());
    }

    #[test]
    fn test_metadata_falls_back_to_resolver() {
        let assets = Arc::new(MemoryAssets::new());
        assets.insert("pack/a.png", png_bytes(2, 2));
        assets.insert_sheet("res", "a");
        let preloader = preloader_with(
            assets,
            2,
            vec![
                SearchPathEntry::new("pack", SearchPathRole::TexturePackOverride),
                SearchPathEntry::new("res", SearchPathRole::PrimaryResourceRoot),
            ],
        );

        let report = preloader
            .load_assets_parallel(&["a".to_string()])
            .expect("batch runs");

        assert_eq!(report.sheets_attached, 1);
        let frame = preloader.frames().frame("a_001.png").expect("frame");
        assert_eq!(frame.texture.key(), "pack/a.png");
    }

    #[test]
    fn test_metadata_attach_is_idempotent_across_paths() {
        let assets = Arc::new(MemoryAssets::new());
        assets.insert_sheet("res", "a");
        assets.insert_sheet("other", "a");
        let mut preloader = preloader(Arc::clone(&assets), 2);

        preloader
            .load_assets_parallel(&["a".to_string()])
            .expect("first batch");

        // Same logical name now resolves to a different file
        let host = HostEnvironment::new(
            vec![SearchPathEntry::new("other", SearchPathRole::PrimaryResourceRoot)],
            1.0,
        );
        preloader.reset(host).expect("reset");
        let report = preloader
            .load_assets_parallel(&["a".to_string()])
            .expect("second batch");

        assert_eq!(report.created, 1);
        assert_eq!(report.sheets_attached, 0);
        assert_eq!(preloader.frames().loaded_count(), 1);
        assert_eq!(preloader.textures().len(), 2);
    }

    #[test]
    fn test_operations_rejected_off_coordinating_thread() {
        let assets = Arc::new(MemoryAssets::new());
        let preloader = preloader(assets, 1);

        thread::scope(|s| {
            let handle = s.spawn(|| {
                (
                    preloader.preload_stage(AssetPreloadStage::Wave).err(),
                    preloader.texture_from_sprite_name("a.png").err(),
                    preloader.try_load_death_effect(3).err(),
                )
            });
            let (stage, sprite, death) = handle.join().expect("thread finished");
            assert!(matches!(stage, Some(PreloadError::WrongThread { .. })));
            assert!(matches!(sprite, Some(PreloadError::WrongThread { .. })));
            assert!(matches!(death, Some(PreloadError::WrongThread { .. })));
        });

        assert!(preloader.coordinator().is_current());
        assert!(!preloader.context().has_pool());
    }

    #[test]
    fn test_texture_from_sprite_name_uses_prefixed_key() {
        let assets = Arc::new(MemoryAssets::new());
        assets.insert("res/button.png", png_bytes(3, 1));
        let preloader = preloader(assets, 1);

        let first = preloader
            .texture_from_sprite_name("button.png")
            .expect("coordinating thread")
            .expect("texture");
        let second = preloader
            .texture_from_sprite_name("button.png")
            .expect("coordinating thread")
            .expect("texture");

        assert!(first.ptr_eq(&second));
        assert_eq!(first.key(), "atlas-preload-res/button.png");
        assert_eq!((first.width(), first.height()), (3, 1));
        assert!(
            preloader
                .texture_from_sprite_name("missing.png")
                .expect("coordinating thread")
                .is_none()
        );
    }

    #[test]
    fn test_add_texture_from_data() {
        let preloader = preloader(Arc::new(MemoryAssets::new()), 1);

        let tex = preloader
            .add_texture_from_data("avatar", &png_bytes(2, 2))
            .expect("coordinating thread")
            .expect("texture");
        let again = preloader
            .add_texture_from_data("avatar", &[])
            .expect("coordinating thread")
            .expect("cached texture");
        assert!(tex.ptr_eq(&again));

        assert!(
            preloader
                .add_texture_from_data("empty", &[])
                .expect("coordinating thread")
                .is_none()
        );
        assert!(
            preloader
                .add_texture_from_data("garbage", b"nope")
                .expect("coordinating thread")
                .is_none()
        );
    }

    #[test]
    fn test_try_load_death_effect() {
        let assets = Arc::new(MemoryAssets::new());
        assets.insert_sheet("res", "PlayerExplosion_02");
        let preloader = preloader(assets, 1);

        assert!(!preloader.try_load_death_effect(1).expect("coordinating thread"));
        assert!(preloader.try_load_death_effect(3).expect("coordinating thread"));
        assert!(preloader.textures().contains("res/PlayerExplosion_02.png"));
        assert!(preloader.frames().is_loaded("PlayerExplosion_02.plist"));
        assert!(!preloader.try_load_death_effect(3).expect("coordinating thread"));
        assert!(!preloader.try_load_death_effect(9).expect("coordinating thread"));
    }

    #[test]
    fn test_composite_stage_sums_reports() {
        let assets = Arc::new(MemoryAssets::new());
        assets.insert_sheet("res", "PlayerExplosion_05");
        assets.insert_sheet("res", "icons/dart_03");
        let preloader = preloader(assets, 2);

        let report = preloader
            .preload_stage(AssetPreloadStage::All)
            .expect("stage runs");

        let expected = 19 + 486 + 168 + 119 + 149 + 96 + (68 + 69 + 43 + 8);
        assert_eq!(report.requested, expected);
        assert_eq!(report.created, 2);
        assert_eq!(report.sheets_attached, 2);
    }
}

//! State that lives across preload batches.
//!
//! The scan of the host environment (quality tier, texture pack roots,
//! primary resource root) runs once, on first use. Concurrent first callers
//! block until that single scan finishes. [`PreloadContext::reset`] throws
//! the scan away, including every cached path resolution, and recreates the
//! worker pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use web_time::Instant;

use crate::config::PreloadConfig;
use crate::error::Result;
use crate::preload_log;
use crate::quality::QualityTier;
use crate::resolver::{ResourcePathResolver, SearchPathProbe};
use crate::search_path::SearchPathEntry;
use crate::sync::lock;
use crate::worker_pool::WorkerPool;

/// What the host tells the preloader about its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct HostEnvironment {
    /// Classified search path roots, in host order
    pub search_paths: Vec<SearchPathEntry>,
    /// Display content scale factor
    pub content_scale: f32,
}

impl HostEnvironment {
    pub fn new(search_paths: Vec<SearchPathEntry>, content_scale: f32) -> Self {
        Self {
            search_paths,
            content_scale,
        }
    }
}

/// Result of scanning the host environment.
pub struct PreloadState {
    pub tier: QualityTier,
    pub resolver: ResourcePathResolver,
}

impl PreloadState {
    fn scan(host: &HostEnvironment, probe: Arc<dyn SearchPathProbe>, debug: bool) -> Self {
        let start = Instant::now();

        let tier = QualityTier::from_content_scale(host.content_scale);
        let resolver = ResourcePathResolver::new(host.search_paths.clone(), tier, probe);

        preload_log!(debug, "initialized preload state in {:?}", start.elapsed());
        preload_log!(debug, "texture quality: {}", tier);
        preload_log!(
            debug,
            "texture packs: {}",
            resolver.texture_pack_indices().len()
        );
        match resolver.primary_index() {
            Some(idx) => preload_log!(
                debug,
                "game resources path ({}): {:?}",
                idx,
                resolver.entries()[idx].root
            ),
            None => preload_log!(debug, "game resources path: <not found>"),
        }

        Self { tier, resolver }
    }
}

/// Owns the lazily scanned state and the worker pool.
pub struct PreloadContext {
    config: PreloadConfig,
    host: HostEnvironment,
    probe: Arc<dyn SearchPathProbe>,
    state: OnceLock<Arc<PreloadState>>,
    pool: Mutex<Option<Arc<WorkerPool>>>,
    scans: AtomicUsize,
}

impl PreloadContext {
    pub fn new(
        config: PreloadConfig,
        host: HostEnvironment,
        probe: Arc<dyn SearchPathProbe>,
    ) -> Self {
        Self {
            config,
            host,
            probe,
            state: OnceLock::new(),
            pool: Mutex::new(None),
            scans: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &PreloadConfig {
        &self.config
    }

    pub fn host(&self) -> &HostEnvironment {
        &self.host
    }

    /// Scanned state, computed on first call.
    pub fn state(&self) -> &Arc<PreloadState> {
        self.state.get_or_init(|| {
            self.scans.fetch_add(1, Ordering::SeqCst);
            Arc::new(PreloadState::scan(
                &self.host,
                Arc::clone(&self.probe),
                self.config.debug_preload,
            ))
        })
    }

    /// Number of scans performed so far.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// The worker pool, created on first call.
    pub fn ensure_pool(&self) -> Result<Arc<WorkerPool>> {
        let mut pool = lock(&self.pool);
        if let Some(existing) = pool.as_ref() {
            return Ok(Arc::clone(existing));
        }

        log::debug!(
            "Creating worker pool with {} threads",
            self.config.worker_threads
        );
        let created = Arc::new(WorkerPool::new(self.config.worker_threads)?);
        *pool = Some(Arc::clone(&created));
        Ok(created)
    }

    /// Drop the worker pool. Threads exit once in-flight work finishes.
    pub fn destroy_pool(&self) {
        if lock(&self.pool).take().is_some() {
            log::debug!("Destroying worker pool");
        }
    }

    pub fn has_pool(&self) -> bool {
        lock(&self.pool).is_some()
    }

    /// Replace the host environment, rescan, and recreate the pool.
    pub fn reset(&mut self, host: HostEnvironment) -> Result<()> {
        log::info!("Resetting preload state");
        self.host = host;
        self.state = OnceLock::new();
        self.state();

        self.destroy_pool();
        self.ensure_pool()?;
        Ok(())
    }
}

//! Command-line driver: runs one preload stage against a set of search paths.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;
    use std::process::ExitCode;
    use std::sync::Arc;

    use atlas_gpu::{GpuConfig, GpuContext};
    use atlas_preload::{
        ARCHIVE_ASSET_PREFIX, ArchiveReader, AssetPreloadStage, CpuTextureFactory, FileReader,
        FsProbe, HostEnvironment, PreloadConfig, PreloadContext, Preloader, RawDataReader,
        SearchPathProbe, TextureFactory, WgpuTextureFactory, classify_search_paths,
    };
    use clap::Parser;

    /// Preload sprite sheet textures from a set of search paths.
    #[derive(Parser, Debug)]
    #[command(name = "atlas-preload", version)]
    struct Args {
        /// Configuration file (defaults to the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Keep textures in host memory instead of uploading them to the GPU
        #[arg(long)]
        headless: bool,

        /// Display content scale factor
        #[arg(long, default_value_t = 1.0)]
        scale: f32,

        /// Zip archive holding packaged resources under `assets/`
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Skip preloading for this run
        #[arg(long)]
        skip_preload: bool,

        /// Log `preload:` diagnostics and phase timings
        #[arg(long)]
        debug_preload: bool,

        /// Stage to run (death-effect, cube, ship, ball, ufo, wave, other,
        /// all-without-death-effects, all)
        stage: String,

        /// Search path roots in host order
        #[arg(required = true)]
        search_paths: Vec<PathBuf>,
    }

    pub fn main() -> ExitCode {
        let args = Args::parse();

        let mut config = match &args.config {
            Some(path) => match PreloadConfig::load(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to load config {:?}: {}", path, e);
                    return ExitCode::FAILURE;
                }
            },
            None => PreloadConfig::load_from_default_path().unwrap_or_default(),
        };
        config.skip_preload |= args.skip_preload;
        config.debug_preload |= args.debug_preload;

        let mut level = config.log_level.to_level_filter();
        if config.debug_preload {
            level = level.max(log::LevelFilter::Debug);
        }
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .init();

        let Some(stage) = AssetPreloadStage::parse(&args.stage) else {
            let names: Vec<&str> = AssetPreloadStage::all().iter().map(|s| s.name()).collect();
            eprintln!("Unknown stage '{}', expected one of: {}", args.stage, names.join(", "));
            return ExitCode::FAILURE;
        };

        if config.forced_skip_preload() {
            log::info!("Preloading is disabled, nothing to do");
            return ExitCode::SUCCESS;
        }

        let archive = args.archive.as_deref().map(|path| Arc::new(ArchiveReader::open(path)));
        let archive_root = archive.as_ref().map(|_| ARCHIVE_ASSET_PREFIX.to_string());
        let entries = classify_search_paths(&args.search_paths, &config.layout(archive_root));

        let (probe, reader): (Arc<dyn SearchPathProbe>, Arc<dyn RawDataReader>) = match archive {
            Some(archive) => (
                archive.clone() as Arc<dyn SearchPathProbe>,
                archive as Arc<dyn RawDataReader>,
            ),
            None => (Arc::new(FsProbe), Arc::new(FileReader::new())),
        };

        let host = HostEnvironment::new(entries, args.scale);
        let context = PreloadContext::new(config, host, probe);

        if args.headless {
            return run(Preloader::new(context, reader, CpuTextureFactory::new()), stage);
        }

        match GpuContext::new_blocking(GpuConfig::default()) {
            Ok(ctx) => run(
                Preloader::new(context, reader, WgpuTextureFactory::new(ctx)),
                stage,
            ),
            Err(e) => {
                log::error!("Failed to initialize GPU: {} (try --headless)", e);
                ExitCode::FAILURE
            }
        }
    }

    fn run<F: TextureFactory>(preloader: Preloader<F>, stage: AssetPreloadStage) -> ExitCode {
        let report = match preloader.preload_stage(stage) {
            Ok(report) => report,
            Err(e) => {
                log::error!("Preload failed: {}", e);
                return ExitCode::FAILURE;
            }
        };

        println!("{}: {}", stage, report);
        println!(
            "textures cached: {}, frames cached: {}",
            preloader.textures().len(),
            preloader.frames().frame_count()
        );
        if let Some(timings) = preloader.last_timings() {
            for line in timings.report() {
                println!("{}", line);
            }
        }

        preloader.shutdown();
        ExitCode::SUCCESS
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    cli::main()
}

// The preloader has no browser entry point
#[cfg(target_arch = "wasm32")]
fn main() {}

//! Logging macros for the preload pipeline.

/// Log a pipeline diagnostic at debug level with a `preload:` prefix, only
/// when the first argument is true.
///
/// # Usage
///
/// ```ignore
/// preload_log!(config.debug_preload, "preparing {} textures", names.len());
/// ```
#[macro_export]
macro_rules! preload_log {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            log::debug!("preload: {}", format_args!($($arg)+));
        }
    };
}

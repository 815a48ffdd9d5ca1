//! # Logger module
//!
//! Logging setup for binaries, tests and benchmarks using the library.
//!
//! The library itself only emits `tracing` events: strategy switches and backend
//! construction at `debug`, runs at `info`, configuration errors at `error`.

use tracing::Level;

/// Initialize the tracing subscriber with the default level INFO
///
/// The level can be overridden with the `RUST_LOG` environment variable.
///
/// # Example
/// ```no_run
/// use optdriver::logger::init_logger;
///
/// init_logger();
/// tracing::info!("Application started");
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Initialize the tracing subscriber with a custom default level
///
/// Only the first call installs a subscriber; later calls do nothing.
///
/// # Example
/// ```no_run
/// use optdriver::logger::init_logger_with_level;
/// use tracing::Level;
///
/// init_logger_with_level(Level::DEBUG);
/// tracing::debug!("Debug logging enabled");
/// ```
pub fn init_logger_with_level(default_level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}

#[cfg(test)]
mod tests_logger {
    use super::*;

    #[test]
    /// Test that initializing the logger more than once does not panic
    fn test_init_logger_twice() {
        init_logger_with_level(Level::DEBUG);
        init_logger();
        tracing::debug!("logger initialized");
    }
}

//! Logging bootstrap shared by the controller manager and the runner agent.
mod config;
mod error;
mod format;
mod level;
mod subscriber;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;

/// Installs the process-wide tracing subscriber.
///
/// Call once from `main` before anything logs; later calls fail with
/// [`LoggerError::AlreadyInitialized`].
///
/// ```rust
/// let cfg = garc_observe::LoggerConfig::from_flags("info", "json").unwrap();
/// garc_observe::init_logger(&cfg).unwrap();
/// tracing::info!(runner = "ci/example", "reconciled");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    subscriber::install(cfg)
}

//! Structured logging via `tracing`.
//!
//! The terminal UI owns stdout, so interactive runs log to a file; `--print`
//! runs log to stderr. `$RFX_LOG` (EnvFilter syntax) beats the configured
//! level.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::{AppError, Result};

/// Environment variable holding a filter directive.
pub const LOG_ENV: &str = "RFX_LOG";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// Default log file under the platform state (or cache) directory.
pub fn default_log_file() -> Result<PathBuf> {
    let base = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .ok_or_else(|| AppError::Config("Could not determine a directory for the log file".into()))?;
    Ok(base.join("rfx").join("rfx.log"))
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::Config(format!("Failed to create log directory {}: {}", parent.display(), e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::Config(format!("Failed to open log file {}: {}", path.display(), e)))
}

/// Install the global subscriber.
pub fn init_logging(level: &str, target: &LogTarget) -> Result<()> {
    let base = Registry::default().with(build_env_filter(level));
    let layer = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339());

    let installed = match target {
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            base.with(layer.with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
        LogTarget::Stderr => base.with(layer.with_writer(std::io::stderr)).try_init(),
    };
    installed.map_err(|e| AppError::Config(format!("Failed to install logger: {}", e)))
}

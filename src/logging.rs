//! Tracing setup: stdout plus a per-run log file.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// `sheets_sync_YYYYMMDD_HHMMSS.log` for the given start time.
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("sheets_sync_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Create `dir` if needed and open a fresh log file named after `started`.
pub fn create_log_file(dir: &Path, started: DateTime<Local>) -> io::Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(log_file_name(started));
    let file = File::create(&path)?;
    Ok((file, path))
}

/// Initialize logging to stdout and to a timestamped file under `log_dir`.
///
/// Uses the `RUST_LOG` env var if set, otherwise falls back to the provided
/// level. Returns the log file path.
pub fn init(log_level: &str, log_dir: &Path) -> io::Result<PathBuf> {
    let (file, path) = create_log_file(log_dir, Local::now())?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    tracing::info!("Log file created at: {}", path.display());
    Ok(path)
}

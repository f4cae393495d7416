//! Log setup. The TUI owns the terminal, so events go to a file in the data
//! directory instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_NAME: &str = "taskdeck.log";
const MAX_FILTER_LEN: usize = 4096;

pub fn log_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_FILE_NAME)
}

/// `RUST_LOG` wins when it parses; empty, oversized or invalid values fall
/// back to `fallback` (the configured level), then to `info`
pub fn build_filter(rust_log: Option<&str>, fallback: &str) -> EnvFilter {
    rust_log
        .map(str::trim)
        .filter(|raw| !raw.is_empty() && raw.len() <= MAX_FILTER_LEN)
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .or_else(|| EnvFilter::try_new(fallback.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the global subscriber writing to `<data_dir>/taskdeck.log`
pub fn init(data_dir: &Path, level: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(data_dir)?;
    let path = log_file_path(data_dir);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), level);

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter)
        .try_init();

    Ok(path)
}

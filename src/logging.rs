//! Tracing setup for the command line.

use std::path::Path;

use color_eyre::eyre::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Level used when nothing else is configured.
const DEFAULT_LEVEL: &str = "error";

/// Pick the filter: explicit flag, then `RUST_LOG`, then the config file.
fn filter(flag: Option<&str>, configured: &str) -> Result<EnvFilter> {
    if let Some(level) = flag {
        return EnvFilter::try_new(level.to_lowercase())
            .with_context(|| format!("Invalid log level '{level}'"));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = if configured.trim().is_empty() {
        DEFAULT_LEVEL.to_string()
    } else {
        configured.to_lowercase()
    };
    EnvFilter::try_new(&level).with_context(|| format!("Invalid log level '{level}' in config"))
}

/// Install the global subscriber. Logs go to stderr, and also to `file` when
/// given. The returned guard must live until the program ends.
pub fn init(flag: Option<&str>, configured: &str, file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = filter(flag, configured)?;

    let (file_layer, guard) = match file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).without_time())
        .with(file_layer)
        .init();

    Ok(guard)
}

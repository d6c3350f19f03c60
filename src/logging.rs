//! Console plus run-log-file logging.

use std::{
    fs::{self, File},
    path::Path,
    sync::Arc,
};

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber: human output on stderr plus a plain
/// (non-ANSI) layer appending to the run log. The log file is cleared
/// first so each run starts with a fresh one.
pub fn init(log_file: &Path) -> Result<()> {
    if log_file.exists() {
        fs::remove_file(log_file)?;
    }
    let file = File::create(log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to install logging: {e}"))?;

    Ok(())
}

//! Re-runs only the normalization stage over raw files already on disk.

use std::fs;

use anyhow::Result;
use tracing::info;

use crate::config::RunConfig;
use crate::logging;
use crate::regularize::regularize_dir;

pub async fn regularize() -> Result<String> {
    let config = RunConfig::from_env()?;
    fs::create_dir_all(config.raw_dir())?;
    fs::create_dir_all(config.regular_dir())?;
    logging::init(&config.log_file())?;
    info!(
        start = %config.start_date,
        end = %config.end_date,
        "regularizing existing raw files"
    );

    let written = regularize_dir(
        &config.raw_dir(),
        &config.regular_dir(),
        config.start_date,
        config.end_date,
    )?;

    Ok(format!(
        "{} series regularized to `{}`",
        written,
        config.regular_dir().display()
    ))
}

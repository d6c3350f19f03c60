//! The full pipeline: catalogue, spatial filter, source selection, fetch,
//! regularize.

use std::fs;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::create_spinner;
use crate::config::RunConfig;
use crate::download::EaClient;
use crate::fetch::{self, FetchStrategy, StationOutcome};
use crate::logging;
use crate::regularize::regularize_dir;
use crate::station::stations_in_bbox;

pub async fn run() -> Result<String> {
    let config = RunConfig::from_env()?;
    prepare_run(&config)?;
    logging::init(&config.log_file())?;
    info!(
        start = %config.start_date,
        end = %config.end_date,
        root = %config.root_path.display(),
        "starting rainfall run"
    );

    let client = EaClient::new();

    let bar = create_spinner("Fetching station catalogue...".to_string());
    let catalogue = client.fetch_stations().await?;
    bar.finish_with_message("Station catalogue fetched");

    let selected = stations_in_bbox(&catalogue, &config.bbox);
    info!(
        selected = selected.len(),
        catalogue = catalogue.len(),
        "stations inside bounding box"
    );

    let strategy = fetch::select_strategy(Utc::now().date_naive(), config.start_date);
    info!(?strategy, "source selected");

    let report = match strategy {
        FetchStrategy::Recent => fetch::recent::fetch_recent(&client, &config, &selected).await?,
        FetchStrategy::Historical => {
            fetch::archive::fetch_archive(&client, &config, &selected).await?
        }
    };

    for outcome in report.failures() {
        if let StationOutcome::Failed {
            station_reference,
            reason,
        } = outcome
        {
            warn!(station = %station_reference, %reason, "station not written");
        }
    }

    let regularized = regularize_dir(
        &config.raw_dir(),
        &config.regular_dir(),
        config.start_date,
        config.end_date,
    )?;

    fs::write(
        config.success_marker(),
        format!("{}\n", Utc::now().to_rfc3339()),
    )?;
    info!("run complete");

    Ok(format!(
        "{} stations written, {} empty, {} failed; {} series regularized to `{}`",
        report.written(),
        report.empty(),
        report.failed(),
        regularized,
        config.regular_dir().display()
    ))
}

/// Creates the output tree and clears the run-control artifacts. Raw
/// station files from earlier runs are left in place, so a rerun with a
/// different window can leave stale files alongside the new ones.
fn prepare_run(config: &RunConfig) -> Result<()> {
    fs::create_dir_all(config.raw_dir())?;
    fs::create_dir_all(config.regular_dir())?;

    let marker = config.success_marker();
    if marker.exists() {
        fs::remove_file(marker)?;
    }

    Ok(())
}

//! Per-station fetching from the near-real-time readings feed.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::cli::create_progress_bar;
use crate::config::RunConfig;
use crate::download::EaClient;
use crate::fetch::{FetchReport, StationOutcome};
use crate::series::write_series;
use crate::station::Station;

/// Fetches the window for each station in turn and writes one raw CSV per
/// station that returned data. One station's failure never stops the loop.
pub async fn fetch_recent(
    client: &EaClient,
    config: &RunConfig,
    stations: &[Station],
) -> Result<FetchReport> {
    let raw_dir = config.raw_dir();
    let bar = create_progress_bar(
        stations.len() as u64,
        "Fetching station readings".to_string(),
    );

    let mut outcomes = Vec::with_capacity(stations.len());
    for station in stations {
        let outcome = fetch_station(client, config, &raw_dir, station).await;
        if let StationOutcome::Written {
            station_reference,
            rows,
        } = &outcome
        {
            info!(station = %station_reference, rows, "raw series written");
        }
        outcomes.push(outcome);
        bar.inc(1);
    }
    bar.finish_with_message("Station readings fetched");

    Ok(FetchReport { outcomes })
}

async fn fetch_station(
    client: &EaClient,
    config: &RunConfig,
    raw_dir: &Path,
    station: &Station,
) -> StationOutcome {
    let station_reference = station.station_reference.clone();

    let readings = match client
        .fetch_station_readings(&station.station_reference, config.start_date, config.end_date)
        .await
    {
        Ok(readings) => readings,
        Err(e) => {
            return StationOutcome::Failed {
                station_reference,
                reason: e.to_string(),
            }
        }
    };

    if readings.is_empty() {
        return StationOutcome::Empty { station_reference };
    }

    match write_series(&raw_dir.join(station.file_label()), &readings) {
        Ok(()) => StationOutcome::Written {
            station_reference,
            rows: readings.len(),
        },
        Err(e) => StationOutcome::Failed {
            station_reference,
            reason: e.to_string(),
        },
    }
}

// -- Tests -------------------------------------------------------------------

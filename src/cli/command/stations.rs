//! Prints the stations the configured bounding box selects, without
//! fetching any readings.

use anyhow::Result;

use crate::cli::create_spinner;
use crate::config::RunConfig;
use crate::download::EaClient;
use crate::station::stations_in_bbox;

pub async fn stations() -> Result<String> {
    let config = RunConfig::from_env()?;
    let client = EaClient::new();

    let bar = create_spinner("Fetching station catalogue...".to_string());
    let catalogue = client.fetch_stations().await?;
    bar.finish_with_message("Station catalogue fetched");

    let selected = stations_in_bbox(&catalogue, &config.bbox);
    for station in &selected {
        println!(
            "{:<12} easting {:>8.0}  northing {:>8.0}",
            station.station_reference, station.easting, station.northing
        );
    }

    Ok(format!(
        "{} of {} stations inside the bounding box",
        selected.len(),
        catalogue.len()
    ))
}

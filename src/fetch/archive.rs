//! Historical fetching from the per-day bulk archive.
//!
//! One CSV per calendar day covers every station in the country; rows are
//! filtered down to the selected stations' measures, accumulated across
//! the whole window, then partitioned by station.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cli::create_progress_bar;
use crate::config::RunConfig;
use crate::download::EaClient;
use crate::fetch::{FetchReport, StationOutcome};
use crate::series::{parse_timestamp, write_series, Reading};
use crate::station::Station;

/// Fetches every archive day in the window, accumulates the rows matching
/// the selected stations, and writes one raw CSV per station with data.
/// Days without an archive or whose fetch fails outright are logged and
/// skipped; a station with no rows anywhere in the window is reported as
/// failed. None of these aborts the run.
pub async fn fetch_archive(
    client: &EaClient,
    config: &RunConfig,
    stations: &[Station],
) -> Result<FetchReport> {
    let measure_ids: HashSet<&str> = stations.iter().filter_map(|s| s.primary_measure()).collect();
    let days = days_in_window(config.start_date, config.end_date);
    let scale = config.archive_unit.scale();

    let bar = create_progress_bar(days.len() as u64, "Fetching daily archives".to_string());
    let mut accumulated: Vec<(String, Reading)> = Vec::new();
    for day in days {
        match client.fetch_archive_day(day).await {
            Ok(Some(body)) => {
                let rows = parse_archive_body(&body, &measure_ids, scale);
                debug!(%day, rows = rows.len(), "archive day parsed");
                accumulated.extend(rows);
            }
            Ok(None) => debug!(%day, "archive day skipped"),
            // One unreachable day must not sink the whole window.
            Err(e) => warn!(%day, reason = %e, "archive day fetch failed"),
        }
        bar.inc(1);
    }
    bar.finish_with_message("Daily archives fetched");
    info!(rows = accumulated.len(), "archive rows accumulated");

    Ok(write_grouped_series(config, stations, accumulated))
}

fn days_in_window(start_date: NaiveDate, end_date: NaiveDate) -> Vec<NaiveDate> {
    start_date
        .iter_days()
        .take_while(|day| *day <= end_date)
        .collect()
}

/// Row shape of the `readings-full-{date}.csv` archive files. The files
/// carry more columns than these; serde ignores the rest.
#[derive(Debug, Deserialize)]
struct ArchiveRow {
    #[serde(rename = "dateTime")]
    date_time: String,
    measure: String,
    value: String,
    #[serde(rename = "stationReference")]
    station_reference: String,
}

/// Extracts `(stationReference, Reading)` pairs for the wanted measures.
/// Rows that fail to parse (the archive occasionally carries multi-valued
/// or non-numeric `value` cells) are dropped.
fn parse_archive_body(
    body: &str,
    measure_ids: &HashSet<&str>,
    scale: f64,
) -> Vec<(String, Reading)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.deserialize::<ArchiveRow>() {
        let row = match record {
            Ok(row) => row,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };

        if !measure_ids.contains(row.measure.as_str()) {
            continue;
        }

        let timestamp = match parse_timestamp(&row.date_time) {
            Ok(timestamp) => timestamp,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        let value = match row.value.trim().parse::<f64>() {
            Ok(value) => value * scale,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };

        rows.push((row.station_reference, Reading { timestamp, value }));
    }

    if dropped > 0 {
        debug!(dropped, "unparseable archive rows dropped");
    }

    rows
}

/// Groups accumulated rows by station and writes one raw CSV per selected
/// station that has any. Row order within a station follows archive order,
/// which is chronological across days.
fn write_grouped_series(
    config: &RunConfig,
    stations: &[Station],
    accumulated: Vec<(String, Reading)>,
) -> FetchReport {
    let raw_dir = config.raw_dir();

    let mut groups: HashMap<String, Vec<Reading>> = HashMap::new();
    for (station_reference, reading) in accumulated {
        groups.entry(station_reference).or_default().push(reading);
    }

    let mut outcomes = Vec::with_capacity(stations.len());
    for station in stations {
        let station_reference = station.station_reference.clone();
        let outcome = match groups.remove(&station.station_reference) {
            Some(readings) => match write_series(&raw_dir.join(station.file_label()), &readings) {
                Ok(()) => StationOutcome::Written {
                    station_reference,
                    rows: readings.len(),
                },
                Err(e) => StationOutcome::Failed {
                    station_reference,
                    reason: e.to_string(),
                },
            },
            None => StationOutcome::Failed {
                station_reference,
                reason: "no readings in any archive day".to_string(),
            },
        };

        if let StationOutcome::Written {
            station_reference,
            rows,
        } = &outcome
        {
            info!(station = %station_reference, rows, "raw series written");
        }
        outcomes.push(outcome);
    }

    FetchReport { outcomes }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::Measure;
    use tempfile::TempDir;

    const ARCHIVE_BODY: &str = "\
dateTime,measure,value,stationReference
2023-01-01T00:15:00Z,http://example.org/measures/A-rain,0.2,A
2023-01-01T00:15:00Z,http://example.org/measures/X-level,3.1,X
2023-01-01T00:30:00Z,http://example.org/measures/A-rain,0.4,A
2023-01-01T00:30:00Z,http://example.org/measures/A-rain,0.1|0.2,A
";

    fn measure_set() -> HashSet<&'static str> {
        HashSet::from(["http://example.org/measures/A-rain"])
    }

    fn station(reference: &str) -> Station {
        Station {
            station_reference: reference.to_string(),
            easting: 400_000.0,
            northing: 550_000.0,
            measures: vec![Measure {
                id: format!("http://example.org/measures/{reference}-rain"),
            }],
        }
    }

    fn config_in(dir: &TempDir) -> RunConfig {
        let config = RunConfig::from_lookup(|key| match key {
            "DATA_PATH" => Some(dir.path().to_string_lossy().to_string()),
            "RUN_START_DATE" => Some("2023-01-01".to_string()),
            "RUN_END_DATE" => Some("2023-01-02".to_string()),
            _ => None,
        })
        .unwrap();
        std::fs::create_dir_all(config.raw_dir()).unwrap();
        config
    }

    #[test]
    fn should_keep_only_selected_measures() {
        let rows = parse_archive_body(ARCHIVE_BODY, &measure_set(), 1.0);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|(reference, _)| reference == "A"));
        assert_eq!(rows[0].1.value, 0.2);
        assert_eq!(rows[1].1.value, 0.4);
    }

    #[test]
    fn should_scale_archive_values() {
        let rows = parse_archive_body(ARCHIVE_BODY, &measure_set(), 0.25);

        assert_eq!(rows[0].1.value, 0.05);
        assert_eq!(rows[1].1.value, 0.1);
    }

    #[test]
    fn should_drop_unparseable_value_cells() {
        // The `0.1|0.2` row is dropped, not treated as an error.
        let rows = parse_archive_body(ARCHIVE_BODY, &measure_set(), 1.0);

        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn should_list_every_day_in_window_inclusive() {
        let days = days_in_window(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
        );

        assert_eq!(days.len(), 3);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(days[2], NaiveDate::from_ymd_opt(2023, 1, 3).unwrap());
    }

    #[test]
    fn should_write_grouped_stations_and_fail_missing_ones() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let stations = vec![station("A"), station("B")];
        let accumulated = parse_archive_body(ARCHIVE_BODY, &measure_set(), 1.0);

        let report = write_grouped_series(&config, &stations, accumulated);

        // Station A is written even though station B failed.
        assert_eq!(report.written(), 1);
        assert_eq!(report.failed(), 1);
        assert!(config.raw_dir().join("A_400000_550000.csv").exists());
        assert!(!config.raw_dir().join("B_400000_550000.csv").exists());
    }

    #[tokio::test]
    async fn should_skip_unreachable_archive_days_and_still_report() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        // Nothing listens here, so every day's request fails at the
        // transport level; the loop must finish and grouping must still
        // produce an outcome per station.
        let client = EaClient::with_root_url("http://127.0.0.1:1");
        let stations = vec![station("A")];

        let report = fetch_archive(&client, &config, &stations).await.unwrap();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.outcomes[0].station_reference(), "A");
    }

    #[test]
    fn should_accumulate_rows_across_days() {
        // Rows from two separate archive bodies both survive grouping.
        let day_two = "\
dateTime,measure,value,stationReference
2023-01-02T00:15:00Z,http://example.org/measures/A-rain,1.2,A
";
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let mut accumulated = parse_archive_body(ARCHIVE_BODY, &measure_set(), 1.0);
        accumulated.extend(parse_archive_body(day_two, &measure_set(), 1.0));

        let report = write_grouped_series(&config, &[station("A")], accumulated);

        assert_eq!(report.written(), 1);
        let readings =
            crate::series::read_series(&config.raw_dir().join("A_400000_550000.csv")).unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[2].value, 1.2);
    }
}

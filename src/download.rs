//! HTTP client for the Environment Agency flood-monitoring API.
//!
//! Three read-only endpoints: the station catalogue (JSON), the rolling
//! near-real-time readings feed (JSON, per station), and the daily archive
//! dump (CSV, per date).

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::series::{parse_timestamp, Reading};
use crate::station::Station;

pub const EA_ROOT_URL: &str = "http://environment.data.gov.uk/flood-monitoring";

pub struct EaClient {
    client: reqwest::Client,
    root_url: String,
}

impl EaClient {
    pub fn new() -> Self {
        Self::with_root_url(EA_ROOT_URL)
    }

    /// Client against an alternative root, for tests.
    pub fn with_root_url(root_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            root_url: root_url.into(),
        }
    }

    /// Fetches the full rainfall station catalogue. Any failure here is
    /// fatal for the run: with no stations there is no work.
    pub async fn fetch_stations(&self) -> Result<Vec<Station>> {
        let url = format!("{}/id/stations?parameter=rainfall", self.root_url);
        debug!(%url, "fetching station catalogue");

        let body: Value = self
            .client
            .get(&url)
            .send()
            .await
            .context("station catalogue request failed")?
            .error_for_status()
            .context("station catalogue request rejected")?
            .json()
            .await
            .context("station catalogue is not valid JSON")?;

        parse_stations(&body)
    }

    /// Fetches the readings for one station over the window from the
    /// near-real-time feed. Empty `items` is a valid response.
    pub async fn fetch_station_readings(
        &self,
        station_reference: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Reading>> {
        let url = format!(
            "{}/id/measures/{}-rainfall-tipping_bucket_raingauge-t-15_min-mm/readings?parameter=rainfall&startdate={}&enddate={}",
            self.root_url, station_reference, start_date, end_date
        );
        debug!(%url, "fetching station readings");

        let body: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_readings(&body)
    }

    /// Fetches one day's full archive CSV. A non-success status means the
    /// archive for that day does not exist (too recent or too old) and is
    /// reported as `None`, not as an error.
    pub async fn fetch_archive_day(&self, date: NaiveDate) -> Result<Option<String>> {
        let url = format!("{}/archive/readings-full-{}.csv", self.root_url, date);
        debug!(%url, "fetching daily archive");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("archive request for {date} failed"))?;

        if !response.status().is_success() {
            debug!(%date, status = %response.status(), "no archive for day");
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("reading archive body for {date}"))?;

        Ok(Some(body))
    }
}

/// Parses the catalogue `items` array. Entries that do not deserialize
/// (a handful of catalogue records lack coordinates, and field types have
/// drifted before) are skipped rather than failing the whole fetch, with
/// the drop count logged.
fn parse_stations(body: &Value) -> Result<Vec<Station>> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("station catalogue has no `items` array"))?;

    let mut stations = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for item in items {
        match serde_json::from_value::<Station>(item.clone()) {
            Ok(station) => stations.push(station),
            Err(_) => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, "malformed station catalogue entries skipped");
    }

    Ok(stations)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadingItem {
    date_time: String,
    value: f64,
}

fn parse_readings(body: &Value) -> Result<Vec<Reading>> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("readings response has no `items` array"))?;

    let mut readings = Vec::with_capacity(items.len());
    for item in items {
        let item: ReadingItem = serde_json::from_value(item.clone())
            .map_err(|e| anyhow!("malformed reading item: {e}"))?;
        readings.push(Reading {
            timestamp: parse_timestamp(&item.date_time)?,
            value: item.value,
        });
    }

    Ok(readings)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_parse_catalogue_items() {
        let body = json!({
            "items": [
                {
                    "stationReference": "1234",
                    "easting": 400000.7,
                    "northing": 550000.2,
                    "measures": [{"@id": "http://example.org/measures/1234-rainfall"}]
                },
                {
                    "stationReference": "5678",
                    "easting": 356000.0,
                    "northing": 535000.0,
                    "measures": []
                }
            ]
        });

        let stations = parse_stations(&body).unwrap();

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].station_reference, "1234");
        assert_eq!(
            stations[0].primary_measure(),
            Some("http://example.org/measures/1234-rainfall")
        );
        assert_eq!(stations[1].primary_measure(), None);
    }

    #[test]
    fn should_skip_catalogue_items_without_coordinates() {
        let body = json!({
            "items": [
                {"stationReference": "no-coords"},
                {"stationReference": "ok", "easting": 1.0, "northing": 2.0}
            ]
        });

        let stations = parse_stations(&body).unwrap();

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].station_reference, "ok");
    }

    #[test]
    fn should_skip_catalogue_items_with_wrong_field_types() {
        // An easting serialized as a string is dropped, not propagated.
        let body = json!({
            "items": [
                {"stationReference": "bad", "easting": "400000", "northing": 550000.0},
                {"stationReference": "ok", "easting": 1.0, "northing": 2.0}
            ]
        });

        let stations = parse_stations(&body).unwrap();

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].station_reference, "ok");
    }

    #[test]
    fn should_fail_on_catalogue_without_items() {
        let body = json!({"meta": {}});

        assert!(parse_stations(&body).is_err());
    }

    #[test]
    fn should_parse_reading_items() {
        let body = json!({
            "items": [
                {"dateTime": "2023-06-20T00:15:00Z", "value": 0.2},
                {"dateTime": "2023-06-20T00:30:00Z", "value": 0.0}
            ]
        });

        let readings = parse_readings(&body).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, 0.2);
        assert_eq!(
            readings[0].timestamp,
            parse_timestamp("2023-06-20T00:15:00Z").unwrap()
        );
    }

    #[test]
    fn should_accept_empty_readings() {
        let body = json!({"items": []});

        assert!(parse_readings(&body).unwrap().is_empty());
    }

    #[test]
    fn should_fail_on_malformed_reading_item() {
        let body = json!({"items": [{"dateTime": "2023-06-20T00:15:00Z"}]});

        assert!(parse_readings(&body).is_err());
    }
}

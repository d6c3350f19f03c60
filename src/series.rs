//! Per-station time series and their CSV representation.
//!
//! Raw files hold the readings exactly as fetched (irregular, possibly
//! gappy); regularized files hold every 15-minute grid slot, with blanks
//! where no reading existed.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// One timestamped rainfall measurement, in mm.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

const HEADER: [&str; 2] = ["dateTime", "value"];

/// Writes a raw series, one `dateTime,value` row per reading, in order.
pub fn write_series(path: &Path, readings: &[Reading]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(HEADER)?;
    for reading in readings {
        writer.write_record([
            reading
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            reading.value.to_string(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}

/// Reads a raw series back, preserving row order.
pub fn read_series(path: &Path) -> Result<Vec<Reading>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;

    let mut readings = Vec::new();
    for record in reader.records() {
        let record = record?;
        let timestamp = record
            .get(0)
            .ok_or_else(|| anyhow!("row without a timestamp in {}", path.display()))?;
        let value = record
            .get(1)
            .ok_or_else(|| anyhow!("row without a value in {}", path.display()))?;

        readings.push(Reading {
            timestamp: parse_timestamp(timestamp)?,
            value: value
                .trim()
                .parse::<f64>()
                .with_context(|| format!("bad value `{value}` in {}", path.display()))?,
        });
    }

    Ok(readings)
}

/// Writes a regularized series. Slots without a reading get an empty
/// value field rather than a zero.
pub fn write_regular_series(path: &Path, slots: &[(DateTime<Utc>, Option<f64>)]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(HEADER)?;
    for (timestamp, value) in slots {
        writer.write_record([
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            value.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}

/// Accepts both RFC 3339 offsets (`Z`, `+01:00`) and the offset-free
/// timestamps some archive rows carry, which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    raw.parse::<chrono::NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|e| anyhow!("bad timestamp `{raw}`: {e}"))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utc(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn should_round_trip_a_raw_series() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("1234_400000_550000.csv");
        let readings = vec![
            Reading {
                timestamp: utc("2023-06-20T00:15:00Z"),
                value: 0.2,
            },
            Reading {
                timestamp: utc("2023-06-20T00:45:00Z"),
                value: 0.0,
            },
            Reading {
                timestamp: utc("2023-06-20T00:30:00Z"),
                value: 1.4,
            },
        ];

        write_series(&path, &readings).unwrap();
        let reread = read_series(&path).unwrap();

        // Order is preserved exactly, including the out-of-order row.
        assert_eq!(reread, readings);
    }

    #[test]
    fn should_write_blank_for_missing_slots() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gauge.csv");
        let slots = vec![
            (utc("2023-06-20T00:00:00Z"), Some(0.2)),
            (utc("2023-06-20T00:15:00Z"), None),
        ];

        write_regular_series(&path, &slots).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();

        assert_eq!(
            contents,
            "dateTime,value\n2023-06-20T00:00:00Z,0.2\n2023-06-20T00:15:00Z,\n"
        );
    }

    #[test]
    fn should_parse_offset_free_timestamps_as_utc() {
        let dt = parse_timestamp("2023-06-20T00:15:00").unwrap();

        assert_eq!(dt, utc("2023-06-20T00:15:00Z"));
    }

    #[test]
    fn should_reject_garbage_timestamps() {
        assert!(parse_timestamp("not-a-date").is_err());
    }
}

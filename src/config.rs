//! Run configuration, read once at startup from environment variables.
//!
//! Every component receives a `RunConfig` by reference; nothing else in the
//! crate reads the environment.

use std::{env, path::PathBuf};

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;

use crate::station::BoundingBox;

/// Unit assumption for values in the daily archive files. The upstream
/// documentation does not say whether they are depths (mm per 15-minute
/// slot) or intensities (mm/h), so the choice is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveUnit {
    /// Values are mm per slot and are written as-is. The default.
    Millimetres,
    /// Values are mm/h and are divided by 4 to get the 15-minute depth.
    MillimetresPerHour,
}

impl ArchiveUnit {
    pub fn scale(&self) -> f64 {
        match self {
            ArchiveUnit::Millimetres => 1.0,
            ArchiveUnit::MillimetresPerHour => 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bbox: BoundingBox,
    pub root_path: PathBuf,
    pub archive_unit: ArchiveUnit,
}

impl RunConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Split out from `from_env` so
    /// tests can supply values without mutating process state.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let start_date = parse_date(&get, "RUN_START_DATE", "2023-06-20")?;
        let end_date = parse_date(&get, "RUN_END_DATE", "2023-06-30")?;

        if start_date > end_date {
            bail!(
                "RUN_START_DATE {} is after RUN_END_DATE {}",
                start_date,
                end_date
            );
        }

        let bbox = BoundingBox {
            easting_low: parse_f64(&get, "BB_E_L", 355_000.0)?,
            northing_low: parse_f64(&get, "BB_N_L", 534_000.0)?,
            easting_high: parse_f64(&get, "BB_E_U", 440_000.0)?,
            northing_high: parse_f64(&get, "BB_N_U", 609_000.0)?,
        };

        if bbox.easting_low >= bbox.easting_high {
            bail!(
                "bounding box easting range is empty: {} >= {}",
                bbox.easting_low,
                bbox.easting_high
            );
        }
        if bbox.northing_low >= bbox.northing_high {
            bail!(
                "bounding box northing range is empty: {} >= {}",
                bbox.northing_low,
                bbox.northing_high
            );
        }

        // When deployed the data volume is mounted at /data; locally we
        // default to a directory next to the binary.
        let default_root = match get("DEPLOY_MODE").as_deref() {
            Some("deploy") => "/data",
            _ => "./data",
        };
        let root_path = PathBuf::from(get("DATA_PATH").unwrap_or_else(|| default_root.to_string()));

        let archive_unit = match get("ARCHIVE_UNIT").as_deref() {
            None | Some("mm") => ArchiveUnit::Millimetres,
            Some("mm-per-hour") => ArchiveUnit::MillimetresPerHour,
            Some(other) => bail!("ARCHIVE_UNIT must be `mm` or `mm-per-hour`, got `{other}`"),
        };

        Ok(RunConfig {
            start_date,
            end_date,
            bbox,
            root_path,
            archive_unit,
        })
    }

    /// Directory holding one raw CSV per station.
    pub fn raw_dir(&self) -> PathBuf {
        self.root_path.join("outputs").join("EA")
    }

    /// Directory holding the regularized 15-minute CSVs.
    pub fn regular_dir(&self) -> PathBuf {
        self.raw_dir().join("15min")
    }

    pub fn log_file(&self) -> PathBuf {
        self.raw_dir().join("run.log")
    }

    pub fn success_marker(&self) -> PathBuf {
        self.raw_dir().join("success")
    }
}

fn parse_date(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<NaiveDate> {
    let raw = get(key).unwrap_or_else(|| default.to_string());
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| anyhow!("{key} `{raw}` is not a YYYY-MM-DD date: {e}"))
}

fn parse_f64(get: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> Result<f64> {
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|e| anyhow!("{key} `{raw}` is not a number: {e}")),
        None => Ok(default),
    }
}

// -- Tests -------------------------------------------------------------------

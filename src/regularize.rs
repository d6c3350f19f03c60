//! Reindexes raw station series onto the fixed 15-minute UTC grid.
//!
//! Runs over whatever raw CSVs are on disk, so the output is identical
//! whichever source strategy produced them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::warn;

use crate::cli::create_progress_bar;
use crate::series::{read_series, write_regular_series, Reading};

/// The complete grid for a window: midnight UTC at `start_date` through
/// midnight at `end_date + 1 day`, inclusive, in 15-minute steps.
pub fn fifteen_minute_grid(start_date: NaiveDate, end_date: NaiveDate) -> Vec<DateTime<Utc>> {
    let mut slot = start_date.and_time(NaiveTime::MIN).and_utc();
    let last = (end_date + Duration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc();

    let mut grid = Vec::new();
    while slot <= last {
        grid.push(slot);
        slot += Duration::minutes(15);
    }

    grid
}

/// Copies readings onto the grid at exact-timestamp matches; every other
/// slot stays missing. No interpolation.
pub fn regularize_series(
    grid: &[DateTime<Utc>],
    readings: &[Reading],
) -> Vec<(DateTime<Utc>, Option<f64>)> {
    let by_time: HashMap<DateTime<Utc>, f64> = readings
        .iter()
        .map(|reading| (reading.timestamp, reading.value))
        .collect();

    grid.iter()
        .map(|slot| (*slot, by_time.get(slot).copied()))
        .collect()
}

/// Regularizes every raw CSV in `raw_dir` into `out_dir` under the same
/// filename. A file that fails to parse (e.g. a partial leftover from a
/// crashed run) is logged and skipped. Returns the number written.
pub fn regularize_dir(
    raw_dir: &Path,
    out_dir: &Path,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<usize> {
    let files = raw_csv_files(raw_dir)?;
    let grid = fifteen_minute_grid(start_date, end_date);

    let bar = create_progress_bar(files.len() as u64, "Regularizing station series".to_string());
    let mut written = 0usize;
    for file in &files {
        match read_series(file) {
            Ok(readings) => {
                let slots = regularize_series(&grid, &readings);
                let name = file.file_name().context("raw file without a name")?;
                write_regular_series(&out_dir.join(name), &slots)?;
                written += 1;
            }
            Err(e) => warn!(file = %file.display(), reason = %e, "skipping unreadable raw file"),
        }
        bar.inc(1);
    }
    bar.finish_with_message("Station series regularized");

    Ok(written)
}

/// The CSVs directly inside `raw_dir`; the `15min` subdirectory and the
/// run-control files do not match.
fn raw_csv_files(raw_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in raw_dir
        .read_dir()
        .with_context(|| format!("reading {}", raw_dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

// -- Tests -------------------------------------------------------------------

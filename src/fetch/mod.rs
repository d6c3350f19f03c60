//! Source selection and per-station fetch outcomes.

pub mod archive;
pub mod recent;

use chrono::NaiveDate;

/// The live readings feed only serves a rolling window this many days deep.
const RECENT_WINDOW_DAYS: i64 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Per-station requests against the near-real-time feed.
    Recent,
    /// Per-day bulk archive downloads, partitioned by station afterwards.
    Historical,
}

/// Picks the data source for a window starting at `start_date`, as seen
/// from `today`. Start dates up to 28 days back are still served by the
/// live feed; anything older needs the archive.
pub fn select_strategy(today: NaiveDate, start_date: NaiveDate) -> FetchStrategy {
    if (today - start_date).num_days() <= RECENT_WINDOW_DAYS {
        FetchStrategy::Recent
    } else {
        FetchStrategy::Historical
    }
}

/// Result of handling one station. Failures are data, not control flow:
/// the fetch loops never abort on a single station.
#[derive(Debug, Clone, PartialEq)]
pub enum StationOutcome {
    /// A raw CSV was written with this many readings.
    Written { station_reference: String, rows: usize },
    /// The source had no readings for the window; no file was written.
    Empty { station_reference: String },
    /// Fetching, parsing, or writing failed for this station.
    Failed {
        station_reference: String,
        reason: String,
    },
}

impl StationOutcome {
    pub fn station_reference(&self) -> &str {
        match self {
            StationOutcome::Written {
                station_reference, ..
            }
            | StationOutcome::Empty { station_reference }
            | StationOutcome::Failed {
                station_reference, ..
            } => station_reference,
        }
    }
}

/// Collected outcomes for one fetch phase.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<StationOutcome>,
}

impl FetchReport {
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, StationOutcome::Written { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, StationOutcome::Empty { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StationOutcome::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &StationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, StationOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&StationOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn should_select_recent_at_exactly_28_days() {
        let strategy = select_strategy(date(2024, 1, 29), date(2024, 1, 1));

        assert_eq!(strategy, FetchStrategy::Recent);
    }

    #[test]
    fn should_select_historical_at_29_days() {
        let strategy = select_strategy(date(2024, 1, 29), date(2023, 12, 31));

        assert_eq!(strategy, FetchStrategy::Historical);
    }

    #[test]
    fn should_select_recent_for_current_and_future_starts() {
        assert_eq!(
            select_strategy(date(2024, 1, 29), date(2024, 1, 29)),
            FetchStrategy::Recent
        );
        assert_eq!(
            select_strategy(date(2024, 1, 29), date(2024, 2, 1)),
            FetchStrategy::Recent
        );
    }

    #[test]
    fn should_tally_outcomes() {
        let report = FetchReport {
            outcomes: vec![
                StationOutcome::Written {
                    station_reference: "a".to_string(),
                    rows: 10,
                },
                StationOutcome::Empty {
                    station_reference: "b".to_string(),
                },
                StationOutcome::Failed {
                    station_reference: "c".to_string(),
                    reason: "boom".to_string(),
                },
            ],
        };

        assert_eq!(report.written(), 1);
        assert_eq!(report.empty(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.failures().map(|o| o.station_reference()).collect::<Vec<_>>(),
            vec!["c"]
        );
    }
}

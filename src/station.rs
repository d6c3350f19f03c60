//! Station catalogue entries and the bounding-box spatial filter.

use serde::Deserialize;

/// One sensor/parameter feed attached to a station. Only the opaque `@id`
/// URI matters here; it is the key the daily archive files use.
#[derive(Debug, Clone, Deserialize)]
pub struct Measure {
    #[serde(rename = "@id")]
    pub id: String,
}

/// A rainfall gauge from the station catalogue. Coordinates are OSGB
/// eastings/northings in metres.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub station_reference: String,
    pub easting: f64,
    pub northing: f64,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

impl Station {
    /// The measure id the archive rows for this station are keyed by.
    pub fn primary_measure(&self) -> Option<&str> {
        self.measures.first().map(|m| m.id.as_str())
    }

    /// Filename for this station's artifacts: the reference plus the
    /// integer-truncated coordinates, so the location stays readable.
    pub fn file_label(&self) -> String {
        format!(
            "{}_{}_{}.csv",
            self.station_reference, self.easting as i64, self.northing as i64
        )
    }
}

/// Rectangular extent in the same projected coordinate system as the
/// station eastings/northings. Ordering is validated at config load.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub easting_low: f64,
    pub easting_high: f64,
    pub northing_low: f64,
    pub northing_high: f64,
}

impl BoundingBox {
    /// Strict inequalities: a station exactly on an edge is outside.
    pub fn contains(&self, station: &Station) -> bool {
        station.easting > self.easting_low
            && station.easting < self.easting_high
            && station.northing > self.northing_low
            && station.northing < self.northing_high
    }
}

/// Returns the stations inside the box, preserving catalogue order.
pub fn stations_in_bbox(stations: &[Station], bbox: &BoundingBox) -> Vec<Station> {
    stations
        .iter()
        .filter(|s| bbox.contains(s))
        .cloned()
        .collect()
}

// -- Tests -------------------------------------------------------------------

//! Gauge stations and location resolution.

use crate::fetch::MaskProvider;
use hydrobench_core::errors::{BenchError, BenchResult};
use hydrobench_core::field::PointSpec;
use hydrobench_core::spatial::Selection;
use serde::{Deserialize, Serialize};

/// A rain gauge with its coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Station {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

const fn station(name: &'static str, lat: f64, lon: f64) -> Station {
    Station { name, lat, lon }
}

/// Gauges of the Beas and Sutlej catchments.
pub const BEAS_STATIONS: &[Station] = &[
    station("Arki", 31.154, 76.964),
    station("Banjar", 31.65, 77.34),
    station("Banjar IMD", 31.637, 77.344),
    station("Berthin", 31.471, 76.622),
    station("Bhakra", 31.424, 76.417),
    station("Barantargh", 31.087, 76.608),
    station("Bharmaur", 32.45, 76.533),
    station("Bhoranj", 31.648, 76.698),
    station("Bhuntar", 31.88, 77.15),
    station("Churah", 32.833, 76.167),
    station("Dadahu", 30.599, 77.437),
    station("Daslehra", 31.4, 76.55),
    station("Dehra", 31.885, 76.218),
    station("Dhaula Kuan", 30.517, 77.479),
    station("Ganguwal", 31.25, 76.486),
    station("Ghanauli", 30.994, 76.527),
    station("Ghumarwin", 31.436, 76.708),
    station("Hamirpur", 31.684, 76.519),
    station("Janjehl", 31.52, 77.22),
    station("Jogindernagar", 32.036, 76.734),
    station("Jubbal", 31.12, 77.67),
    station("Kalatop", 32.552, 76.018),
    station("Kalpa", 31.54, 78.258),
    station("Kandaghat", 30.965, 77.119),
    station("Kangra", 32.103, 76.271),
    station("Karsog", 31.383, 77.2),
    station("Kasol", 31.357, 76.878),
    station("Kaza", 32.225, 78.072),
    station("Kotata", 31.233, 76.534),
    station("Kothai", 31.119, 77.485),
    station("Kumarsain", 31.317, 77.45),
    station("Larji", 31.80, 77.19),
    station("Lohard", 31.204, 76.561),
    station("Mashobra", 31.13, 77.229),
    station("Nadaun", 31.783, 76.35),
    station("Nahan", 30.559, 77.289),
    station("Naina Devi", 31.279, 76.554),
    station("Nangal", 31.368, 76.404),
    station("Olinda", 31.401, 76.385),
    station("Pachhad", 30.777, 77.164),
    station("Palampur", 32.107, 76.543),
    station("Pandoh", 31.67, 77.06),
    station("Paonta Sahib", 30.47, 77.625),
    station("Rakuna", 30.605, 77.473),
    station("Rampur", 31.454, 77.644),
    station("Rampur IMD", 31.452, 77.633),
    station("Rohru", 31.204, 77.751),
    station("Sadar-Bilarspur", 31.348, 76.762),
    station("Sadar-Mandi", 31.712, 76.933),
    station("Sainj", 31.77, 77.31),
    station("Salooni", 32.728, 76.034),
    station("Sarkaghat", 31.704, 76.812),
    station("Sujanpur", 31.832, 76.503),
    station("Sundernargar", 31.534, 76.905),
    station("Suni", 31.238, 77.108),
    station("Suni IMD", 31.23, 77.164),
    station("Swaghat", 31.713, 76.746),
    station("Theog", 31.124, 77.347),
];

/// Looks up a gauge by name, ignoring ASCII case.
pub fn find_station(name: &str) -> BenchResult<PointSpec> {
    BEAS_STATIONS
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
        .map(|s| PointSpec::new(s.lat, s.lon))
        .ok_or_else(|| BenchError::UnknownStation(name.to_string()))
}

/// Where a benchmark is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Explicit coordinates in degrees
    Point { lat: f64, lon: f64 },
    /// A named rain gauge
    Station(String),
    /// A named catchment resolved through a mask provider
    Basin(String),
}

impl Location {
    /// Resolves to a spatial selection.
    pub fn resolve(&self, masks: &dyn MaskProvider) -> BenchResult<Selection> {
        match self {
            Location::Point { lat, lon } => Ok(Selection::Point(PointSpec::new(*lat, *lon))),
            Location::Station(name) => find_station(name).map(Selection::Point),
            Location::Basin(name) => masks.basin_mask(name).map(Selection::Basin),
        }
    }
}

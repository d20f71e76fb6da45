//! Labelled gridded precipitation fields.
//!
//! A [`GriddedField`] stores its values as a four-dimensional array with axes
//! `[time, member, latitude, longitude]`. Sources without an ensemble axis get
//! a member axis of length one. Construction validates the named axes so a
//! missing or misnamed coordinate fails immediately with a descriptive error
//! rather than surfacing later as an indexing problem.
//!
//! # Examples
//!
//! ```rust
//! use hydrobench_core::calendar::{Calendar, TimeAxis};
//! use hydrobench_core::field::{GriddedField, NamedAxis};
//! use hydrobench_core::units::Units;
//! use ndarray::{Array, IxDyn};
//!
//! // A model dataset stored as [lon, lat, time]
//! let values = Array::from_shape_vec(IxDyn(&[2, 1, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! let field = GriddedField::from_named_axes(
//!     "GPR",
//!     Units::mm_per_day(),
//!     TimeAxis::fractional_years(vec![2000.0, 2000.5, 2001.0], Calendar::Standard),
//!     &["lon", "lat", "time"],
//!     &[NamedAxis::new("lon", vec![70.0, 71.0]), NamedAxis::new("lat", vec![30.0])],
//!     values,
//! )
//! .unwrap();
//!
//! assert_eq!(field.values().shape(), &[3, 1, 1, 2]);
//! assert_eq!(field.values()[[1, 0, 0, 1]], 5.0);
//! ```

use crate::calendar::TimeAxis;
use crate::errors::{BenchError, BenchResult};
use crate::units::Units;
use ndarray::{Array2, Array3, Array4, ArrayD, Axis, Ix4};
use serde::{Deserialize, Serialize};

/// Role of a named coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisKind {
    Time,
    Member,
    Latitude,
    Longitude,
}

impl AxisKind {
    /// Resolves the axis names used across reanalysis and climate-model archives.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "time" | "t" => Some(AxisKind::Time),
            "number" | "member" | "realization" | "ensemble" => Some(AxisKind::Member),
            "lat" | "latitude" | "y" => Some(AxisKind::Latitude),
            "lon" | "longitude" | "x" => Some(AxisKind::Longitude),
            _ => None,
        }
    }

    /// Position of this axis in the internal `[time, member, lat, lon]` layout.
    fn position(self) -> usize {
        match self {
            AxisKind::Time => 0,
            AxisKind::Member => 1,
            AxisKind::Latitude => 2,
            AxisKind::Longitude => 3,
        }
    }

    fn name(self) -> &'static str {
        match self {
            AxisKind::Time => "time",
            AxisKind::Member => "member",
            AxisKind::Latitude => "latitude",
            AxisKind::Longitude => "longitude",
        }
    }
}

/// A coordinate axis identified by name, used when building a field.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedAxis {
    pub name: String,
    pub values: Vec<f64>,
}

impl NamedAxis {
    pub fn new(name: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }
}

/// Checks that an axis is finite and strictly increasing or strictly decreasing.
pub(crate) fn validate_monotonic(name: &str, values: &[f64]) -> BenchResult<()> {
    let err = || BenchError::NonMonotonic {
        axis: name.to_string(),
    };
    if values.iter().any(|v| !v.is_finite()) {
        return Err(err());
    }
    let increasing = values.windows(2).all(|w| w[0] < w[1]);
    let decreasing = values.windows(2).all(|w| w[0] > w[1]);
    if increasing || decreasing {
        Ok(())
    } else {
        Err(err())
    }
}

/// A labelled gridded precipitation field.
///
/// Immutable once built: every transformation returns a new field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriddedField {
    /// Provenance label, e.g. "ERA5" or "CORDEX"
    source: String,
    units: Units,
    time: TimeAxis,
    /// Ensemble member identifiers, `None` if the source has no ensemble axis
    members: Option<Vec<f64>>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    /// Values indexed `[time, member, lat, lon]`
    values: Array4<f64>,
}

impl GriddedField {
    /// Builds a field with no ensemble axis from values indexed `[time, lat, lon]`.
    pub fn new(
        source: &str,
        units: Units,
        time: TimeAxis,
        lat: Vec<f64>,
        lon: Vec<f64>,
        values: Array3<f64>,
    ) -> BenchResult<Self> {
        Self::from_parts(source, units, time, None, lat, lon, values.insert_axis(Axis(1)))
    }

    /// Builds an ensemble field from values indexed `[time, member, lat, lon]`.
    pub fn with_members(
        source: &str,
        units: Units,
        time: TimeAxis,
        members: Vec<f64>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        values: Array4<f64>,
    ) -> BenchResult<Self> {
        Self::from_parts(source, units, time, Some(members), lat, lon, values)
    }

    /// Builds a field from an array whose dimensions are given by name.
    ///
    /// `dims` names every axis of `values` in order. `time`, a latitude axis
    /// (`lat`/`latitude`) and a longitude axis (`lon`/`longitude`) are
    /// required; an ensemble axis (`number`/`member`/`realization`) is
    /// optional. Coordinates for every non-time dimension must be supplied in
    /// `coords`; the time coordinate comes from `time`.
    pub fn from_named_axes(
        source: &str,
        units: Units,
        time: TimeAxis,
        dims: &[&str],
        coords: &[NamedAxis],
        values: ArrayD<f64>,
    ) -> BenchResult<Self> {
        if dims.len() != values.ndim() {
            return Err(BenchError::ShapeMismatch {
                what: format!("dimensions of '{source}'"),
                expected: vec![dims.len()],
                actual: vec![values.ndim()],
            });
        }

        let mut kinds = Vec::with_capacity(dims.len());
        for dim in dims {
            let kind = AxisKind::from_name(dim).ok_or_else(|| BenchError::UnknownAxis {
                source_id: source.to_string(),
                axis: dim.to_string(),
            })?;
            if kinds.contains(&kind) {
                return Err(BenchError::Error(format!(
                    "Dataset '{source}' declares the {} axis more than once",
                    kind.name()
                )));
            }
            kinds.push(kind);
        }
        for required in [AxisKind::Time, AxisKind::Latitude, AxisKind::Longitude] {
            if !kinds.contains(&required) {
                return Err(BenchError::MissingAxis {
                    source_id: source.to_string(),
                    axis: required.name().to_string(),
                });
            }
        }

        let coordinate = |kind: AxisKind| -> BenchResult<Vec<f64>> {
            dims.iter()
                .zip(&kinds)
                .find(|(_, k)| **k == kind)
                .and_then(|(dim, _)| coords.iter().find(|c| c.name == *dim))
                .map(|c| c.values.clone())
                .ok_or_else(|| BenchError::MissingAxis {
                    source_id: source.to_string(),
                    axis: kind.name().to_string(),
                })
        };
        let lat = coordinate(AxisKind::Latitude)?;
        let lon = coordinate(AxisKind::Longitude)?;
        let members = if kinds.contains(&AxisKind::Member) {
            Some(coordinate(AxisKind::Member)?)
        } else {
            None
        };

        let mut values = values;
        let mut order: Vec<usize> = kinds.iter().map(|k| k.position()).collect();
        if members.is_none() {
            values.insert_axis_inplace(Axis(values.ndim()));
            order.push(AxisKind::Member.position());
        }
        // permutation[target] = source axis
        let mut permutation = vec![0; 4];
        for (axis, position) in order.iter().enumerate() {
            permutation[*position] = axis;
        }
        let values = values
            .permuted_axes(permutation)
            .as_standard_layout()
            .into_owned()
            .into_dimensionality::<Ix4>()
            .map_err(|e| BenchError::Error(e.to_string()))?;

        Self::from_parts(source, units, time, members, lat, lon, values)
    }

    fn from_parts(
        source: &str,
        units: Units,
        time: TimeAxis,
        members: Option<Vec<f64>>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        values: Array4<f64>,
    ) -> BenchResult<Self> {
        validate_monotonic("latitude", &lat)?;
        validate_monotonic("longitude", &lon)?;
        let n_members = members.as_ref().map_or(1, |m| m.len());
        let expected = vec![time.len(), n_members, lat.len(), lon.len()];
        if values.shape() != expected.as_slice() {
            return Err(BenchError::ShapeMismatch {
                what: format!("values of '{source}'"),
                expected,
                actual: values.shape().to_vec(),
            });
        }
        Ok(Self {
            source: source.to_string(),
            units,
            time,
            members,
            lat,
            lon,
            values,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    pub fn members(&self) -> Option<&[f64]> {
        self.members.as_deref()
    }

    pub fn has_ensemble(&self) -> bool {
        self.members.is_some()
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Values indexed `[time, member, lat, lon]`.
    pub fn values(&self) -> &Array4<f64> {
        &self.values
    }

    pub fn n_times(&self) -> usize {
        self.time.len()
    }

    pub fn n_members(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    /// A copy with new values of identical shape.
    pub fn with_values(&self, values: Array4<f64>) -> BenchResult<Self> {
        Self::from_parts(
            &self.source,
            self.units.clone(),
            self.time.clone(),
            self.members.clone(),
            self.lat.clone(),
            self.lon.clone(),
            values,
        )
    }

    /// A copy with new values and units.
    pub fn with_values_and_units(&self, values: Array4<f64>, units: Units) -> BenchResult<Self> {
        let mut field = self.with_values(values)?;
        field.units = units;
        Ok(field)
    }

    /// A copy with a replacement time axis of the same length.
    pub fn with_time(&self, time: TimeAxis) -> BenchResult<Self> {
        Self::from_parts(
            &self.source,
            self.units.clone(),
            time,
            self.members.clone(),
            self.lat.clone(),
            self.lon.clone(),
            self.values.clone(),
        )
    }

    /// A copy whose ensemble axis has been collapsed to a single member.
    pub(crate) fn with_single_member(&self, values: Array3<f64>) -> BenchResult<Self> {
        Self::from_parts(
            &self.source,
            self.units.clone(),
            self.time.clone(),
            None,
            self.lat.clone(),
            self.lon.clone(),
            values.insert_axis(Axis(1)),
        )
    }

    /// A copy keeping only the given time indices.
    pub fn select_times(&self, indices: &[usize]) -> Self {
        Self {
            source: self.source.clone(),
            units: self.units.clone(),
            time: self.time.select(indices),
            members: self.members.clone(),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }

    /// Rewrites a 0..360 longitude axis onto -180..180 and reorders the columns.
    ///
    /// Fails with [`BenchError::NonMonotonic`] if wrapping produces duplicate
    /// longitudes (e.g. a grid containing both 0 and 360).
    pub fn with_wrapped_longitudes(&self) -> BenchResult<Self> {
        let wrapped: Vec<f64> = self
            .lon
            .iter()
            .map(|lon| if *lon >= 180.0 { lon - 360.0 } else { *lon })
            .collect();
        let mut order: Vec<usize> = (0..wrapped.len()).collect();
        order.sort_by(|a, b| wrapped[*a].total_cmp(&wrapped[*b]));
        let lon: Vec<f64> = order.iter().map(|i| wrapped[*i]).collect();

        Self::from_parts(
            &self.source,
            self.units.clone(),
            self.time.clone(),
            self.members.clone(),
            self.lat.clone(),
            lon,
            self.values.select(Axis(3), &order),
        )
    }
}

/// A single location of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointSpec {
    pub lat: f64,
    pub lon: f64,
}

impl PointSpec {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Spatial weights marking the cells of a catchment.
///
/// A cell belongs to the basin when its weight is strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinMask {
    name: String,
    lat: Vec<f64>,
    lon: Vec<f64>,
    /// Weights indexed `[lat, lon]`
    weights: Array2<f64>,
}

impl BasinMask {
    pub fn new(name: &str, lat: Vec<f64>, lon: Vec<f64>, weights: Array2<f64>) -> BenchResult<Self> {
        validate_monotonic("mask latitude", &lat)?;
        validate_monotonic("mask longitude", &lon)?;
        if weights.shape() != [lat.len(), lon.len()] {
            return Err(BenchError::ShapeMismatch {
                what: format!("weights of basin mask '{name}'"),
                expected: vec![lat.len(), lon.len()],
                actual: weights.shape().to_vec(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            lat,
            lon,
            weights,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }
}

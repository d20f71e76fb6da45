//! Spatial selection of gridded fields.
//!
//! Two explicit operations reduce a [`GriddedField`] to a flat set of grid
//! cells, chosen by the caller through the [`Selection`] tagged variant:
//!
//! - [`select_point`]: the nearest grid cell to a location, found along each
//!   axis independently (no interpolation blending)
//! - [`select_basin`]: every cell of a catchment whose mask weight is
//!   positive, with all other cells discarded rather than zeroed
//!
//! # Examples
//!
//! ```rust
//! use hydrobench_core::calendar::{Calendar, TimeAxis};
//! use hydrobench_core::field::{GriddedField, PointSpec};
//! use hydrobench_core::spatial::select_point;
//! use hydrobench_core::units::Units;
//! use ndarray::array;
//!
//! let field = GriddedField::new(
//!     "ERA5",
//!     Units::mm_per_day(),
//!     TimeAxis::fractional_years(vec![2000.0], Calendar::Standard),
//!     vec![10.0, 11.0],
//!     vec![20.0, 21.0],
//!     array![[[1.0, 2.0], [3.0, 4.0]]],
//! )
//! .unwrap();
//!
//! let series = select_point(&field, &PointSpec::new(10.4, 20.4)).unwrap();
//! assert_eq!(series.values()[[0, 0, 0]], 1.0);
//! ```

use crate::calendar::TimeAxis;
use crate::errors::{BenchError, BenchResult};
use crate::field::{BasinMask, GriddedField, PointSpec};
use crate::units::Units;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// How a comparison set is reduced spatially.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Point(PointSpec),
    Basin(BasinMask),
}

/// A grid cell that survived selection, with its mask weight (1 for points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub lat: f64,
    pub lon: f64,
    pub weight: f64,
}

/// Spatial footprint of a selected series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Footprint {
    /// The grid cell nearest to the requested point
    Point(GridCell),
    /// Cells of a basin, row-major in the source grid order
    Basin { basin: String, cells: Vec<GridCell> },
}

impl Footprint {
    pub fn cells(&self) -> &[GridCell] {
        match self {
            Footprint::Point(cell) => std::slice::from_ref(cell),
            Footprint::Basin { cells, .. } => cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells().is_empty()
    }
}

/// A field reduced to a flat list of grid cells.
///
/// Keeps the time and ensemble axes of the source; values are indexed
/// `[time, member, cell]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialSeries {
    source: String,
    units: Units,
    time: TimeAxis,
    members: Option<Vec<f64>>,
    footprint: Footprint,
    values: Array3<f64>,
}

impl SpatialSeries {
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

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// Values indexed `[time, member, cell]`.
    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }
}

/// Index of the coordinate closest to `target`; ties resolve to the lower index.
///
/// `None` for an empty axis or a non-finite target.
pub fn nearest_index(axis: &[f64], target: f64) -> Option<usize> {
    if !target.is_finite() {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (i, value) in axis.iter().enumerate() {
        let distance = (value - target).abs();
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

fn bounds(axis: &[f64]) -> (f64, f64) {
    axis.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}

/// Extent of an axis treating each coordinate as the centre of a cell.
fn cell_extent(axis: &[f64]) -> (f64, f64) {
    let (lo, hi) = bounds(axis);
    let half = if axis.len() > 1 {
        (axis[1] - axis[0]).abs() / 2.0
    } else {
        0.0
    };
    (lo - half, hi + half)
}

/// Extracts the grid cell nearest to `point`.
///
/// Latitude and longitude are matched independently. A point outside the
/// grid resolves to the nearest edge cell and logs a warning. The returned
/// coordinates are always coordinates of the input grid.
pub fn select_point(field: &GriddedField, point: &PointSpec) -> BenchResult<SpatialSeries> {
    if !point.lat.is_finite() || !point.lon.is_finite() {
        return Err(BenchError::EmptySelection {
            reason: format!("point ({}, {}) is not a finite location", point.lat, point.lon),
        });
    }
    let (i, j) = match (
        nearest_index(field.lat(), point.lat),
        nearest_index(field.lon(), point.lon),
    ) {
        (Some(i), Some(j)) => (i, j),
        _ => {
            return Err(BenchError::EmptySelection {
                reason: format!("'{}' has an empty spatial grid", field.source()),
            })
        }
    };

    let (lat_lo, lat_hi) = bounds(field.lat());
    let (lon_lo, lon_hi) = bounds(field.lon());
    if point.lat < lat_lo || point.lat > lat_hi || point.lon < lon_lo || point.lon > lon_hi {
        log::warn!(
            "Point ({}, {}) lies outside the grid of '{}'; using the nearest edge cell",
            point.lat,
            point.lon,
            field.source()
        );
    }

    let cell = GridCell {
        lat: field.lat()[i],
        lon: field.lon()[j],
        weight: 1.0,
    };
    let source = field.values();
    let values = Array3::from_shape_fn((field.n_times(), field.n_members(), 1), |(t, m, _)| {
        source[[t, m, i, j]]
    });

    Ok(SpatialSeries {
        source: field.source().to_string(),
        units: field.units().clone(),
        time: field.time().clone(),
        members: field.members().map(<[f64]>::to_vec),
        footprint: Footprint::Point(cell),
        values,
    })
}

/// Keeps the cells of `field` that fall inside a basin.
///
/// The field is first cropped to the mask's extent (mask coordinates are
/// cell centres, so the extent reaches half a grid spacing beyond them).
/// Each remaining field cell takes the weight of its nearest mask cell and
/// is kept only if that weight is strictly positive.
///
/// Fails with [`BenchError::EmptySelection`] if the extents do not overlap or
/// no cell has positive weight.
pub fn select_basin(field: &GriddedField, mask: &BasinMask) -> BenchResult<SpatialSeries> {
    let (lat_lo, lat_hi) = cell_extent(mask.lat());
    let (lon_lo, lon_hi) = cell_extent(mask.lon());

    let mut overlap = false;
    let mut cells = Vec::new();
    let mut indices = Vec::new();
    for (i, lat) in field.lat().iter().enumerate() {
        if *lat < lat_lo || *lat > lat_hi {
            continue;
        }
        for (j, lon) in field.lon().iter().enumerate() {
            if *lon < lon_lo || *lon > lon_hi {
                continue;
            }
            overlap = true;
            let (Some(mi), Some(mj)) = (nearest_index(mask.lat(), *lat), nearest_index(mask.lon(), *lon))
            else {
                continue;
            };
            let weight = mask.weights()[[mi, mj]];
            if weight > 0.0 {
                cells.push(GridCell {
                    lat: *lat,
                    lon: *lon,
                    weight,
                });
                indices.push((i, j));
            }
        }
    }

    if !overlap {
        return Err(BenchError::EmptySelection {
            reason: format!(
                "mask '{}' does not overlap the grid of '{}'",
                mask.name(),
                field.source()
            ),
        });
    }
    if cells.is_empty() {
        return Err(BenchError::EmptySelection {
            reason: format!(
                "no cell of '{}' has a positive weight in mask '{}'",
                field.source(),
                mask.name()
            ),
        });
    }
    log::debug!(
        "Basin '{}' keeps {} cells of '{}'",
        mask.name(),
        cells.len(),
        field.source()
    );

    let source = field.values();
    let values = Array3::from_shape_fn(
        (field.n_times(), field.n_members(), indices.len()),
        |(t, m, c)| {
            let (i, j) = indices[c];
            source[[t, m, i, j]]
        },
    );

    Ok(SpatialSeries {
        source: field.source().to_string(),
        units: field.units().clone(),
        time: field.time().clone(),
        members: field.members().map(<[f64]>::to_vec),
        footprint: Footprint::Basin {
            basin: mask.name().to_string(),
            cells,
        },
        values,
    })
}

/// Dispatches on the selection variant.
pub fn select(field: &GriddedField, selection: &Selection) -> BenchResult<SpatialSeries> {
    match selection {
        Selection::Point(point) => select_point(field, point),
        Selection::Basin(mask) => select_basin(field, mask),
    }
}

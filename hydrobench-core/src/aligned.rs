//! Aligned datasets: the output of the alignment pipeline.

use crate::calendar::{Calendar, TimeAxis};
use crate::errors::{BenchError, BenchResult};
use crate::spatial::{Footprint, SpatialSeries};
use crate::units::Units;
use crate::window::TimeIndexed;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// A dataset on the shared comparison basis.
///
/// Units are always mm/day and time is canonical fractional years in the
/// source's own calendar. Values are indexed `[time, cell]` where cells
/// follow the order of the [`Footprint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedDataset {
    source: String,
    units: Units,
    calendar: Calendar,
    times: Vec<f64>,
    footprint: Footprint,
    values: Array2<f64>,
}

impl AlignedDataset {
    /// Builds an aligned dataset from values already in mm/day.
    pub fn new(
        source: &str,
        calendar: Calendar,
        times: Vec<f64>,
        footprint: Footprint,
        values: Array2<f64>,
    ) -> BenchResult<Self> {
        if let Some(bad) = times.iter().find(|t| !t.is_finite()) {
            return Err(BenchError::Calendar {
                value: bad.to_string(),
                reason: "time value is not finite".to_string(),
            });
        }
        if values.shape() != [times.len(), footprint.len()] {
            return Err(BenchError::ShapeMismatch {
                what: format!("values of aligned dataset '{source}'"),
                expected: vec![times.len(), footprint.len()],
                actual: values.shape().to_vec(),
            });
        }
        Ok(Self {
            source: source.to_string(),
            units: Units::mm_per_day(),
            calendar,
            times,
            footprint,
            values,
        })
    }

    /// Converts a spatially selected series whose ensemble has been reduced.
    ///
    /// The series must already be in mm/day on a canonical time axis.
    pub fn from_series(series: &SpatialSeries) -> BenchResult<Self> {
        if !series.units().is_mm_per_day() {
            return Err(BenchError::UnsupportedUnit {
                unit: series.units().original().to_string(),
                reason: "aligned datasets must be in mm/day".to_string(),
            });
        }
        let times = series
            .time()
            .canonical_values()
            .ok_or_else(|| BenchError::Calendar {
                value: format!("{:?}", series.time().encoding()),
                reason: "time axis has not been normalized".to_string(),
            })?
            .to_vec();
        let members = series.values().len_of(Axis(1));
        if members != 1 {
            return Err(BenchError::ShapeMismatch {
                what: format!("ensemble axis of '{}'", series.source()),
                expected: vec![1],
                actual: vec![members],
            });
        }
        Self::new(
            series.source(),
            series.time().calendar(),
            times,
            series.footprint().clone(),
            series.values().index_axis(Axis(1), 0).to_owned(),
        )
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Canonical fractional-year time of each record.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// Values indexed `[time, cell]`.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The time axis as a [`TimeAxis`] in the dataset's calendar.
    pub fn time_axis(&self) -> TimeAxis {
        TimeAxis::fractional_years(self.times.clone(), self.calendar)
    }

    /// Unweighted mean over cells at each time step, skipping NaN cells.
    ///
    /// A step with no finite cell is NaN.
    pub fn cell_mean_series(&self) -> Vec<f64> {
        self.values
            .axis_iter(Axis(0))
            .map(|row| {
                let (sum, count) = row
                    .iter()
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
                if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            })
            .collect()
    }

    /// Cell-mean monthly totals in mm/month.
    ///
    /// Each record is read as a monthly mean rate and multiplied by the
    /// length of its month in the dataset's calendar.
    pub fn monthly_totals(&self) -> BenchResult<Vec<f64>> {
        self.times
            .iter()
            .zip(self.cell_mean_series())
            .map(|(t, rate)| {
                let (year, month) = self.calendar.year_month(*t)?;
                Ok(rate * self.calendar.days_in_month(year, month)? as f64)
            })
            .collect()
    }
}

impl TimeIndexed for AlignedDataset {
    fn label(&self) -> &str {
        &self.source
    }

    fn canonical_times(&self) -> BenchResult<Vec<f64>> {
        Ok(self.times.clone())
    }

    fn select_times(&self, indices: &[usize]) -> Self {
        Self {
            source: self.source.clone(),
            units: self.units.clone(),
            calendar: self.calendar,
            times: indices.iter().map(|i| self.times[*i]).collect(),
            footprint: self.footprint.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }
}

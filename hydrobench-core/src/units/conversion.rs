//! Unit conversion calculations.
//!
//! # Example
//!
//! ```
//! use hydrobench_core::units::inverse_log_transform;
//! use ndarray::array;
//!
//! let restored = inverse_log_transform(array![0.0, 2.0_f64.ln()].view()).unwrap();
//! assert!((restored[1] - 1.0).abs() < 1e-12);
//! ```

use super::{Period, Units};
use crate::calendar::{month_lengths, year_lengths};
use crate::errors::{BenchError, BenchResult};
use crate::field::GriddedField;
use ndarray::{Array1, ArrayView1, Axis};

/// Multiplies a rate field by the elapsed time of each step.
///
/// A field in depth per second becomes a field in depth per
/// `seconds_per_step`; the result has identical shape. Rates over calendar
/// months or years have no fixed length and are rejected.
pub fn flux_to_depth(field: &GriddedField, seconds_per_step: f64) -> BenchResult<GriddedField> {
    let units = field.units();
    let period_seconds = units
        .period()
        .fixed_seconds()
        .ok_or_else(|| BenchError::UnsupportedUnit {
            unit: units.original().to_string(),
            reason: "flux must be a rate over a fixed-length period".to_string(),
        })?;
    if !(seconds_per_step.is_finite() && seconds_per_step > 0.0) {
        return Err(BenchError::Error(format!(
            "Step length must be a positive number of seconds, got {seconds_per_step}"
        )));
    }

    let factor = seconds_per_step / period_seconds;
    let period = match seconds_per_step {
        s if s == 86_400.0 => Period::Day,
        s if s == 3_600.0 => Period::Hour,
        s => Period::Seconds(s),
    };
    field.with_values_and_units(
        field.values() * factor,
        Units::depth_per(units.depth_mm(), period),
    )
}

/// Reverses a `log1p` transform applied before modelling.
///
/// Computes `exp(x) - 1` with `exp_m1`, which stays accurate for small `x`.
/// A finite input whose result overflows fails with [`BenchError::Overflow`]
/// rather than producing infinity. NaN inputs stay NaN.
pub fn inverse_log_transform(values: ArrayView1<f64>) -> BenchResult<Array1<f64>> {
    let mut restored = Array1::zeros(values.len());
    for (out, x) in restored.iter_mut().zip(values.iter()) {
        let y = x.exp_m1();
        if y.is_infinite() && x.is_finite() {
            return Err(BenchError::Overflow { value: *x });
        }
        *out = y;
    }
    Ok(restored)
}

/// Converts a field to millimetres per day.
///
/// Fixed-period units are scaled by a constant. Per-month and per-year
/// depths are divided by the length of each step's month or year in the
/// source calendar.
pub fn to_mm_per_day(field: &GriddedField) -> BenchResult<GriddedField> {
    let units = field.units();
    if units.is_mm_per_day() {
        return Ok(field.clone());
    }

    if let Some(factor) = units.fixed_factor_to_mm_per_day() {
        log::debug!(
            "Converting '{}' from {} to mm/day (factor {factor})",
            field.source(),
            units
        );
        return field.with_values_and_units(field.values() * factor, Units::mm_per_day());
    }

    let lengths = match units.period() {
        Period::Month => month_lengths(field.time())?,
        Period::Year => year_lengths(field.time())?,
        period => {
            return Err(BenchError::UnsupportedUnit {
                unit: units.original().to_string(),
                reason: format!("no conversion for period {period:?}"),
            })
        }
    };
    log::debug!(
        "Converting '{}' from {} to mm/day using calendar period lengths",
        field.source(),
        units
    );
    let mut values = field.values() * units.depth_mm();
    for (mut step, days) in values.axis_iter_mut(Axis(0)).zip(lengths) {
        step /= days as f64;
    }
    field.with_values_and_units(values, Units::mm_per_day())
}

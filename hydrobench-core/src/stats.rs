//! Summary statistics of aligned datasets.
//!
//! A summary reduces a dataset to a single series (the unweighted mean of
//! its cells), drops time steps that are not finite and reports the mean,
//! population standard deviation and least-squares trend against canonical
//! time.
//!
//! # Examples
//!
//! ```rust
//! use hydrobench_core::stats::summarize_series;
//!
//! let summary = summarize_series("ERA5", &[0.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 4.0]);
//! assert_eq!(summary.n, 4);
//! assert!((summary.trend_slope - 1.0).abs() < 1e-12);
//! assert!((summary.trend_intercept - 1.0).abs() < 1e-12);
//! assert!((summary.mean - 2.5).abs() < 1e-12);
//! ```

use crate::aligned::AlignedDataset;
use crate::utils::special::student_t_two_sided;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinary least-squares fit of `y` against `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient
    pub r_value: f64,
    /// Two-sided p-value for a null hypothesis of zero slope
    pub p_value: f64,
    /// Standard error of the slope
    pub std_err: f64,
}

impl LinearFit {
    fn undefined() -> Self {
        Self {
            slope: f64::NAN,
            intercept: f64::NAN,
            r_value: f64::NAN,
            p_value: f64::NAN,
            std_err: f64::NAN,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Least-squares regression of `y` on `x`.
///
/// Follows the conventions of SciPy's `linregress`: the p-value uses a
/// Student-t distribution with `n - 2` degrees of freedom, and with exactly
/// two points the fit is exact (`std_err` 0, `p_value` 0 or 1 for a flat
/// line). Fewer than two points, unequal lengths or identical `x` values
/// give an all-NaN fit.
pub fn linregress(x: &[f64], y: &[f64]) -> LinearFit {
    let n = x.len();
    if n < 2 || n != y.len() {
        return LinearFit::undefined();
    }
    let x_mean = mean(x);
    let y_mean = mean(y);
    let (mut ssxm, mut ssym, mut ssxym) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        ssxm += dx * dx;
        ssym += dy * dy;
        ssxym += dx * dy;
    }
    if ssxm == 0.0 {
        return LinearFit::undefined();
    }

    let r_value = if ssym == 0.0 {
        0.0
    } else {
        (ssxym / (ssxm * ssym).sqrt()).clamp(-1.0, 1.0)
    };
    let slope = ssxym / ssxm;
    let intercept = y_mean - slope * x_mean;

    let (p_value, std_err) = if n == 2 {
        (if y[0] == y[1] { 1.0 } else { 0.0 }, 0.0)
    } else {
        let df = (n - 2) as f64;
        // Keeps t finite for a perfect fit
        let tiny = 1e-20;
        let t = r_value * (df / ((1.0 - r_value + tiny) * (1.0 + r_value + tiny))).sqrt();
        let std_err = ((1.0 - r_value * r_value) * ssym / ssxm / df).sqrt();
        (student_t_two_sided(t, df), std_err)
    };

    LinearFit {
        slope,
        intercept,
        r_value,
        p_value,
        std_err,
    }
}

/// Descriptive statistics of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub source: String,
    /// Number of finite time steps used
    pub n: usize,
    /// mm/day
    pub mean: f64,
    /// Population standard deviation, mm/day
    pub std_dev: f64,
    /// mm/day per year
    pub trend_slope: f64,
    pub trend_intercept: f64,
    pub r_value: f64,
    pub p_value: f64,
    pub std_err: f64,
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.source)?;
        writeln!(f, "mean = {} mm/day", self.mean)?;
        writeln!(f, "std = {} mm/day", self.std_dev)?;
        write!(f, "slope = {} mm/day/year", self.trend_slope)
    }
}

/// Summarizes a single series against its time stamps.
///
/// Pairs where either the time or the value is not finite are dropped.
pub fn summarize_series(source: &str, times: &[f64], values: &[f64]) -> StatsSummary {
    let (t, y): (Vec<f64>, Vec<f64>) = times
        .iter()
        .zip(values)
        .filter(|(t, v)| t.is_finite() && v.is_finite())
        .map(|(t, v)| (*t, *v))
        .unzip();

    let n = y.len();
    let (mean_value, std_dev) = if n == 0 {
        (f64::NAN, f64::NAN)
    } else {
        let m = mean(&y);
        let variance = y.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n as f64;
        (m, variance.sqrt())
    };
    let fit = linregress(&t, &y);

    StatsSummary {
        source: source.to_string(),
        n,
        mean: mean_value,
        std_dev,
        trend_slope: fit.slope,
        trend_intercept: fit.intercept,
        r_value: fit.r_value,
        p_value: fit.p_value,
        std_err: fit.std_err,
    }
}

/// Summarizes an aligned dataset.
///
/// Cells are collapsed by their unweighted mean at each time step; a basin
/// summary therefore describes the basin-average series.
pub fn summarize(dataset: &AlignedDataset) -> StatsSummary {
    let summary = summarize_series(dataset.source(), dataset.times(), &dataset.cell_mean_series());
    log::info!(
        "{}: mean = {} mm/day, std = {} mm/day, slope = {} mm/day/year",
        summary.source,
        summary.mean,
        summary.std_dev,
        summary.trend_slope
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Calendar;
    use crate::spatial::{Footprint, GridCell};
    use is_close::is_close;
    use ndarray::array;

    #[test]
    fn test_perfect_line() {
        let fit = linregress(&[0.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 4.0]);
        assert!(is_close!(fit.slope, 1.0));
        assert!(is_close!(fit.intercept, 1.0));
        assert!(is_close!(fit.r_value, 1.0));
        assert!(fit.p_value < 1e-10);
        assert!(fit.std_err.abs() < 1e-10);
    }

    #[test]
    fn test_noisy_line_matches_reference() {
        // Reference values from scipy.stats.linregress
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let fit = linregress(&x, &y);
        assert!(is_close!(fit.slope, 0.6));
        assert!(is_close!(fit.intercept, 2.2));
        assert!(is_close!(fit.r_value, 0.7745966692414834));
        assert!((fit.p_value - 0.12402706265755975).abs() < 1e-9);
        assert!(is_close!(fit.std_err, 0.282842712474619));
    }

    #[test]
    fn test_two_points_are_exact() {
        let fit = linregress(&[0.0, 1.0], &[1.0, 3.0]);
        assert_eq!(fit.slope, 2.0);
        assert_eq!(fit.p_value, 0.0);
        assert_eq!(fit.std_err, 0.0);

        let flat = linregress(&[0.0, 1.0], &[1.0, 1.0]);
        assert_eq!(flat.p_value, 1.0);
    }

    #[test]
    fn test_degenerate_fits_are_nan() {
        assert!(linregress(&[1.0], &[1.0]).slope.is_nan());
        assert!(linregress(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).slope.is_nan());
        assert!(linregress(&[1.0, 2.0], &[1.0]).slope.is_nan());
    }

    #[test]
    fn test_summary_drops_non_finite_steps() {
        let summary = summarize_series(
            "CRU",
            &[0.0, 1.0, 2.0, 3.0, 4.0],
            &[1.0, 2.0, f64::NAN, 3.0, 4.0],
        );
        assert_eq!(summary.n, 4);
        assert!(is_close!(summary.mean, 2.5));
        assert!(is_close!(summary.std_dev, 1.25_f64.sqrt()));
    }

    #[test]
    fn test_empty_summary_is_nan() {
        let summary = summarize_series("CRU", &[], &[]);
        assert_eq!(summary.n, 0);
        assert!(summary.mean.is_nan());
        assert!(summary.std_dev.is_nan());
        assert!(summary.trend_slope.is_nan());

        let single = summarize_series("CRU", &[2000.0], &[3.0]);
        assert_eq!(single.mean, 3.0);
        assert_eq!(single.std_dev, 0.0);
        assert!(single.trend_slope.is_nan());
    }

    #[test]
    fn test_basin_summary_uses_cell_mean() {
        let cells = vec![
            GridCell {
                lat: 31.0,
                lon: 77.0,
                weight: 1.0,
            },
            GridCell {
                lat: 31.5,
                lon: 77.0,
                weight: 0.5,
            },
        ];
        let dataset = AlignedDataset::new(
            "ERA5",
            Calendar::Standard,
            vec![2000.0, 2001.0],
            Footprint::Basin {
                basin: "beas".to_string(),
                cells,
            },
            array![[1.0, 3.0], [2.0, 6.0]],
        )
        .unwrap();
        let summary = summarize(&dataset);
        assert!(is_close!(summary.mean, 3.0));
        assert!(is_close!(summary.trend_slope, 2.0));
    }

    #[test]
    fn test_display_report() {
        let summary = summarize_series("ERA5", &[0.0, 1.0], &[1.0, 3.0]);
        let report = summary.to_string();
        assert!(report.starts_with("ERA5\n"));
        assert!(report.contains("mean = 2 mm/day"));
        assert!(report.contains("std = 1 mm/day"));
        assert!(report.contains("slope = 2 mm/day/year"));
    }
}

//! Pairwise correlation between aligned datasets.
//!
//! Sources on different calendars cannot share exact time stamps (mid-month
//! in a 360-day year is not mid-month in a Gregorian one), so series are
//! paired by calendar month, each read in its own calendar.

use crate::aligned::AlignedDataset;
use crate::aligner::AlignedSet;
use crate::errors::BenchResult;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pearson correlation coefficient of two equal-length series.
///
/// Pairs where either value is not finite are skipped. Returns NaN when the
/// lengths differ, fewer than two pairs remain or either series is constant.
///
/// ```rust
/// use hydrobench_core::correlation::pearson;
///
/// assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.5]) - 0.998).abs() < 1e-3);
/// assert!(pearson(&[1.0, 1.0], &[2.0, 3.0]).is_nan());
/// ```
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::NAN;
    }
    let (x, y): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .unzip();
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let x_mean = x.iter().sum::<f64>() / n as f64;
    let y_mean = y.iter().sum::<f64>() / n as f64;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(&y) {
        sxx += (xi - x_mean) * (xi - x_mean);
        syy += (yi - y_mean) * (yi - y_mean);
        sxy += (xi - x_mean) * (yi - y_mean);
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Cell-mean value of each calendar `(year, month)` in a dataset.
///
/// Several records in one month are averaged; non-finite records are
/// ignored.
pub fn monthly_means(dataset: &AlignedDataset) -> BenchResult<BTreeMap<(i64, u32), f64>> {
    let mut sums: BTreeMap<(i64, u32), (f64, usize)> = BTreeMap::new();
    for (t, value) in dataset.times().iter().zip(dataset.cell_mean_series()) {
        if !value.is_finite() {
            continue;
        }
        let key = dataset.calendar().year_month(*t)?;
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    Ok(sums
        .into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect())
}

/// Symmetric matrix of pairwise correlations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    sources: Vec<String>,
    values: Array2<f64>,
}

impl CorrelationMatrix {
    /// Provenance labels in row (and column) order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Correlation between two sources by label.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.sources.iter().position(|s| s == a)?;
        let j = self.sources.iter().position(|s| s == b)?;
        Some(self.values[[i, j]])
    }
}

/// Correlates every pair of datasets in `set` over their shared months.
pub fn correlation_matrix(set: &AlignedSet) -> BenchResult<CorrelationMatrix> {
    let monthly = set
        .iter()
        .map(monthly_means)
        .collect::<BenchResult<Vec<_>>>()?;

    let n = monthly.len();
    let mut values = Array2::from_elem((n, n), f64::NAN);
    for i in 0..n {
        for j in i..n {
            let (a, b): (Vec<f64>, Vec<f64>) = monthly[i]
                .iter()
                .filter_map(|(key, a)| monthly[j].get(key).map(|b| (*a, *b)))
                .unzip();
            let r = pearson(&a, &b);
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }
    log::debug!("Correlated {n} datasets");

    Ok(CorrelationMatrix {
        sources: set.iter().map(|d| d.source().to_string()).collect(),
        values,
    })
}

//! Restriction of time-indexed data to a comparison window.

use crate::calendar::to_canonical_time;
use crate::errors::{BenchError, BenchResult};
use crate::field::GriddedField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive range `[start, end]` on the canonical fractional-year axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: f64,
    end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> BenchResult<Self> {
        if !(start.is_finite() && end.is_finite()) || start > end {
            return Err(BenchError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Covers every time stamp whose calendar year lies in `first..=last`.
    ///
    /// ```rust
    /// use hydrobench_core::window::TimeWindow;
    ///
    /// let window = TimeWindow::years(1990, 2005).unwrap();
    /// assert!(window.contains(1990.0));
    /// assert!(window.contains(2005.99));
    /// assert!(!window.contains(2006.0));
    /// ```
    pub fn years(first: i64, last: i64) -> BenchResult<Self> {
        Self::new(first as f64, last as f64 + 1.0 - 1e-9)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Data that can be restricted along a canonical time axis.
pub trait TimeIndexed: Sized {
    /// Provenance label used in log messages and warnings
    fn label(&self) -> &str;

    /// Fractional-year time of every record.
    fn canonical_times(&self) -> BenchResult<Vec<f64>>;

    /// A copy keeping only the given record indices, in order.
    fn select_times(&self, indices: &[usize]) -> Self;
}

impl TimeIndexed for GriddedField {
    fn label(&self) -> &str {
        self.source()
    }

    fn canonical_times(&self) -> BenchResult<Vec<f64>> {
        to_canonical_time(self.time())
    }

    fn select_times(&self, indices: &[usize]) -> Self {
        GriddedField::select_times(self, indices)
    }
}

/// Raised when a window keeps no records. Not fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowEmptyWarning {
    pub source: String,
    pub window: TimeWindow,
    /// Extent of the data that was windowed, `None` if it had no records
    pub data_range: Option<(f64, f64)>,
}

impl fmt::Display for WindowEmptyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data_range {
            Some((first, last)) => write!(
                f,
                "'{}' has no records in window {} (data covers [{first}, {last}])",
                self.source, self.window
            ),
            None => write!(f, "'{}' has no records to window", self.source),
        }
    }
}

/// Result of windowing: the kept records plus a warning if none were kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Windowed<T> {
    pub data: T,
    pub warning: Option<WindowEmptyWarning>,
}

/// Keeps the records whose canonical time falls inside `window`.
///
/// Records are neither reordered nor resampled; gaps inside the window are
/// preserved. Windowing twice with the same window gives the same result.
pub fn window<T: TimeIndexed>(data: &T, window: &TimeWindow) -> BenchResult<Windowed<T>> {
    let times = data.canonical_times()?;
    let kept: Vec<usize> = times
        .iter()
        .enumerate()
        .filter(|(_, t)| window.contains(**t))
        .map(|(i, _)| i)
        .collect();

    let warning = if kept.is_empty() {
        let data_range = times.iter().fold(None, |range, t| match range {
            None => Some((*t, *t)),
            Some((lo, hi)) => Some((f64::min(lo, *t), f64::max(hi, *t))),
        });
        let warning = WindowEmptyWarning {
            source: data.label().to_string(),
            window: *window,
            data_range,
        };
        log::warn!("{warning}");
        Some(warning)
    } else {
        log::debug!(
            "Window {window} keeps {} of {} records of '{}'",
            kept.len(),
            times.len(),
            data.label()
        );
        None
    };

    Ok(Windowed {
        data: data.select_times(&kept),
        warning,
    })
}

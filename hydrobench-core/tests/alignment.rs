//! Properties of the alignment pipeline.
//!
//! These tests exercise the public API end to end:
//! - Spatial selection never invents coordinates or keeps masked-out cells
//! - Calendar and unit steps are fixed points on canonical data
//! - Windowing is idempotent

use approx::assert_relative_eq;
use hydrobench_core::aligner::{align, AlignerOptions, DatasetAligner};
use hydrobench_core::calendar::{expand_monthly_to_cumulative, month_lengths, Calendar, TimeAxis};
use hydrobench_core::ensemble::EnsemblePolicy;
use hydrobench_core::errors::BenchError;
use hydrobench_core::field::{BasinMask, GriddedField, PointSpec};
use hydrobench_core::spatial::{select_basin, select_point, Footprint, Selection};
use hydrobench_core::stats::{summarize, summarize_series};
use hydrobench_core::units::{inverse_log_transform, Units};
use hydrobench_core::window::{window, TimeWindow};
use ndarray::{array, Array2, Array3};

fn two_by_two() -> GriddedField {
    GriddedField::new(
        "ERA5",
        Units::mm_per_day(),
        TimeAxis::fractional_years(vec![2000.0], Calendar::Standard),
        vec![10.0, 11.0],
        vec![20.0, 21.0],
        array![[[1.0, 2.0], [3.0, 4.0]]],
    )
    .unwrap()
}

fn diagonal_mask() -> BasinMask {
    BasinMask::new(
        "indus",
        vec![10.0, 11.0],
        vec![20.0, 21.0],
        array![[0.0, 1.0], [1.0, 0.0]],
    )
    .unwrap()
}

/// Monthly mean rates on mid-month ISO dates for `years`.
fn monthly_field(source: &str, first: i64, years: i64) -> GriddedField {
    let dates: Vec<String> = (first..first + years)
        .flat_map(|y| (1..=12).map(move |m| format!("{y}-{m:02}-15")))
        .collect();
    let n = dates.len();
    GriddedField::new(
        source,
        Units::mm_per_day(),
        TimeAxis::iso(dates, Calendar::Standard),
        vec![31.0, 31.5, 32.0],
        vec![76.5, 77.0, 77.5],
        Array3::from_shape_fn((n, 3, 3), |(t, i, j)| 1.0 + (t % 12) as f64 * 0.25 + (i + j) as f64),
    )
    .unwrap()
}

mod spatial_selection {
    use super::*;

    #[test]
    fn test_point_scenario() {
        let series = select_point(&two_by_two(), &PointSpec::new(10.4, 20.4)).unwrap();
        assert_eq!(series.values()[[0, 0, 0]], 1.0);
    }

    /// The selected coordinates are always coordinates of the input grid.
    #[test]
    fn test_point_never_invents_coordinates() {
        let field = monthly_field("CRU", 2000, 1);
        for i in -10..=30 {
            for j in -10..=30 {
                let point = PointSpec::new(30.0 + i as f64 * 0.1, 76.0 + j as f64 * 0.1);
                let series = select_point(&field, &point).unwrap();
                let Footprint::Point(cell) = series.footprint() else {
                    panic!("point selection returned a basin footprint");
                };
                assert!(field.lat().contains(&cell.lat), "{point:?}");
                assert!(field.lon().contains(&cell.lon), "{point:?}");
            }
        }
    }

    #[test]
    fn test_basin_scenario() {
        let series = select_basin(&two_by_two(), &diagonal_mask()).unwrap();
        let mut values: Vec<f64> = series.values().iter().copied().collect();
        values.sort_by(f64::total_cmp);
        assert_eq!(values, vec![2.0, 3.0]);
        assert_relative_eq!(values.iter().sum::<f64>() / values.len() as f64, 2.5);
    }

    #[test]
    fn test_basin_never_keeps_non_positive_weights() {
        let field = monthly_field("CRU", 2000, 1);
        let weights = Array2::from_shape_fn((3, 3), |(i, j)| (i as f64 - j as f64) * 0.5);
        let mask = BasinMask::new("beas", vec![31.0, 31.5, 32.0], vec![76.5, 77.0, 77.5], weights)
            .unwrap();
        let series = select_basin(&field, &mask).unwrap();
        assert_eq!(series.footprint().len(), 3);
        assert!(series.footprint().cells().iter().all(|c| c.weight > 0.0));
    }

    #[test]
    fn test_all_zero_mask_is_empty_selection() {
        let mask = BasinMask::new("indus", vec![10.0, 11.0], vec![20.0, 21.0], Array2::zeros((2, 2)))
            .unwrap();
        assert!(matches!(
            select_basin(&two_by_two(), &mask),
            Err(BenchError::EmptySelection { .. })
        ));
    }
}

mod calendar_and_units {
    use super::*;

    #[test]
    fn test_inverse_log_transform_scenario() {
        let restored = inverse_log_transform(array![0.0, 2.0_f64.ln()].view()).unwrap();
        assert_relative_eq!(restored[0], 0.0);
        assert_relative_eq!(restored[1], 1.0, epsilon = 1e-12);
    }

    /// Expanding to totals and dividing by month length recovers the means.
    #[test]
    fn test_cumulative_round_trip() {
        let field = monthly_field("CRU", 1999, 3);
        let totals = expand_monthly_to_cumulative(&field).unwrap();
        let lengths = month_lengths(field.time()).unwrap();
        for (t, days) in lengths.iter().enumerate() {
            for i in 0..3 {
                for j in 0..3 {
                    let recovered = totals.values()[[t, 0, i, j]] / *days as f64;
                    assert_relative_eq!(recovered, field.values()[[t, 0, i, j]], max_relative = 1e-12);
                }
            }
        }
    }
}

mod pipeline {
    use super::*;

    /// Canonical inputs pass through the unit and calendar stages unchanged.
    #[test]
    fn test_align_is_fixed_point_on_canonical_data() {
        let years: Vec<f64> = (0..24).map(|m| 2000.0 + m as f64 / 12.0).collect();
        let field = GriddedField::new(
            "ERA5",
            Units::mm_per_day(),
            TimeAxis::fractional_years(years.clone(), Calendar::Standard),
            vec![10.0, 11.0],
            vec![20.0, 21.0],
            Array3::from_shape_fn((24, 2, 2), |(t, i, j)| t as f64 + i as f64 * 0.1 + j as f64),
        )
        .unwrap();
        let selection = Selection::Point(PointSpec::new(11.0, 20.0));
        let set = align(&[field.clone()], &selection, &TimeWindow::years(2000, 2001).unwrap()).unwrap();

        let aligned = &set.datasets()[0];
        assert_eq!(aligned.times(), years.as_slice());
        for t in 0..24 {
            assert_eq!(aligned.values()[[t, 0]], field.values()[[t, 0, 1, 0]]);
        }
    }

    #[test]
    fn test_window_is_idempotent() {
        let set = DatasetAligner::new(
            Selection::Basin(diagonal_mask()),
            TimeWindow::years(1900, 2100).unwrap(),
        )
        .align(&[two_by_two()])
        .unwrap();
        let data = &set.datasets()[0];
        let w = TimeWindow::new(2000.0, 2000.5).unwrap();
        let once = window(data, &w).unwrap().data;
        let twice = window(&once, &w).unwrap().data;
        assert_eq!(once, twice);

        let field = monthly_field("CRU", 1998, 4);
        let w = TimeWindow::years(1999, 2000).unwrap();
        let once = window(&field, &w).unwrap().data;
        let twice = window(&once, &w).unwrap().data;
        assert_eq!(once.n_times(), 24);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_mixed_sources_share_units_and_window() {
        let cru = monthly_field("CRU", 1985, 25);
        // mid-month of a 360-day calendar, 1988 to 2007
        let cordex_times: Vec<f64> = (0..20 * 12).map(|month| 15.0 + month as f64 * 30.0).collect();
        let n = cordex_times.len();
        let cordex = GriddedField::new(
            "CORDEX",
            Units::parse("kg m-2 s-1").unwrap(),
            TimeAxis::cf(cordex_times, "days since 1988-01-01", "360_day").unwrap(),
            vec![31.0, 31.44, 31.88],
            vec![76.6, 77.04],
            Array3::from_elem((n, 3, 2), 2.0 / 86_400.0),
        )
        .unwrap();

        let aligner = DatasetAligner::new(
            Selection::Point(PointSpec::new(31.5, 77.0)),
            TimeWindow::years(1990, 2005).unwrap(),
        )
        .with_options(AlignerOptions {
            ensemble: EnsemblePolicy::Mean,
        });
        let set = aligner.align(&[cru, cordex]).unwrap();

        for dataset in &set {
            assert!(dataset.units().is_mm_per_day());
            assert_eq!(dataset.len(), 16 * 12, "{}", dataset.source());
            assert!(dataset.times().iter().all(|t| (1990.0..2006.0).contains(t)));
        }
        let cordex = set.get("CORDEX").unwrap();
        assert_eq!(cordex.calendar(), Calendar::Day360);
        assert_relative_eq!(cordex.values()[[0, 0]], 2.0, max_relative = 1e-12);
    }
}

mod statistics {
    use super::*;

    #[test]
    fn test_summarize_scenario() {
        let summary = summarize_series("ERA5", &[0.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(summary.trend_slope, 1.0, epsilon = 1e-12);
        assert_relative_eq!(summary.trend_intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(summary.mean, 2.5);
    }

    #[test]
    fn test_basin_summary_is_cell_mean() {
        let set = DatasetAligner::new(
            Selection::Basin(diagonal_mask()),
            TimeWindow::years(2000, 2000).unwrap(),
        )
        .align(&[two_by_two()])
        .unwrap();
        let summary = summarize(&set.datasets()[0]);
        assert_eq!(summary.n, 1);
        assert_relative_eq!(summary.mean, 2.5);
        assert_relative_eq!(summary.std_dev, 0.0);
        assert!(summary.trend_slope.is_nan());
    }
}

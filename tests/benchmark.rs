//! End-to-end benchmark runs against in-memory datasets.

use approx::assert_relative_eq;
use hydrobench::benchmark::Benchmark;
use hydrobench::config::BenchmarkConfig;
use hydrobench::fetch::{InMemoryFetcher, InMemoryMasks};
use hydrobench::model::Predictor;
use hydrobench::stations::Location;
use hydrobench::{BenchError, BenchResult};
use hydrobench_core::calendar::{Calendar, TimeAxis};
use hydrobench_core::ensemble::EnsemblePolicy;
use hydrobench_core::field::{BasinMask, GriddedField};
use hydrobench_core::units::Units;
use ndarray::{Array1, Array2, Array3, Array4, ArrayView2};

const LAT: [f64; 3] = [31.0, 31.5, 32.0];
const LON: [f64; 3] = [76.5, 77.0, 77.5];

/// Seasonal cycle in mm/day for month index `m` (0 = January).
fn seasonal(m: usize) -> f64 {
    2.0 + (m as f64 * std::f64::consts::PI / 6.0).sin()
}

/// ERA5 monthly means: metres of water per day, hours since 1900, two members.
fn era5() -> GriddedField {
    let calendar = Calendar::Standard;
    let epoch = calendar.day_number(1900, 1, 1).unwrap();
    let mut hours = Vec::new();
    for year in 1988..2008 {
        for month in 1..=12 {
            hours.push((calendar.day_number(year, month, 1).unwrap() - epoch) as f64 * 24.0);
        }
    }
    let n = hours.len();
    let values = Array4::from_shape_fn((n, 2, 3, 3), |(t, member, _, _)| {
        // members straddle the seasonal value
        (seasonal(t % 12) + if member == 0 { -0.5 } else { 0.5 }) / 1000.0
    });
    GriddedField::with_members(
        "ERA5",
        Units::parse("m").unwrap(),
        TimeAxis::cf(hours, "hours since 1900-01-01 00:00:0.0", "gregorian").unwrap(),
        vec![0.0, 1.0],
        LAT.to_vec(),
        LON.to_vec(),
        values,
    )
    .unwrap()
}

/// CRU monthly totals on ISO dates with descending latitudes.
fn cru() -> GriddedField {
    let mut dates = Vec::new();
    let mut totals = Vec::new();
    for year in 1985..2010 {
        for month in 1..=12u32 {
            dates.push(format!("{year}-{month:02}-16"));
            let days = Calendar::Standard.days_in_month(year, month).unwrap() as f64;
            totals.push(seasonal(month as usize - 1) * days);
        }
    }
    let n = dates.len();
    GriddedField::new(
        "CRU",
        Units::parse("mm/month").unwrap(),
        TimeAxis::iso(dates, Calendar::Standard),
        vec![32.0, 31.5, 31.0],
        LON.to_vec(),
        Array3::from_shape_fn((n, 3, 3), |(t, _, _)| totals[t]),
    )
    .unwrap()
}

/// CORDEX flux on a 360-day calendar.
fn cordex() -> GriddedField {
    let days: Vec<f64> = (0..18 * 12).map(|m| 15.0 + m as f64 * 30.0).collect();
    let n = days.len();
    GriddedField::new(
        "CORDEX",
        Units::parse("kg m-2 s-1").unwrap(),
        TimeAxis::cf(days, "days since 1989-01-01", "360_day").unwrap(),
        LAT.to_vec(),
        LON.to_vec(),
        Array3::from_shape_fn((n, 3, 3), |(t, _, _)| 2.0 * seasonal(t % 12) / 86_400.0),
    )
    .unwrap()
}

fn masks() -> InMemoryMasks {
    let mut masks = InMemoryMasks::default();
    let weights = Array2::from_shape_fn((3, 3), |(i, j)| if i + j >= 3 { 1.0 } else { 0.0 });
    masks.insert(BasinMask::new("beas", LAT.to_vec(), LON.to_vec(), weights).unwrap());
    masks
}

fn config() -> BenchmarkConfig {
    BenchmarkConfig {
        sources: vec!["ERA5".to_string(), "CRU".to_string(), "CORDEX".to_string()],
        default_basin: "beas".to_string(),
        ..Default::default()
    }
}

fn fetcher() -> InMemoryFetcher {
    [era5(), cru(), cordex()].into_iter().collect()
}

/// Predicts the seasonal cycle from the time feature, in log1p(m/day).
struct SeasonalModel;

impl Predictor for SeasonalModel {
    fn predict(&self, features: ArrayView2<f64>) -> BenchResult<(Array1<f64>, Array1<f64>)> {
        let mut mean = Array1::zeros(features.nrows());
        for (out, t) in mean.iter_mut().zip(features.column(0)) {
            let (_, month) = Calendar::Standard.year_month(*t)?;
            *out = (seasonal(month as usize - 1) / 1000.0).ln_1p();
        }
        let spread = Array1::from_elem(features.nrows(), (0.1_f64 / 1000.0).ln_1p());
        Ok((mean, spread))
    }
}

mod basin_runs {
    use super::*;

    #[test]
    fn test_default_basin_run() {
        let mut benchmark = Benchmark::new(config(), fetcher(), masks());
        let report = benchmark.run_default().unwrap();

        assert_eq!(report.location, Location::Basin("beas".to_string()));
        let sources: Vec<&str> = report.aligned.iter().map(|d| d.source()).collect();
        assert_eq!(sources, vec!["ERA5", "CRU", "CORDEX"]);

        for dataset in &report.aligned {
            assert_eq!(dataset.len(), 16 * 12, "{}", dataset.source());
            assert_eq!(dataset.footprint().len(), 3, "{}", dataset.source());
        }

        // Ensemble mean recovers the seasonal cycle, so ERA5 and CRU agree
        let era5 = report.summary("ERA5").unwrap();
        let cru = report.summary("CRU").unwrap();
        assert_relative_eq!(era5.mean, 2.0, epsilon = 1e-9);
        assert_relative_eq!(cru.mean, era5.mean, epsilon = 1e-9);
        assert_relative_eq!(report.summary("CORDEX").unwrap().mean, 4.0, epsilon = 1e-9);

        let r = report.correlations.get("ERA5", "CORDEX").unwrap();
        assert_relative_eq!(r, 1.0, epsilon = 1e-9);
        assert!(report.model_spread.is_none());
    }

    #[test]
    fn test_model_is_evaluated_on_reference_grid() {
        let mut benchmark = Benchmark::new(config(), fetcher(), masks()).with_model(SeasonalModel);
        let report = benchmark
            .run(&Location::Basin("beas".to_string()))
            .unwrap();

        let model = report.aligned.get("GPR").unwrap();
        let era5 = report.aligned.get("ERA5").unwrap();
        assert_eq!(model.times(), era5.times());
        assert_eq!(model.footprint(), era5.footprint());
        assert_relative_eq!(report.summary("GPR").unwrap().mean, 2.0, epsilon = 1e-6);
        assert_relative_eq!(report.correlations.get("GPR", "CRU").unwrap(), 1.0, epsilon = 1e-6);

        let spread = report.model_spread.as_ref().unwrap();
        assert_eq!(spread.source(), "GPR std");
        assert_relative_eq!(spread.values()[[0, 0]], 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_ensemble_member_policy() {
        let config = BenchmarkConfig {
            ensemble: EnsemblePolicy::Member(1),
            ..config()
        };
        let mut benchmark = Benchmark::new(config, fetcher(), masks());
        let report = benchmark.run_default().unwrap();
        assert_relative_eq!(report.summary("ERA5").unwrap().mean, 2.5, epsilon = 1e-9);
    }
}

mod point_runs {
    use super::*;

    #[test]
    fn test_station_run() {
        let mut benchmark = Benchmark::new(config(), fetcher(), masks());
        let report = benchmark.run(&Location::Station("Kasol".to_string())).unwrap();
        for dataset in &report.aligned {
            assert_eq!(dataset.footprint().len(), 1);
        }
        let text = report.to_string();
        assert!(text.contains("mean = "));
        assert!(text.contains("slope = "));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let mut benchmark = Benchmark::new(config(), fetcher(), masks());
        let report = benchmark
            .run(&Location::Point {
                lat: 31.6,
                lon: 77.1,
            })
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["summaries"].as_array().unwrap().len(), 3);
        assert_eq!(json["summaries"][1]["source"], "CRU");
        assert_eq!(json["correlations"]["sources"][2], "CORDEX");
    }
}

mod empty_windows {
    use super::*;

    /// Scenario run that starts after the comparison window closes.
    fn late_cmip5() -> GriddedField {
        let years: Vec<f64> = (0..10 * 12).map(|m| 2050.0 + m as f64 / 12.0).collect();
        let n = years.len();
        GriddedField::new(
            "CMIP5",
            Units::mm_per_day(),
            TimeAxis::fractional_years(years, Calendar::Standard),
            LAT.to_vec(),
            LON.to_vec(),
            Array3::from_elem((n, 3, 3), 3.0),
        )
        .unwrap()
    }

    #[test]
    fn test_source_outside_window_reports_undefined_statistics() {
        let config = BenchmarkConfig {
            sources: vec!["ERA5".to_string(), "CMIP5".to_string()],
            ..config()
        };
        let fetcher: InMemoryFetcher = [era5(), late_cmip5()].into_iter().collect();
        let mut benchmark = Benchmark::new(config, fetcher, masks());
        let report = benchmark.run_default().unwrap();

        assert_eq!(report.aligned.warnings().len(), 1);
        assert_eq!(report.aligned.warnings()[0].source, "CMIP5");
        assert!(report.aligned.get("CMIP5").unwrap().is_empty());

        let cmip5 = report.summary("CMIP5").unwrap();
        assert_eq!(cmip5.n, 0);
        assert!(cmip5.mean.is_nan());
        assert!(cmip5.trend_slope.is_nan());
        assert_relative_eq!(report.summary("ERA5").unwrap().mean, 2.0, epsilon = 1e-9);
        assert!(report.correlations.get("ERA5", "CMIP5").unwrap().is_nan());
        assert!(report.to_string().contains("warning: "));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert!(json["summaries"][1]["mean"].is_null());
        assert_eq!(json["summaries"][0]["source"], "ERA5");
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_unknown_station() {
        let mut benchmark = Benchmark::new(config(), fetcher(), masks());
        assert!(matches!(
            benchmark.run(&Location::Station("Nowhere".to_string())),
            Err(BenchError::UnknownStation(_))
        ));
    }

    #[test]
    fn test_missing_dataset_is_fetch_error() {
        let config = BenchmarkConfig {
            sources: vec!["ERA5".to_string(), "CMIP5".to_string()],
            ..config()
        };
        let mut benchmark = Benchmark::new(config, fetcher(), masks());
        match benchmark.run_default() {
            Err(BenchError::Fetch { source_id, .. }) => assert_eq!(source_id, "CMIP5"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_disjoint_basin_names_failing_source() {
        let mut masks = masks();
        masks.insert(
            BasinMask::new("ganges", vec![25.0, 26.0], vec![85.0, 86.0], Array2::ones((2, 2)))
                .unwrap(),
        );
        let mut benchmark = Benchmark::new(config(), fetcher(), masks);
        match benchmark.run(&Location::Basin("ganges".to_string())) {
            Err(BenchError::Alignment { dataset, cause }) => {
                assert_eq!(dataset, "ERA5");
                assert!(matches!(*cause, BenchError::EmptySelection { .. }));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_model_needs_reference_source() {
        let config = BenchmarkConfig {
            sources: vec!["CRU".to_string()],
            ..config()
        };
        let mut benchmark = Benchmark::new(config, fetcher(), masks()).with_model(SeasonalModel);
        assert!(matches!(benchmark.run_default(), Err(BenchError::Config(_))));
    }
}

//! Orchestration of the alignment pipeline.
//!
//! Every source goes through the same stages in a fixed order:
//!
//! 1. longitudes wrapped onto -180..180 and calendar normalization to
//!    fractional years
//! 2. unit conversion to mm/day
//! 3. ensemble reduction
//! 4. spatial selection (point or basin)
//! 5. windowing
//!
//! Units are converted before any averaging so that per-month depths are
//! divided by their own month length rather than an average one.
//!
//! # Examples
//!
//! ```rust
//! use hydrobench_core::aligner::DatasetAligner;
//! use hydrobench_core::calendar::TimeAxis;
//! use hydrobench_core::field::{GriddedField, PointSpec};
//! use hydrobench_core::spatial::Selection;
//! use hydrobench_core::units::Units;
//! use hydrobench_core::window::TimeWindow;
//! use ndarray::array;
//!
//! let era5 = GriddedField::new(
//!     "ERA5",
//!     Units::parse("m").unwrap(),
//!     TimeAxis::cf(vec![0.0, 744.0], "hours since 2000-01-01", "gregorian").unwrap(),
//!     vec![35.0],
//!     vec![75.0],
//!     array![[[0.001]], [[0.002]]],
//! )
//! .unwrap();
//!
//! let aligner = DatasetAligner::new(
//!     Selection::Point(PointSpec::new(35.1, 74.9)),
//!     TimeWindow::years(2000, 2000).unwrap(),
//! );
//! let set = aligner.align(&[era5]).unwrap();
//! assert_eq!(set.len(), 1);
//! assert_eq!(set.datasets()[0].cell_mean_series(), vec![1.0, 2.0]);
//! ```

use crate::aligned::AlignedDataset;
use crate::calendar::normalize_time;
use crate::ensemble::{reduce_ensemble, EnsemblePolicy};
use crate::errors::{BenchError, BenchResult};
use crate::field::GriddedField;
use crate::spatial::{select, Selection};
use crate::units::to_mm_per_day;
use crate::window::{window, TimeWindow, WindowEmptyWarning, Windowed};
use serde::{Deserialize, Serialize};

/// Tunable parts of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerOptions {
    /// How ensemble sources are collapsed. Defaults to the member mean.
    pub ensemble: EnsemblePolicy,
}

/// Datasets on a common basis, in the order they were supplied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignedSet {
    datasets: Vec<AlignedDataset>,
    warnings: Vec<WindowEmptyWarning>,
}

impl AlignedSet {
    pub fn datasets(&self) -> &[AlignedDataset] {
        &self.datasets
    }

    /// Sources whose window kept no records
    pub fn warnings(&self) -> &[WindowEmptyWarning] {
        &self.warnings
    }

    /// Looks up a dataset by provenance label.
    pub fn get(&self, source: &str) -> Option<&AlignedDataset> {
        self.datasets.iter().find(|d| d.source() == source)
    }

    /// Appends a dataset produced outside the pipeline (e.g. model output).
    pub fn push(&mut self, dataset: AlignedDataset) {
        self.datasets.push(dataset);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AlignedDataset> {
        self.datasets.iter()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl<'a> IntoIterator for &'a AlignedSet {
    type Item = &'a AlignedDataset;
    type IntoIter = std::slice::Iter<'a, AlignedDataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.datasets.iter()
    }
}

/// Brings raw fields onto a shared spatial and temporal basis.
#[derive(Debug, Clone)]
pub struct DatasetAligner {
    selection: Selection,
    window: TimeWindow,
    options: AlignerOptions,
}

impl DatasetAligner {
    pub fn new(selection: Selection, window: TimeWindow) -> Self {
        Self {
            selection,
            window,
            options: AlignerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AlignerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Runs one field through every stage.
    pub fn align_one(&self, field: &GriddedField) -> BenchResult<Windowed<AlignedDataset>> {
        log::debug!("Aligning '{}'", field.source());
        let wrapped = field.with_wrapped_longitudes()?;
        let normalized = normalize_time(&wrapped)?;
        let converted = to_mm_per_day(&normalized)?;
        let reduced = reduce_ensemble(&converted, self.options.ensemble)?;
        let series = select(&reduced, &self.selection)?;
        let dataset = AlignedDataset::from_series(&series)?;
        window(&dataset, &self.window)
    }

    /// Aligns every field, preserving input order.
    ///
    /// The first failing field aborts the batch with
    /// [`BenchError::Alignment`] naming that field. Empty windows are not
    /// failures; they are collected in [`AlignedSet::warnings`].
    pub fn align(&self, fields: &[GriddedField]) -> BenchResult<AlignedSet> {
        let mut set = AlignedSet::default();
        for field in fields {
            let windowed = self
                .align_one(field)
                .map_err(|cause| BenchError::Alignment {
                    dataset: field.source().to_string(),
                    cause: Box::new(cause),
                })?;
            log::info!(
                "Aligned '{}': {} records over {} cells",
                field.source(),
                windowed.data.len(),
                windowed.data.footprint().len()
            );
            if let Some(warning) = windowed.warning {
                set.warnings.push(warning);
            }
            set.datasets.push(windowed.data);
        }
        Ok(set)
    }
}

/// Aligns `fields` with the default options.
pub fn align(fields: &[GriddedField], selection: &Selection, window: &TimeWindow) -> BenchResult<AlignedSet> {
    DatasetAligner::new(selection.clone(), *window).align(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Calendar, TimeAxis};
    use crate::field::{BasinMask, PointSpec};
    use crate::units::Units;
    use is_close::is_close;
    use ndarray::{array, Array2, Array3, Array4};

    fn cru() -> GriddedField {
        GriddedField::new(
            "CRU",
            Units::parse("mm/month").unwrap(),
            TimeAxis::iso(vec!["1999-12-16", "2000-02-15", "2000-03-16"], Calendar::Standard),
            vec![35.0, 35.5],
            vec![75.0, 75.5],
            Array3::from_elem((3, 2, 2), 58.0),
        )
        .unwrap()
    }

    fn cordex() -> GriddedField {
        GriddedField::new(
            "CORDEX",
            Units::parse("kg m-2 s-1").unwrap(),
            TimeAxis::cf(vec![45.0, 75.0], "days since 2000-01-01", "360_day").unwrap(),
            vec![35.0, 35.44],
            vec![75.0, 75.44],
            Array3::from_elem((2, 2, 2), 1.0 / 86_400.0),
        )
        .unwrap()
    }

    fn point_aligner() -> DatasetAligner {
        DatasetAligner::new(
            Selection::Point(PointSpec::new(35.2, 75.2)),
            TimeWindow::years(2000, 2000).unwrap(),
        )
    }

    #[test]
    fn test_sources_end_up_on_a_shared_basis() {
        let set = point_aligner().align(&[cru(), cordex()]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.warnings().is_empty());

        let cru = set.get("CRU").unwrap();
        assert!(cru.units().is_mm_per_day());
        // December 1999 is outside the window, February 2000 has 29 days
        assert_eq!(cru.len(), 2);
        assert!(is_close!(cru.values()[[0, 0]], 2.0));

        let cordex = set.get("CORDEX").unwrap();
        assert_eq!(cordex.calendar(), Calendar::Day360);
        assert!(is_close!(cordex.values()[[1, 0]], 1.0));
    }

    #[test]
    fn test_input_order_is_preserved() {
        let set = point_aligner().align(&[cordex(), cru()]).unwrap();
        let sources: Vec<&str> = set.iter().map(|d| d.source()).collect();
        assert_eq!(sources, vec!["CORDEX", "CRU"]);
    }

    #[test]
    fn test_first_failure_names_the_source() {
        let mask = BasinMask::new("indus", vec![35.0, 35.5], vec![75.0, 75.5], Array2::zeros((2, 2)))
            .unwrap();
        let aligner = DatasetAligner::new(Selection::Basin(mask), TimeWindow::years(2000, 2000).unwrap());
        match aligner.align(&[cru(), cordex()]) {
            Err(BenchError::Alignment { dataset, cause }) => {
                assert_eq!(dataset, "CRU");
                assert!(matches!(*cause, BenchError::EmptySelection { .. }));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_empty_window_is_collected_as_warning() {
        let aligner = DatasetAligner::new(
            Selection::Point(PointSpec::new(35.2, 75.2)),
            TimeWindow::years(1990, 1995).unwrap(),
        );
        let set = aligner.align(&[cru()]).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.datasets()[0].is_empty());
        assert_eq!(set.warnings().len(), 1);
    }

    #[test]
    fn test_zero_to_360_longitudes_are_wrapped() {
        let field = GriddedField::new(
            "CMIP5",
            Units::mm_per_day(),
            TimeAxis::fractional_years(vec![2000.0], Calendar::Standard),
            vec![35.0],
            vec![0.0, 90.0, 180.0, 270.0],
            array![[[1.0, 2.0, 3.0, 4.0]]],
        )
        .unwrap();
        let set = align(
            &[field],
            &Selection::Point(PointSpec::new(35.0, -90.0)),
            &TimeWindow::years(2000, 2000).unwrap(),
        )
        .unwrap();
        assert_eq!(set.datasets()[0].values(), &array![[4.0]]);
        let cell = set.datasets()[0].footprint().cells()[0];
        assert_eq!(cell.lon, -90.0);
    }

    #[test]
    fn test_ensemble_policy_is_applied() {
        let era5 = GriddedField::with_members(
            "ERA5",
            Units::parse("mm/day").unwrap(),
            TimeAxis::fractional_years(vec![2000.0], Calendar::Standard),
            vec![0.0, 1.0],
            vec![35.0],
            vec![75.0],
            Array4::from_shape_vec((1, 2, 1, 1), vec![1.0, 3.0]).unwrap(),
        )
        .unwrap();
        let window = TimeWindow::years(2000, 2000).unwrap();
        let selection = Selection::Point(PointSpec::new(35.0, 75.0));

        let mean = align(&[era5.clone()], &selection, &window).unwrap();
        assert_eq!(mean.datasets()[0].values(), &array![[2.0]]);

        let member = DatasetAligner::new(selection, window)
            .with_options(AlignerOptions {
                ensemble: EnsemblePolicy::Member(1),
            })
            .align(&[era5])
            .unwrap();
        assert_eq!(member.datasets()[0].values(), &array![[3.0]]);
    }
}

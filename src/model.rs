//! Model output preparation.
//!
//! The regression model is trained on `log1p` of precipitation in metres per
//! day. It is evaluated at every grid cell and time step of a reference
//! dataset, and its predictions are transformed back to mm/day so they can
//! be compared with the aligned observations.

use hydrobench_core::aligned::AlignedDataset;
use hydrobench_core::errors::{BenchError, BenchResult};
use hydrobench_core::units::inverse_log_transform;
use ndarray::{Array1, Array2, ArrayView2};

/// A trained precipitation model.
pub trait Predictor {
    /// Predictive mean and standard deviation for each row of `features`.
    ///
    /// Rows are `(time, lat, lon)` with time in fractional years. Outputs are
    /// in `log1p(m/day)` space and must have one value per row.
    fn predict(&self, features: ArrayView2<f64>) -> BenchResult<(Array1<f64>, Array1<f64>)>;
}

/// Model series on the footprint and time stamps of a reference dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    /// Predictive mean in mm/day
    pub mean: AlignedDataset,
    /// Predictive spread in mm/day
    pub spread: AlignedDataset,
}

/// One `(time, lat, lon)` row per record and cell of `reference`, time-major.
pub fn model_features(reference: &AlignedDataset) -> Array2<f64> {
    let cells = reference.footprint().cells();
    let times = reference.times();
    Array2::from_shape_fn((times.len() * cells.len(), 3), |(row, column)| {
        let cell = &cells[row % cells.len()];
        match column {
            0 => times[row / cells.len()],
            1 => cell.lat,
            _ => cell.lon,
        }
    })
}

fn to_mm_per_day(values: Array1<f64>, shape: (usize, usize)) -> BenchResult<Array2<f64>> {
    let restored = inverse_log_transform(values.view())? * 1000.0;
    restored
        .into_shape_with_order(shape)
        .map_err(|e| BenchError::Error(e.to_string()))
}

/// Evaluates `predictor` on the grid of `reference`.
///
/// Both outputs are transformed with `exp(x) - 1` and scaled from metres to
/// millimetres. The spread series is labelled `"<label> std"`.
pub fn prepare_model_output(
    predictor: &dyn Predictor,
    label: &str,
    reference: &AlignedDataset,
) -> BenchResult<ModelOutput> {
    let features = model_features(reference);
    let (mean, spread) = predictor.predict(features.view())?;
    let rows = features.nrows();
    for (what, output) in [("predictive mean", &mean), ("predictive spread", &spread)] {
        if output.len() != rows {
            return Err(BenchError::ShapeMismatch {
                what: format!("{what} of '{label}'"),
                expected: vec![rows],
                actual: vec![output.len()],
            });
        }
    }
    log::debug!(
        "Evaluated '{label}' at {rows} points on the grid of '{}'",
        reference.source()
    );

    let shape = (reference.len(), reference.footprint().len());
    let build = |source: &str, values: Array1<f64>| {
        AlignedDataset::new(
            source,
            reference.calendar(),
            reference.times().to_vec(),
            reference.footprint().clone(),
            to_mm_per_day(values, shape)?,
        )
    };
    Ok(ModelOutput {
        mean: build(label, mean)?,
        spread: build(&format!("{label} std"), spread)?,
    })
}

//! Benchmark configuration.
//!
//! All run settings live in one [`BenchmarkConfig`] value that is passed to
//! [`crate::benchmark::Benchmark`]. Missing keys fall back to their defaults,
//! so a TOML file only needs to list what differs:
//!
//! ```rust
//! use hydrobench::config::BenchmarkConfig;
//!
//! let config = BenchmarkConfig::from_toml_str(
//!     r#"
//!     sources = ["ERA5", "CRU"]
//!     min_year = 2000
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.sources, vec!["ERA5", "CRU"]);
//! assert_eq!(config.max_year, 2005);
//! ```

use crate::stations::Location;
use hydrobench_core::ensemble::EnsemblePolicy;
use hydrobench_core::errors::{BenchError, BenchResult};
use hydrobench_core::window::TimeWindow;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one benchmark run.
///
/// # Default Values
///
/// Defaults reproduce the Upper Indus comparison of GPR output against
/// ERA5, CMIP5, CORDEX and CRU over 1990 to 2005.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Dataset identifiers passed to the fetcher, in report order.
    /// Default: `["ERA5", "CMIP5", "CORDEX", "CRU"]`
    pub sources: Vec<String>,

    /// Source whose aligned grid and time stamps drive model evaluation.
    /// Default: `"ERA5"`
    pub reference_source: String,

    /// First calendar year of the comparison window.
    /// Default: 1990
    pub min_year: i64,

    /// Last calendar year of the comparison window (inclusive).
    /// Default: 2005
    pub max_year: i64,

    /// Reduction applied to sources with an ensemble axis.
    /// Default: `mean`
    pub ensemble: EnsemblePolicy,

    /// Basin used when no location is given.
    /// Default: `"indus"`
    pub default_basin: String,

    /// Mask file for the default basin.
    ///
    /// Not opened by this crate: it is carried for callers that build a
    /// file-backed [`MaskProvider`](crate::fetch::MaskProvider).
    /// Default: `"Data/ERA5_Upper_Indus_mask.nc"`
    pub mask_path: String,

    /// Saved model location.
    ///
    /// Not opened by this crate: it is carried for callers that restore a
    /// [`Predictor`](crate::model::Predictor) from disk before
    /// [`Benchmark::with_model`](crate::benchmark::Benchmark::with_model).
    /// Default: `"Models/model_2021-01-01/08/21-22-35-56"`
    pub model_path: String,

    /// Provenance label of the model series.
    /// Default: `"GPR"`
    pub model_label: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            sources: ["ERA5", "CMIP5", "CORDEX", "CRU"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            reference_source: "ERA5".to_string(),
            min_year: 1990,
            max_year: 2005,
            ensemble: EnsemblePolicy::Mean,
            default_basin: "indus".to_string(),
            mask_path: "Data/ERA5_Upper_Indus_mask.nc".to_string(),
            model_path: "Models/model_2021-01-01/08/21-22-35-56".to_string(),
            model_label: "GPR".to_string(),
        }
    }
}

impl BenchmarkConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> BenchResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| BenchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> BenchResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded configuration from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.sources.is_empty() {
            return Err(BenchError::Config("at least one source is required".to_string()));
        }
        if self.min_year > self.max_year {
            return Err(BenchError::Config(format!(
                "min_year {} is after max_year {}",
                self.min_year, self.max_year
            )));
        }
        Ok(())
    }

    /// The comparison window covering `min_year..=max_year`.
    pub fn window(&self) -> BenchResult<TimeWindow> {
        TimeWindow::years(self.min_year, self.max_year)
    }

    pub fn default_location(&self) -> Location {
        Location::Basin(self.default_basin.clone())
    }
}

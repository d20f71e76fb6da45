//! End-to-end benchmark runs.
//!
//! A [`Benchmark`] fetches every configured source once, aligns them over a
//! location and window, optionally adds the model series evaluated on the
//! reference source's grid, and reports summary statistics and pairwise
//! correlations.

use crate::config::BenchmarkConfig;
use crate::fetch::{DatasetFetcher, FetchCache, MaskProvider};
use crate::model::{prepare_model_output, Predictor};
use crate::stations::Location;
use hydrobench_core::aligned::AlignedDataset;
use hydrobench_core::aligner::{AlignedSet, AlignerOptions, DatasetAligner};
use hydrobench_core::correlation::{correlation_matrix, CorrelationMatrix};
use hydrobench_core::errors::{BenchError, BenchResult};
use hydrobench_core::stats::{summarize, StatsSummary};
use hydrobench_core::window::TimeWindow;
use serde::Serialize;
use std::fmt;

/// Result of one benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub location: Location,
    pub window: TimeWindow,
    /// Every aligned dataset, model series last
    pub aligned: AlignedSet,
    /// Predictive spread of the model, if a model was evaluated
    pub model_spread: Option<AlignedDataset>,
    /// One summary per aligned dataset, in the same order
    pub summaries: Vec<StatsSummary>,
    pub correlations: CorrelationMatrix,
}

impl BenchmarkReport {
    pub fn summary(&self, source: &str) -> Option<&StatsSummary> {
        self.summaries.iter().find(|s| s.source == source)
    }

    /// Pretty-printed JSON. Undefined statistics serialize as `null`.
    pub fn to_json(&self) -> BenchResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| BenchError::Error(e.to_string()))
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, summary) in self.summaries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{summary}")?;
        }
        for warning in self.aligned.warnings() {
            writeln!(f, "warning: {warning}")?;
        }
        Ok(())
    }
}

/// Compares configured sources (and optionally a model) at a location.
pub struct Benchmark<F, M> {
    config: BenchmarkConfig,
    datasets: FetchCache<F>,
    masks: M,
    model: Option<Box<dyn Predictor>>,
}

impl<F: DatasetFetcher, M: MaskProvider> Benchmark<F, M> {
    pub fn new(config: BenchmarkConfig, fetcher: F, masks: M) -> Self {
        Self {
            config,
            datasets: FetchCache::new(fetcher),
            masks,
            model: None,
        }
    }

    /// Adds a model whose output is benchmarked against the sources.
    pub fn with_model(mut self, model: impl Predictor + 'static) -> Self {
        self.model = Some(Box::new(model));
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Runs the comparison at `location`.
    ///
    /// Datasets are fetched on the first run and reused by later runs at
    /// other locations.
    pub fn run(&mut self, location: &Location) -> BenchResult<BenchmarkReport> {
        self.config.validate()?;
        let window = self.config.window()?;
        let selection = location.resolve(&self.masks)?;
        log::info!("Benchmarking {location:?} over {window}");

        let fields = self.datasets.get_all(&self.config.sources)?;
        let mut aligned = DatasetAligner::new(selection, window)
            .with_options(AlignerOptions {
                ensemble: self.config.ensemble,
            })
            .align(&fields)?;

        let model_spread = match &self.model {
            Some(model) => {
                let reference = aligned.get(&self.config.reference_source).ok_or_else(|| {
                    BenchError::Config(format!(
                        "reference source '{}' is not among the configured sources",
                        self.config.reference_source
                    ))
                })?;
                let output = prepare_model_output(model.as_ref(), &self.config.model_label, reference)?;
                aligned.push(output.mean);
                Some(output.spread)
            }
            None => None,
        };

        let summaries = aligned.iter().map(summarize).collect();
        let correlations = correlation_matrix(&aligned)?;

        Ok(BenchmarkReport {
            location: location.clone(),
            window,
            aligned,
            model_spread,
            summaries,
            correlations,
        })
    }

    /// Runs the comparison over the configured default basin.
    pub fn run_default(&mut self) -> BenchResult<BenchmarkReport> {
        let location = self.config.default_location();
        self.run(&location)
    }
}

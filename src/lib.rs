//! Benchmarking of modelled precipitation.
//!
//! Compares the output of a precipitation model with reanalysis,
//! climate-model and gridded-observation datasets at a point, a gauge
//! station or over a basin. The alignment pipeline itself lives in
//! [`hydrobench_core`]; this crate wires it to configuration, data
//! collaborators and the model.

pub mod benchmark;
pub mod config;
pub mod fetch;
pub mod model;
pub mod stations;

pub use benchmark::{Benchmark, BenchmarkReport};
pub use config::BenchmarkConfig;
pub use hydrobench_core::errors::{BenchError, BenchResult};

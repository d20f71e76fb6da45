//! Alignment and regridding of gridded precipitation datasets.
//!
//! Reanalyses, climate-model runs and gridded observations disagree on
//! resolution, coordinate conventions, calendars, units and time coverage.
//! This crate brings them onto a shared basis (mm/day, fractional years, a
//! single point or basin footprint, a common window) and summarizes the
//! result.
//!
//! The pipeline, leaves first:
//!
//! - [`units`]: unit parsing and conversion to mm/day
//! - [`calendar`]: CF time encodings to canonical fractional years
//! - [`ensemble`]: collapse of ensemble axes
//! - [`spatial`]: nearest-cell and basin-mask selection
//! - [`window`]: restriction to a comparison window
//! - [`aligner`]: the fixed-order orchestration of the above
//! - [`stats`] and [`correlation`]: consumers of the aligned set

pub mod aligned;
pub mod aligner;
pub mod calendar;
pub mod correlation;
pub mod ensemble;
pub mod errors;
pub mod field;
pub mod spatial;
pub mod stats;
pub mod units;
pub mod utils;
pub mod window;

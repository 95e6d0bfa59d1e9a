//! Shop-floor SPC engine: measurement log + Individuals (I) control chart.
//!
//! Records dimensional measurements (machine, part, nominal, measured) in an
//! append-only CSV log, and computes the center line, ±3σ control limits and
//! out-of-control points for a selected machine/part series.
//!
//! No network, no CLI; the entry form and chart rendering live in the caller.

pub mod analyzer;
pub mod chart;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod stats;
pub mod store;
pub mod types;
pub mod validate;

pub use analyzer::{analyze, Analyzer};
pub use chart::ChartSpec;
pub use config::Config;
pub use engine::Engine;
pub use error::SpcError;
pub use store::{CsvFileStore, MeasurementStore, MemoryStore};
pub use types::{
  ErrorOutput, MeasurementRecord, MeasurementSeries, SeriesFilter, SigmaEstimator, Signal, SpcPoint,
  SpcResult,
};

//! Engine configuration with sane defaults.

use std::path::PathBuf;

use crate::types::{SigmaEstimator, Signal};

/// Environment variable naming the measurement log file.
pub const DATA_FILE_ENV: &str = "SPC_DATA_FILE";

/// Default measurement log file name.
pub const DEFAULT_DATA_FILE: &str = "spc_data.csv";

/// Tunables for storage and charting.
#[derive(Debug, Clone)]
pub struct Config {
  /// Location of the CSV measurement log.
  pub data_path: PathBuf,
  /// Which value is plotted and analyzed for each record.
  pub signal: Signal,
  /// How sigma is estimated from the plotted values.
  pub sigma_estimator: SigmaEstimator,
  /// Number of rows shown in the "recent measurements" table.
  pub recent_limit: usize,
  /// Decimal places used in formatted statistics.
  pub display_precision: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_path: PathBuf::from(DEFAULT_DATA_FILE),
      signal: Signal::Deviation,
      sigma_estimator: SigmaEstimator::SampleStdDev,
      recent_limit: 10,
      display_precision: 3,
    }
  }
}

impl Config {
  /// Defaults, with the storage location taken from `SPC_DATA_FILE` when set.
  pub fn from_env() -> Self {
    match std::env::var(DATA_FILE_ENV) {
      Ok(path) if !path.trim().is_empty() => Self::default().with_data_path(path.trim()),
      _ => Self::default(),
    }
  }

  pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.data_path = path.into();
    self
  }
}

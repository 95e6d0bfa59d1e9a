//! Collaborator-facing engine: submit measurements, list recent ones, chart a series.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::analyzer::Analyzer;
use crate::chart::{self, ChartSpec};
use crate::config::Config;
use crate::error::SpcError;
use crate::store::{CsvFileStore, MeasurementStore, MemoryStore};
use crate::types::*;
use crate::validate;

/// The SPC engine. Owns the measurement store; analysis is recomputed per request.
pub struct Engine<S = CsvFileStore> {
  config: Config,
  analyzer: Analyzer,
  store: S,
}

impl Engine<CsvFileStore> {
  /// Open (or initialise) the CSV log at `config.data_path`.
  pub fn open(config: Config) -> Result<Self, SpcError> {
    let store = CsvFileStore::open(&config.data_path)?;
    Ok(Self::with_store(config, store))
  }
}

impl Engine<MemoryStore> {
  pub fn in_memory(config: Config) -> Self {
    Self::with_store(config, MemoryStore::new())
  }
}

impl<S: MeasurementStore> Engine<S> {
  pub fn with_store(config: Config, store: S) -> Self {
    let analyzer = Analyzer::new(config.sigma_estimator);
    Self {
      config,
      analyzer,
      store,
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Record a measurement taken now.
  pub fn submit_measurement(
    &mut self,
    machine: &str,
    part: &str,
    nominal: f64,
    measured: f64,
  ) -> Result<MeasurementRecord, SpcError> {
    self.submit_measurement_at(Utc::now(), machine, part, nominal, measured)
  }

  /// Record a measurement taken at `timestamp`.
  pub fn submit_measurement_at(
    &mut self,
    timestamp: DateTime<Utc>,
    machine: &str,
    part: &str,
    nominal: f64,
    measured: f64,
  ) -> Result<MeasurementRecord, SpcError> {
    let raw = NewMeasurement {
      machine: machine.to_string(),
      part: part.to_string(),
      nominal,
      measured,
    };
    self.submit(&raw, timestamp)
  }

  /// Validate a form submission and append it to the log.
  pub fn submit(&mut self, raw: &NewMeasurement, timestamp: DateTime<Utc>) -> Result<MeasurementRecord, SpcError> {
    let record = match validate::normalize(raw, timestamp) {
      Ok(r) => r,
      Err(e) => {
        warn!(error = %e, "rejected measurement");
        return Err(e);
      }
    };
    self.store.append(record.clone())?;
    Ok(record)
  }

  /// The last `n` records across all machines, oldest first.
  pub fn get_recent(&self, n: usize) -> Result<Vec<MeasurementRecord>, SpcError> {
    let all = self.store.load_all()?;
    Ok(all.tail(n).to_vec())
  }

  /// The recent-measurements table at the configured length.
  pub fn recent(&self) -> Result<Vec<MeasurementRecord>, SpcError> {
    self.get_recent(self.config.recent_limit)
  }

  /// Distinct machines in the log, in first-seen order.
  pub fn machines(&self) -> Result<Vec<String>, SpcError> {
    Ok(self.store.load_all()?.machines())
  }

  /// Control chart statistics for the selected records, using the configured signal.
  pub fn get_chart_data(&self, filter: &SeriesFilter) -> Result<SpcResult, SpcError> {
    self.get_chart_data_for(filter, self.config.signal)
  }

  /// Control chart statistics for the selected records under `signal`.
  pub fn get_chart_data_for(&self, filter: &SeriesFilter, signal: Signal) -> Result<SpcResult, SpcError> {
    let series = self.store.load(filter)?;
    self.analyze_series(&series, signal)
  }

  /// Full chart description for the selected records, using the configured signal.
  pub fn render_chart(&self, filter: &SeriesFilter) -> Result<ChartSpec, SpcError> {
    let signal = self.config.signal;
    let series = self.store.load(filter)?;
    let result = self.analyze_series(&series, signal)?;
    Ok(chart::build(
      &series,
      &result,
      signal,
      self.config.display_precision,
    ))
  }

  fn analyze_series(&self, series: &MeasurementSeries, signal: Signal) -> Result<SpcResult, SpcError> {
    debug!(records = series.len(), signal = signal.label(), "charting series");
    self.analyzer.analyze(&series.values(signal))
  }
}

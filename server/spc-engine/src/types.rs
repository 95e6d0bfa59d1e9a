//! Core types for the SPC engine (records, series, analysis results).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SpcError;
use crate::validate::normalize_identifier;

// ---------------------------------------------------------------------------
// Inbound types (what the entry form submits)
// ---------------------------------------------------------------------------

/// One measurement as typed into the entry form. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMeasurement {
  pub machine: String,
  #[serde(default)]
  pub part: String,
  pub nominal: f64,
  pub measured: f64,
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// A validated measurement as persisted in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub machine: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub part: Option<String>,
  pub nominal: f64,
  pub measured: f64,
}

impl MeasurementRecord {
  /// Measured minus nominal.
  pub fn deviation(&self) -> f64 {
    self.measured - self.nominal
  }

  /// The value plotted for this record under the given signal.
  pub fn value(&self, signal: Signal) -> f64 {
    match signal {
      Signal::Deviation => self.deviation(),
      Signal::Measured => self.measured,
    }
  }
}

/// Selection criteria for a chart. Absent criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesFilter {
  #[serde(default)]
  pub machine: Option<String>,
  #[serde(default)]
  pub part: Option<String>,
}

impl SeriesFilter {
  pub fn all() -> Self {
    Self::default()
  }

  /// Criteria are trimmed like stored identifiers; a blank one is dropped.
  pub fn machine(machine: &str) -> Self {
    Self {
      machine: normalize_identifier(machine),
      part: None,
    }
  }

  pub fn part(part: &str) -> Self {
    Self {
      machine: None,
      part: normalize_identifier(part),
    }
  }

  pub fn and_part(mut self, part: &str) -> Self {
    self.part = normalize_identifier(part);
    self
  }

  pub fn is_empty(&self) -> bool {
    self.machine.is_none() && self.part.is_none()
  }

  pub fn matches(&self, record: &MeasurementRecord) -> bool {
    let machine_ok = match &self.machine {
      Some(m) => record.machine.as_deref() == Some(m.trim()),
      None => true,
    };
    let part_ok = match &self.part {
      Some(p) => record.part.as_deref() == Some(p.trim()),
      None => true,
    };
    machine_ok && part_ok
  }
}

/// Ordered measurement history; insertion order is chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MeasurementSeries {
  records: Vec<MeasurementRecord>,
}

impl MeasurementSeries {
  pub fn new(records: Vec<MeasurementRecord>) -> Self {
    Self { records }
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, MeasurementRecord> {
    self.records.iter()
  }

  pub fn records(&self) -> &[MeasurementRecord] {
    &self.records
  }

  pub fn last(&self) -> Option<&MeasurementRecord> {
    self.records.last()
  }

  /// The last `n` records, oldest first.
  pub fn tail(&self, n: usize) -> &[MeasurementRecord] {
    let start = self.records.len().saturating_sub(n);
    &self.records[start..]
  }

  /// Records matching `filter`, order preserved.
  pub fn filtered(&self, filter: &SeriesFilter) -> MeasurementSeries {
    Self::new(
      self
        .records
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect(),
    )
  }

  /// The plotted values under `signal`, in series order.
  pub fn values(&self, signal: Signal) -> Vec<f64> {
    self.records.iter().map(|r| r.value(signal)).collect()
  }

  /// Distinct machine identifiers in first-seen order.
  pub fn machines(&self) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for machine in self.records.iter().filter_map(|r| r.machine.as_ref()) {
      if !seen.iter().any(|m| m == machine) {
        seen.push(machine.clone());
      }
    }
    seen
  }

  pub(crate) fn push(&mut self, record: MeasurementRecord) {
    self.records.push(record);
  }
}

impl IntoIterator for MeasurementSeries {
  type Item = MeasurementRecord;
  type IntoIter = std::vec::IntoIter<MeasurementRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.into_iter()
  }
}

impl<'a> IntoIterator for &'a MeasurementSeries {
  type Item = &'a MeasurementRecord;
  type IntoIter = std::slice::Iter<'a, MeasurementRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.iter()
  }
}

// ---------------------------------------------------------------------------
// Analysis choices
// ---------------------------------------------------------------------------

/// Which quantity is charted for each record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
  /// Measured minus nominal.
  #[default]
  Deviation,
  /// The raw recorded dimension.
  Measured,
}

impl Signal {
  pub fn label(self) -> &'static str {
    match self {
      Self::Deviation => "Deviation",
      Self::Measured => "Recorded",
    }
  }
}

/// How sigma is estimated for the control limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaEstimator {
  /// Sample standard deviation (n - 1 divisor).
  #[default]
  SampleStdDev,
  /// Average moving range divided by d2 = 1.128.
  MovingRange,
}

// ---------------------------------------------------------------------------
// Analysis output
// ---------------------------------------------------------------------------

/// One plotted point on an Individuals chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpcPoint {
  pub index: usize,
  pub value: f64,
  pub is_violation: bool,
}

/// Center line, control limits and annotated points for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpcResult {
  pub estimator: SigmaEstimator,
  pub center: f64,
  pub sigma: f64,
  pub ucl: f64,
  pub lcl: f64,
  pub points: Vec<SpcPoint>,
}

impl SpcResult {
  /// Indices of points outside [lcl, ucl].
  pub fn violations(&self) -> Vec<usize> {
    self
      .points
      .iter()
      .filter(|p| p.is_violation)
      .map(|p| p.index)
      .collect()
  }

  pub fn is_in_control(&self) -> bool {
    self.points.iter().all(|p| !p.is_violation)
  }
}

// ---------------------------------------------------------------------------
// Collaborator-facing error payload
// ---------------------------------------------------------------------------

/// Structured error for user-visible display.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

impl From<&SpcError> for ErrorOutput {
  fn from(e: &SpcError) -> Self {
    match e {
      SpcError::Validation { field, reason } => Self::new(reason.clone()).with_field(field.clone()),
      _ => Self::new(e.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn record(machine: Option<&str>, part: Option<&str>, nominal: f64, measured: f64) -> MeasurementRecord {
    MeasurementRecord {
      timestamp: Utc.with_ymd_and_hms(2025, 3, 4, 8, 0, 0).unwrap(),
      machine: machine.map(String::from),
      part: part.map(String::from),
      nominal,
      measured,
    }
  }

  #[test]
  fn deviation_is_measured_minus_nominal() {
    let r = record(Some("Machine 1"), None, 25.0, 25.5);
    assert!((r.deviation() - 0.5).abs() < 1e-12);
    assert!((r.value(Signal::Measured) - 25.5).abs() < f64::EPSILON);
  }

  #[test]
  fn filter_requires_every_present_criterion() {
    let r = record(Some("Machine 1"), Some("P-100"), 1.0, 1.0);
    assert!(SeriesFilter::all().matches(&r));
    assert!(SeriesFilter::machine("Machine 1").matches(&r));
    assert!(SeriesFilter::machine("Machine 1").and_part("P-100").matches(&r));
    assert!(!SeriesFilter::machine("Machine 1").and_part("P-200").matches(&r));
    assert!(!SeriesFilter::part("P-100").matches(&record(None, None, 1.0, 1.0)));
  }

  #[test]
  fn filter_criteria_are_trimmed_like_identifiers() {
    let r = record(Some("Machine 1"), Some("P-100"), 1.0, 1.0);
    assert!(SeriesFilter::machine(" Machine 1 ").matches(&r));
    assert!(SeriesFilter::part("P-100\t").matches(&r));
    assert_eq!(SeriesFilter::machine("   "), SeriesFilter::all());

    let deserialized: SeriesFilter = serde_json::from_str(r#"{"machine":" Machine 1"}"#).unwrap();
    assert!(deserialized.matches(&r));
  }

  #[test]
  fn tail_keeps_chronological_order() {
    let series = MeasurementSeries::new(
      (0..5).map(|i| record(None, None, 0.0, i as f64)).collect(),
    );
    let tail: Vec<f64> = series.tail(2).iter().map(|r| r.measured).collect();
    assert_eq!(tail, vec![3.0, 4.0]);
    assert_eq!(series.tail(50).len(), 5);
    assert!(series.tail(0).is_empty());
  }

  #[test]
  fn machines_are_distinct_in_first_seen_order() {
    let series = MeasurementSeries::new(vec![
      record(Some("Machine 2"), None, 0.0, 0.0),
      record(Some("Machine 1"), None, 0.0, 0.0),
      record(None, None, 0.0, 0.0),
      record(Some("Machine 2"), None, 0.0, 0.0),
    ]);
    assert_eq!(series.machines(), vec!["Machine 2", "Machine 1"]);
  }

  #[test]
  fn error_output_carries_validation_field() {
    let err = SpcError::validation("nominal", "must be a finite number");
    let out = ErrorOutput::from(&err);
    assert!(out.error);
    assert_eq!(out.field.as_deref(), Some("nominal"));
    let json = serde_json::to_string(&out).unwrap();
    assert!(json.contains("\"field\":\"nominal\""));
  }
}

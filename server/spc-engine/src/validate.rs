//! Validate inbound measurements and turn them into canonical records.

use chrono::{DateTime, Datelike, Utc};

use crate::error::SpcError;
use crate::types::{MeasurementRecord, NewMeasurement};

/// Validate a form submission and build the record stored at `timestamp`.
///
/// The machine is required; the part number may be blank.
pub fn normalize(raw: &NewMeasurement, timestamp: DateTime<Utc>) -> Result<MeasurementRecord, SpcError> {
  let machine = normalize_identifier(&raw.machine)
    .ok_or_else(|| SpcError::validation("machine", "must not be empty"))?;

  let record = MeasurementRecord {
    timestamp,
    machine: Some(machine),
    part: normalize_identifier(&raw.part),
    nominal: raw.nominal,
    measured: raw.measured,
  };
  validate_record(&record)?;
  Ok(record)
}

/// Years the persisted RFC 3339 timestamp can hold as four digits.
const TIMESTAMP_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Check the invariants every stored record must hold.
pub fn validate_record(record: &MeasurementRecord) -> Result<(), SpcError> {
  if !TIMESTAMP_YEARS.contains(&record.timestamp.year()) {
    return Err(SpcError::validation("timestamp", "year must be between 0 and 9999"));
  }
  if !record.nominal.is_finite() {
    return Err(SpcError::validation("nominal", "must be a finite number"));
  }
  if !record.measured.is_finite() {
    return Err(SpcError::validation("measured", "must be a finite number"));
  }
  if !record.deviation().is_finite() {
    return Err(SpcError::validation("measured", "deviation from nominal is out of range"));
  }
  if let Some(machine) = &record.machine {
    check_identifier("machine", machine)?;
  }
  if let Some(part) = &record.part {
    check_identifier("part", part)?;
  }
  Ok(())
}

/// Trim an identifier; blank input means "not given".
pub fn normalize_identifier(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_string())
  }
}

fn check_identifier(field: &str, value: &str) -> Result<(), SpcError> {
  if value.trim().is_empty() {
    return Err(SpcError::validation(field, "must not be blank when given"));
  }
  if value.contains(['\n', '\r']) {
    return Err(SpcError::validation(field, "must not contain line breaks"));
  }
  Ok(())
}

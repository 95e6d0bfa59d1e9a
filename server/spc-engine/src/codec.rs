//! Line-oriented CSV encoding of the measurement log.
//!
//! One header row, then one record per row. Timestamps are RFC 3339 UTC and
//! numbers use plain decimal notation that parses back to the same `f64`.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::SpcError;
use crate::types::MeasurementRecord;

const FULL_HEADER: [&str; 5] = ["Timestamp", "Machine", "Part", "Nominal", "Measured"];
const SIMPLIFIED_HEADER: [&str; 3] = ["Timestamp", "Nominal", "Recorded"];

/// Naive timestamp formats accepted on load, read as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Column layout of a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
  /// `Timestamp,Machine,Part,Nominal,Measured`
  Full,
  /// `Timestamp,Nominal,Recorded`; no identifiers.
  Simplified,
}

impl Layout {
  pub fn columns(self) -> &'static [&'static str] {
    match self {
      Self::Full => &FULL_HEADER,
      Self::Simplified => &SIMPLIFIED_HEADER,
    }
  }

  /// Recognise a header row.
  pub fn detect(header: &str) -> Result<Self, SpcError> {
    let fields = split_fields(header.trim_start_matches('\u{feff}'))
      .map_err(|e| SpcError::storage(format!("line 1: {}", e)))?;
    let names: Vec<&str> = fields.iter().map(|f| f.trim()).collect();
    for layout in [Self::Full, Self::Simplified] {
      if names == layout.columns() {
        return Ok(layout);
      }
    }
    Err(SpcError::storage(format!(
      "line 1: unrecognised header {:?}, expected {:?}",
      header,
      FULL_HEADER.join(",")
    )))
  }

  /// Whether this layout can hold `record` without dropping fields.
  pub fn can_hold(self, record: &MeasurementRecord) -> bool {
    match self {
      Self::Full => true,
      Self::Simplified => record.machine.is_none() && record.part.is_none(),
    }
  }
}

pub fn encode_header(layout: Layout) -> String {
  layout.columns().join(",")
}

pub fn encode_record(layout: Layout, record: &MeasurementRecord) -> String {
  let timestamp = record.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true);
  let nominal = format_number(record.nominal);
  let measured = format_number(record.measured);
  match layout {
    Layout::Full => {
      let machine = record.machine.as_deref().unwrap_or("");
      let part = record.part.as_deref().unwrap_or("");
      format!(
        "{},{},{},{},{}",
        timestamp,
        quote(machine),
        quote(part),
        nominal,
        measured
      )
    }
    Layout::Simplified => format!("{},{},{}", timestamp, nominal, measured),
  }
}

/// Decode one data row. `line_no` is 1-based and only used in messages.
pub fn decode_record(layout: Layout, line: &str, line_no: usize) -> Result<MeasurementRecord, SpcError> {
  let at = |msg: String| SpcError::storage(format!("line {}: {}", line_no, msg));

  let fields = split_fields(line).map_err(at)?;
  let expected = layout.columns().len();
  if fields.len() != expected {
    return Err(at(format!("expected {} fields, found {}", expected, fields.len())));
  }

  let timestamp = parse_timestamp(&fields[0]).map_err(at)?;
  let (machine, part, nominal, measured) = match layout {
    Layout::Full => (
      non_empty(&fields[1]),
      non_empty(&fields[2]),
      parse_number("Nominal", &fields[3]).map_err(at)?,
      parse_number("Measured", &fields[4]).map_err(at)?,
    ),
    Layout::Simplified => (
      None,
      None,
      parse_number("Nominal", &fields[1]).map_err(at)?,
      parse_number("Recorded", &fields[2]).map_err(at)?,
    ),
  };

  Ok(MeasurementRecord {
    timestamp,
    machine,
    part,
    nominal,
    measured,
  })
}

/// Shortest plain-decimal rendering that reads back bit-identical.
pub fn format_number(v: f64) -> String {
  format!("{}", v)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
  let raw = raw.trim();
  if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
    return Ok(ts.with_timezone(&Utc));
  }
  for fmt in NAIVE_FORMATS {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
      return Ok(naive.and_utc());
    }
  }
  Err(format!("invalid Timestamp {:?}", raw))
}

fn parse_number(column: &str, raw: &str) -> Result<f64, String> {
  let v: f64 = raw
    .trim()
    .parse()
    .map_err(|_| format!("invalid {} {:?}", column, raw))?;
  if !v.is_finite() {
    return Err(format!("non-finite {} {:?}", column, raw));
  }
  Ok(v)
}

fn non_empty(field: &str) -> Option<String> {
  if field.is_empty() {
    None
  } else {
    Some(field.to_string())
  }
}

fn quote(field: &str) -> Cow<'_, str> {
  let needs_quotes = field.contains([',', '"'])
    || field.starts_with(char::is_whitespace)
    || field.ends_with(char::is_whitespace);
  if needs_quotes {
    Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
  } else {
    Cow::Borrowed(field)
  }
}

/// Split one row into fields, honouring double-quoted fields with `""` escapes.
fn split_fields(line: &str) -> Result<Vec<String>, String> {
  let mut fields = Vec::new();
  let mut current = String::new();
  let mut chars = line.chars().peekable();

  loop {
    if chars.peek() == Some(&'"') {
      chars.next();
      loop {
        match chars.next() {
          Some('"') if chars.peek() == Some(&'"') => {
            chars.next();
            current.push('"');
          }
          Some('"') => break,
          Some(c) => current.push(c),
          None => return Err("unterminated quoted field".to_string()),
        }
      }
      match chars.next() {
        Some(',') => fields.push(std::mem::take(&mut current)),
        None => {
          fields.push(current);
          return Ok(fields);
        }
        Some(c) => return Err(format!("unexpected {:?} after quoted field", c)),
      }
    } else {
      loop {
        match chars.next() {
          Some(',') => {
            fields.push(std::mem::take(&mut current));
            break;
          }
          Some(c) => current.push(c),
          None => {
            fields.push(current);
            return Ok(fields);
          }
        }
      }
    }
  }
}

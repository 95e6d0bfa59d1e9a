//! Append-only measurement log: the `MeasurementStore` trait, a CSV file
//! backend with atomic writes, and an in-memory backend.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::codec::{self, Layout};
use crate::error::SpcError;
use crate::types::{MeasurementRecord, MeasurementSeries, SeriesFilter};
use crate::validate;

/// Durable, append-only, ordered measurement history.
///
/// Single writer. Every successful `append` is visible to later `load` calls;
/// a failed `append` leaves the history unchanged.
pub trait MeasurementStore {
  /// Validate and persist one record at the end of the log.
  fn append(&mut self, record: MeasurementRecord) -> Result<(), SpcError>;

  /// Records matching `filter`, in insertion order. Empty when nothing matches.
  fn load(&self, filter: &SeriesFilter) -> Result<MeasurementSeries, SpcError>;

  fn load_all(&self) -> Result<MeasurementSeries, SpcError> {
    self.load(&SeriesFilter::all())
  }
}

// ---------------------------------------------------------------------------
// CSV file backend
// ---------------------------------------------------------------------------

/// Measurement log kept in a single CSV file.
///
/// Appends rewrite the file through a synced temporary sibling that is then
/// renamed over the original, so readers see either the old or the new file.
#[derive(Debug, Clone)]
pub struct CsvFileStore {
  path: PathBuf,
}

impl CsvFileStore {
  /// Open the log at `path`, creating it with the full header if missing.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, SpcError> {
    let store = Self { path: path.into() };
    if !store.path.exists() {
      let header = format!("{}\n", codec::encode_header(Layout::Full));
      write_atomic_file(&store.path, header.as_bytes())?;
      info!(path = %store.path.display(), "initialised measurement log");
    }
    Ok(store)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Read the whole log. A missing or empty file is an empty full-layout log.
  fn read_log(&self) -> Result<(Layout, MeasurementSeries), SpcError> {
    if !self.path.exists() {
      return Ok((Layout::Full, MeasurementSeries::default()));
    }
    let contents = std::fs::read_to_string(&self.path)
      .map_err(|e| SpcError::storage(format!("read {}: {}", self.path.display(), e)))?;

    let mut lines = contents.lines().enumerate();
    let layout = match lines.next() {
      Some((_, header)) if !header.trim().is_empty() => Layout::detect(header)?,
      _ => return Ok((Layout::Full, MeasurementSeries::default())),
    };

    let mut series = MeasurementSeries::default();
    for (i, line) in lines {
      if line.trim().is_empty() {
        continue;
      }
      series.push(codec::decode_record(layout, line, i + 1)?);
    }
    Ok((layout, series))
  }
}

impl MeasurementStore for CsvFileStore {
  fn append(&mut self, record: MeasurementRecord) -> Result<(), SpcError> {
    validate::validate_record(&record)?;
    let (mut layout, series) = self.read_log()?;
    if !layout.can_hold(&record) {
      debug!(path = %self.path.display(), "upgrading simplified log to full layout");
      layout = Layout::Full;
    }

    let mut out = codec::encode_header(layout);
    out.push('\n');
    for existing in series.iter().chain(std::iter::once(&record)) {
      out.push_str(&codec::encode_record(layout, existing));
      out.push('\n');
    }
    write_atomic_file(&self.path, out.as_bytes())?;

    debug!(
      path = %self.path.display(),
      machine = record.machine.as_deref().unwrap_or(""),
      part = record.part.as_deref().unwrap_or(""),
      rows = series.len() + 1,
      "appended measurement"
    );
    Ok(())
  }

  fn load(&self, filter: &SeriesFilter) -> Result<MeasurementSeries, SpcError> {
    let (_, series) = self.read_log()?;
    let matched = series.filtered(filter);
    debug!(total = series.len(), matched = matched.len(), "loaded measurements");
    Ok(matched)
  }
}

/// Write `bytes` to `path` via a synced temporary file and a rename.
fn write_atomic_file(path: &Path, bytes: &[u8]) -> Result<(), SpcError> {
  let parent = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
    _ => PathBuf::from("."),
  };
  std::fs::create_dir_all(&parent)
    .map_err(|e| SpcError::storage(format!("create {}: {}", parent.display(), e)))?;
  let tmp = parent.join(format!(
    ".{}.tmp.{}",
    path.file_name().and_then(|s| s.to_str()).unwrap_or("spc"),
    std::process::id()
  ));

  if let Err(e) = write_and_sync(&tmp, bytes).and_then(|_| std::fs::rename(&tmp, path)) {
    let _ = std::fs::remove_file(&tmp);
    return Err(SpcError::storage(format!("write {}: {}", path.display(), e)));
  }

  if let Ok(dir) = std::fs::File::open(&parent) {
    let _ = dir.sync_all();
  }
  Ok(())
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
  let mut f = std::fs::File::create(path)?;
  f.write_all(bytes)?;
  f.sync_all()
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Non-durable store with the same validation contract.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  series: MeasurementSeries,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl MeasurementStore for MemoryStore {
  fn append(&mut self, record: MeasurementRecord) -> Result<(), SpcError> {
    validate::validate_record(&record)?;
    self.series.push(record);
    Ok(())
  }

  fn load(&self, filter: &SeriesFilter) -> Result<MeasurementSeries, SpcError> {
    Ok(self.series.filtered(filter))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};

  fn record(min: u32, machine: &str, measured: f64) -> MeasurementRecord {
    MeasurementRecord {
      timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 10, min, 0).unwrap(),
      machine: Some(machine.to_string()),
      part: Some("P-100".to_string()),
      nominal: 25.0,
      measured,
    }
  }

  #[test]
  fn open_creates_file_with_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spc_data.csv");
    CsvFileStore::open(&path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "Timestamp,Machine,Part,Nominal,Measured\n");
  }

  #[test]
  fn open_keeps_existing_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spc_data.csv");
    let mut store = CsvFileStore::open(&path).unwrap();
    store.append(record(0, "Machine 1", 25.01)).unwrap();

    let reopened = CsvFileStore::open(&path).unwrap();
    assert_eq!(reopened.load_all().unwrap().len(), 1);
  }

  #[test]
  fn append_then_load_returns_record_last() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CsvFileStore::open(dir.path().join("log.csv")).unwrap();
    store.append(record(0, "Machine 1", 25.01)).unwrap();
    let r = record(1, "Machine 2", 24.987);
    store.append(r.clone()).unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.last(), Some(&r));
  }

  #[test]
  fn load_filters_in_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CsvFileStore::open(dir.path().join("log.csv")).unwrap();
    store.append(record(0, "Machine 1", 25.1)).unwrap();
    store.append(record(1, "Machine 2", 25.2)).unwrap();
    store.append(record(2, "Machine 1", 25.3)).unwrap();

    let m1 = store.load(&SeriesFilter::machine("Machine 1")).unwrap();
    let measured: Vec<f64> = m1.iter().map(|r| r.measured).collect();
    assert_eq!(measured, vec![25.1, 25.3]);
    assert!(store.load(&SeriesFilter::machine("Machine 9")).unwrap().is_empty());
  }

  #[test]
  fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFileStore {
      path: dir.path().join("never-written.csv"),
    };
    assert!(store.load_all().unwrap().is_empty());
  }

  #[test]
  fn rejected_append_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.csv");
    let mut store = CsvFileStore::open(&path).unwrap();
    store.append(record(0, "Machine 1", 25.0)).unwrap();
    let before = std::fs::read(&path).unwrap();

    let err = store.append(record(1, "Machine 1", f64::NAN)).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(store.load_all().unwrap().len(), 1);
  }

  #[test]
  fn unwritable_location_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();
    let err = CsvFileStore::open(blocker.join("log.csv")).unwrap_err();
    assert!(err.is_storage());
  }

  #[test]
  fn corrupt_row_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.csv");
    std::fs::write(
      &path,
      "Timestamp,Machine,Part,Nominal,Measured\n2025-01-15T10:00:00Z,M1,P1,25,oops\n",
    )
    .unwrap();
    let store = CsvFileStore::open(&path).unwrap();
    let err = store.load_all().unwrap_err();
    assert!(err.is_storage());
    assert!(err.to_string().contains("line 2"));
  }

  #[test]
  fn simplified_log_is_read_and_upgraded_on_identified_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.csv");
    std::fs::write(
      &path,
      "Timestamp,Nominal,Recorded\n2025-01-15 09:00:00,25,25.02\n\n2025-01-15 09:05:00,25,24.99\n",
    )
    .unwrap();
    let mut store = CsvFileStore::open(&path).unwrap();
    assert_eq!(store.load_all().unwrap().len(), 2);

    store.append(record(0, "Machine 1", 25.0)).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("Timestamp,Machine,Part,Nominal,Measured\n"));
    let all = store.load_all().unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.records()[0].machine.is_none());
    assert_eq!(all.records()[2].machine.as_deref(), Some("Machine 1"));
  }

  #[test]
  fn failed_write_keeps_previous_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.csv");
    let mut store = CsvFileStore::open(&path).unwrap();
    let first = record(0, "Machine 1", 25.0);
    store.append(first.clone()).unwrap();
    let before = std::fs::read(&path).unwrap();

    // A directory squatting on the temporary file name makes the write fail.
    let tmp = dir.path().join(format!(".log.csv.tmp.{}", std::process::id()));
    std::fs::create_dir(&tmp).unwrap();

    let err = store.append(record(1, "Machine 1", 25.1)).unwrap_err();
    assert!(err.is_storage());
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(store.load_all().unwrap().records(), &[first.clone()]);

    std::fs::remove_dir(&tmp).unwrap();
    store.append(record(2, "Machine 1", 25.2)).unwrap();
    assert_eq!(store.load_all().unwrap().len(), 2);
  }

  #[test]
  fn far_future_timestamp_is_rejected_and_log_stays_readable() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CsvFileStore::open(dir.path().join("log.csv")).unwrap();
    let mut r = record(0, "Machine 1", 25.0);
    r.timestamp = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

    let err = store.append(r).unwrap_err();
    assert!(matches!(err, SpcError::Validation { ref field, .. } if field == "timestamp"));
    assert!(store.load_all().unwrap().is_empty());

    let ok = record(1, "Machine 1", 25.0);
    store.append(ok.clone()).unwrap();
    assert_eq!(store.load_all().unwrap().last(), Some(&ok));
  }

  #[test]
  fn memory_store_validates_like_file_store() {
    let mut store = MemoryStore::new();
    store.append(record(0, "Machine 1", 25.0)).unwrap();
    assert!(store.append(record(1, "Machine 1", f64::INFINITY)).unwrap_err().is_validation());
    assert_eq!(store.load_all().unwrap().len(), 1);
  }
}

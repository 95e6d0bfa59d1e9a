//! Renderable I-chart description: plotted points, center line and control limits.

use chrono::SecondsFormat;
use serde::Serialize;

use crate::analyzer::CONTROL_SIGMAS;
use crate::types::{MeasurementSeries, Signal, SpcResult};

pub const TITLE: &str = "SPC Chart";
pub const X_LABEL: &str = "Timestamp";
pub const Y_LABEL: &str = "Dimension (mm)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineColor {
  Green,
  Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
  Solid,
  Dashed,
}

/// A horizontal line across the whole chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
  pub label: String,
  pub value: f64,
  pub color: LineColor,
  pub style: LineStyle,
}

/// One plotted marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPoint {
  pub x: String,
  pub y: f64,
  pub is_violation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
  pub label: String,
  pub marker: String,
  pub style: LineStyle,
  pub points: Vec<PlotPoint>,
}

/// Everything the rendering layer needs to draw the chart and its stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
  pub title: String,
  pub x_label: String,
  pub y_label: String,
  pub signal: Signal,
  pub series: PlotSeries,
  pub reference_lines: Vec<ReferenceLine>,
  /// Formatted "Mean / Standard Deviation / UCL / LCL" lines.
  pub summary: Vec<String>,
  pub stats: SpcResult,
}

impl ChartSpec {
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}

/// Build the chart for `series` analyzed as `result`.
///
/// Points are labelled with their record's timestamp; `result` must come from
/// the same series, so both have one entry per record.
pub fn build(series: &MeasurementSeries, result: &SpcResult, signal: Signal, precision: usize) -> ChartSpec {
  let points = series
    .iter()
    .zip(&result.points)
    .map(|(record, point)| PlotPoint {
      x: record.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
      y: point.value,
      is_violation: point.is_violation,
    })
    .collect();

  let reference_lines = vec![
    ReferenceLine {
      label: "Mean".into(),
      value: result.center,
      color: LineColor::Green,
      style: LineStyle::Dashed,
    },
    ReferenceLine {
      label: format!("UCL (+{}σ)", CONTROL_SIGMAS),
      value: result.ucl,
      color: LineColor::Red,
      style: LineStyle::Dashed,
    },
    ReferenceLine {
      label: format!("LCL (-{}σ)", CONTROL_SIGMAS),
      value: result.lcl,
      color: LineColor::Red,
      style: LineStyle::Dashed,
    },
  ];

  ChartSpec {
    title: TITLE.into(),
    x_label: X_LABEL.into(),
    y_label: Y_LABEL.into(),
    signal,
    series: PlotSeries {
      label: signal.label().into(),
      marker: "o".into(),
      style: LineStyle::Solid,
      points,
    },
    reference_lines,
    summary: summary_lines(result, precision),
    stats: result.clone(),
  }
}

/// The statistics block shown under the chart.
pub fn summary_lines(result: &SpcResult, precision: usize) -> Vec<String> {
  vec![
    format!("Mean: {:.*}", precision, result.center),
    format!("Standard Deviation: {:.*}", precision, result.sigma),
    format!("UCL: {:.*}", precision, result.ucl),
    format!("LCL: {:.*}", precision, result.lcl),
  ]
}

//! Individuals (I) chart analysis: center line, ±3σ limits, out-of-control points.
//!
//! Analysis is a pure function of the input slice. The same values always
//! produce the same [`SpcResult`].

use tracing::debug;

use crate::error::SpcError;
use crate::stats;
use crate::types::{SigmaEstimator, SpcPoint, SpcResult};

/// Width of the control band in sigmas on each side of the center line.
pub const CONTROL_SIGMAS: f64 = 3.0;

/// Smallest series for which sigma is defined.
pub const MIN_VALUES: usize = 2;

/// Stateless control chart calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Analyzer {
  estimator: SigmaEstimator,
}

impl Analyzer {
  pub fn new(estimator: SigmaEstimator) -> Self {
    Self { estimator }
  }

  pub fn estimator(&self) -> SigmaEstimator {
    self.estimator
  }

  /// Compute center, sigma and control limits, then flag every point outside
  /// [lcl, ucl]. Points exactly on a limit are in control.
  pub fn analyze(&self, values: &[f64]) -> Result<SpcResult, SpcError> {
    if values.len() < MIN_VALUES {
      return Err(SpcError::InsufficientData {
        required: MIN_VALUES,
        actual: values.len(),
      });
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
      return Err(SpcError::validation(
        &format!("values[{}]", i),
        "must be a finite number",
      ));
    }

    let insufficient = || SpcError::InsufficientData {
      required: MIN_VALUES,
      actual: values.len(),
    };
    let center = stats::mean(values).ok_or_else(insufficient)?;
    let sigma = match self.estimator {
      SigmaEstimator::SampleStdDev => stats::sample_std_dev(values),
      SigmaEstimator::MovingRange => stats::moving_range_sigma(values),
    }
    .ok_or_else(insufficient)?;

    let ucl = center + CONTROL_SIGMAS * sigma;
    let lcl = center - CONTROL_SIGMAS * sigma;
    if ![center, sigma, ucl, lcl].iter().all(|v| v.is_finite()) {
      return Err(SpcError::validation(
        "values",
        "control limits exceed the representable range",
      ));
    }

    let points: Vec<SpcPoint> = values
      .iter()
      .enumerate()
      .map(|(index, &value)| SpcPoint {
        index,
        value,
        is_violation: value > ucl || value < lcl,
      })
      .collect();

    let result = SpcResult {
      estimator: self.estimator,
      center,
      sigma,
      ucl,
      lcl,
      points,
    };
    debug!(
      n = values.len(),
      center,
      sigma,
      violations = result.violations().len(),
      "analyzed series"
    );
    Ok(result)
  }
}

/// Analyze with the default sample standard deviation estimator.
pub fn analyze(values: &[f64]) -> Result<SpcResult, SpcError> {
  Analyzer::default().analyze(values)
}

//! Descriptive statistics used by the control chart: mean and sigma estimates.

/// Bias-correction constant d2 for moving ranges of span 2.
pub const D2_SPAN_2: f64 = 1.128;

/// Arithmetic mean, or `None` for an empty slice.
///
/// Running update `m += x/k - m/k` so values near `f64::MAX` do not overflow
/// an intermediate sum.
pub fn mean(values: &[f64]) -> Option<f64> {
  let (first, rest) = values.split_first()?;
  let mut m = *first;
  for (i, x) in rest.iter().enumerate() {
    let k = (i + 2) as f64;
    m += x / k - m / k;
  }
  Some(m)
}

/// Sample standard deviation with the n - 1 divisor.
///
/// Two-pass: deviations are taken from the mean, so a constant series gives
/// exactly zero. Deviations are divided by the largest magnitude before
/// squaring. `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
  if values.len() < 2 {
    return None;
  }
  let m = mean(values)?;
  let scale = values.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
  if scale == 0.0 {
    return Some(0.0);
  }
  let sum_sq: f64 = values
    .iter()
    .map(|x| {
      let d = x / scale - m / scale;
      d * d
    })
    .sum();
  Some(scale * (sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Absolute differences between consecutive values.
pub fn moving_ranges(values: &[f64]) -> Vec<f64> {
  values.windows(2).map(|w| (w[1] - w[0]).abs()).collect()
}

/// Sigma estimated from the average moving range (MR-bar / d2).
///
/// `None` below two values.
pub fn moving_range_sigma(values: &[f64]) -> Option<f64> {
  let mr_bar = mean(&moving_ranges(values))?;
  Some(mr_bar / D2_SPAN_2)
}

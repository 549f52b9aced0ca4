//! Small helpers shared across modules.

/// Round to one decimal place. Every user-facing rate goes through this.
pub fn round1(v: f64) -> f64 {
  (v * 10.0).round() / 10.0
}

/// Percentage of `part` within `total`, one decimal.
/// Defined as 0.0 for an empty total.
pub fn percentage(part: u64, total: u64) -> f64 {
  if total == 0 {
    0.0
  } else {
    round1(part as f64 / total as f64 * 100.0)
  }
}

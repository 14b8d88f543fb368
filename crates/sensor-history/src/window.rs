//! Trailing Window Selection

use crate::SensorReading;

/// Named lookback windows (minutes) used by feature extraction
pub const WINDOWS_MINUTES: [u32; 6] = [5, 10, 30, 60, 120, 180];

/// Select readings with `timestamp >= reference - minutes * 60`.
///
/// `series` must be sorted ascending by timestamp. The lower bound is
/// inclusive and there is no upper bound; the returned slice keeps the
/// original order and may be empty.
pub fn select_window(series: &[SensorReading], reference: i64, minutes: u32) -> &[SensorReading] {
    let cutoff = reference.saturating_sub(i64::from(minutes) * 60);
    let start = series.partition_point(|r| r.timestamp < cutoff);
    &series[start..]
}

//! Temporal operator library
//!
//! Pure functions over a time-ordered series of [`DataPoint`]s. Every windowed
//! operator first restricts the series to the closed interval
//! `[reference_time - window, reference_time]` and then computes its
//! statistic. A `None` result means "no value" and is never conflated with
//! `0.0`.
//!
//! Inputs must be sorted ascending by timestamp; the operators do not sort.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Denominators below this are treated as a zero time spread
const SLOPE_EPSILON: f64 = 1e-10;

/// A single observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl DataPoint {
    pub const fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Start of the window ending at `reference_time`, or `None` if it underflows
pub fn window_start(window_seconds: i64, reference_time: DateTime<Utc>) -> Option<DateTime<Utc>> {
    TimeDelta::try_seconds(window_seconds).and_then(|w| reference_time.checked_sub_signed(w))
}

/// Keep the points with `reference_time - window_seconds <= timestamp <= reference_time`
///
/// Both ends are inclusive and input order is preserved.
pub fn filter_by_window(
    points: &[DataPoint],
    window_seconds: i64,
    reference_time: DateTime<Utc>,
) -> Vec<DataPoint> {
    let start = window_start(window_seconds, reference_time);
    points
        .iter()
        .filter(|p| p.timestamp <= reference_time && start.is_none_or(|s| p.timestamp >= s))
        .copied()
        .collect()
}

/// Value of the chronologically last point of the whole series
pub fn last(points: &[DataPoint]) -> Option<f64> {
    points.last().map(|p| p.value)
}

/// First in-window value
pub fn first(points: &[DataPoint], window_seconds: i64, reference_time: DateTime<Utc>) -> Option<f64> {
    filter_by_window(points, window_seconds, reference_time)
        .first()
        .map(|p| p.value)
}

/// Last in-window value minus first in-window value; needs two points
pub fn delta(points: &[DataPoint], window_seconds: i64, reference_time: DateTime<Utc>) -> Option<f64> {
    let window = filter_by_window(points, window_seconds, reference_time);
    match window.as_slice() {
        [first, .., last] => Some(last.value - first.value),
        _ => None,
    }
}

fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let span = to - from;
    span.num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| span.num_milliseconds() as f64 / 1_000.0)
}

/// Ordinary least-squares slope of value against seconds since the first in-window point
///
/// Needs two points. A zero time spread yields `0.0`.
pub fn slope(points: &[DataPoint], window_seconds: i64, reference_time: DateTime<Utc>) -> Option<f64> {
    let window = filter_by_window(points, window_seconds, reference_time);
    if window.len() < 2 {
        return None;
    }

    let t0 = window[0].timestamp;
    let n = window.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for p in &window {
        let x = elapsed_seconds(t0, p.timestamp);
        sum_x += x;
        sum_y += p.value;
        sum_xy += x * p.value;
        sum_x2 += x * x;
    }

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < SLOPE_EPSILON {
        return Some(0.0);
    }
    Some((n * sum_xy - sum_x * sum_y) / denominator)
}

/// Arithmetic mean of in-window values
pub fn sma(points: &[DataPoint], window_seconds: i64, reference_time: DateTime<Utc>) -> Option<f64> {
    let window = filter_by_window(points, window_seconds, reference_time);
    if window.is_empty() {
        return None;
    }
    Some(window.iter().map(|p| p.value).sum::<f64>() / window.len() as f64)
}

/// Exponential moving average with `alpha = 2 / (N + 1)`, seeded with the first in-window value
pub fn ema(points: &[DataPoint], window_seconds: i64, reference_time: DateTime<Utc>) -> Option<f64> {
    let window = filter_by_window(points, window_seconds, reference_time);
    let (seed, rest) = window.split_first()?;
    if rest.is_empty() {
        return Some(seed.value);
    }

    let alpha = 2.0 / (window.len() as f64 + 1.0);
    Some(
        rest.iter()
            .fold(seed.value, |acc, p| alpha * p.value + (1.0 - alpha) * acc),
    )
}

pub fn min(points: &[DataPoint], window_seconds: i64, reference_time: DateTime<Utc>) -> Option<f64> {
    filter_by_window(points, window_seconds, reference_time)
        .iter()
        .map(|p| p.value)
        .reduce(f64::min)
}

pub fn max(points: &[DataPoint], window_seconds: i64, reference_time: DateTime<Utc>) -> Option<f64> {
    filter_by_window(points, window_seconds, reference_time)
        .iter()
        .map(|p| p.value)
        .reduce(f64::max)
}

/// Number of in-window points; never fails
pub fn count(points: &[DataPoint], window_seconds: i64, reference_time: DateTime<Utc>) -> f64 {
    filter_by_window(points, window_seconds, reference_time).len() as f64
}

/// Sample standard deviation (divisor `N - 1`); needs two points
pub fn std(points: &[DataPoint], window_seconds: i64, reference_time: DateTime<Utc>) -> Option<f64> {
    let window = filter_by_window(points, window_seconds, reference_time);
    if window.len() < 2 {
        return None;
    }
    let n = window.len() as f64;
    let mean = window.iter().map(|p| p.value).sum::<f64>() / n;
    let variance = window.iter().map(|p| (p.value - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Linear-interpolated percentile `p` (0-100) of the in-window values
pub fn percentile(
    points: &[DataPoint],
    window_seconds: i64,
    reference_time: DateTime<Utc>,
    p: f64,
) -> Option<f64> {
    let mut values: Vec<f64> = filter_by_window(points, window_seconds, reference_time)
        .iter()
        .map(|p| p.value)
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let rank = (p / 100.0) * (values.len() - 1) as f64;
    let (lo, hi) = (rank.floor(), rank.ceil());
    // rank is within [0, len - 1] for p in [0, 100]
    let lo_idx = (lo as usize).min(values.len() - 1);
    let hi_idx = (hi as usize).min(values.len() - 1);
    if lo_idx == hi_idx {
        return Some(values[lo_idx]);
    }
    Some(values[lo_idx] * (hi - rank) + values[hi_idx] * (rank - lo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + TimeDelta::seconds(seconds)
    }

    fn series(points: &[(i64, f64)]) -> Vec<DataPoint> {
        points.iter().map(|&(s, v)| DataPoint::new(at(s), v)).collect()
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let data = series(&[(-3601, 0.0), (-3600, 1.0), (-10, 2.0), (0, 3.0), (1, 4.0)]);
        let kept: Vec<_> = filter_by_window(&data, 3600, at(0)).iter().map(|p| p.value).collect();
        assert_eq!(kept, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_window_is_no_value() {
        let data = series(&[(-7200, 5.0)]);
        let t = at(0);
        assert_eq!(first(&data, 3600, t), None);
        assert_eq!(sma(&data, 3600, t), None);
        assert_eq!(ema(&data, 3600, t), None);
        assert_eq!(min(&data, 3600, t), None);
        assert_eq!(max(&data, 3600, t), None);
        assert_eq!(percentile(&data, 3600, t, 50.0), None);
        assert_eq!(count(&data, 3600, t), 0.0);
        assert_eq!(last(&[]), None);
    }

    #[test]
    fn test_two_point_operators_need_two_points() {
        let data = series(&[(0, 5.0)]);
        assert_eq!(delta(&data, 3600, at(0)), None);
        assert_eq!(slope(&data, 3600, at(0)), None);
        assert_eq!(std(&data, 3600, at(0)), None);
    }

    #[test]
    fn test_slope_with_zero_time_spread_is_zero() {
        let data = series(&[(0, 1.0), (0, 3.0)]);
        assert_eq!(slope(&data, 60, at(0)), Some(0.0));
    }

    #[test]
    fn test_ema_folds_left_to_right() {
        // alpha = 2 / 4 = 0.5: seed 1, then 0.5*2 + 0.5*1 = 1.5, then 0.5*4 + 0.5*1.5 = 2.75
        let data = series(&[(-20, 1.0), (-10, 2.0), (0, 4.0)]);
        assert_eq!(ema(&data, 60, at(0)), Some(2.75));
    }

    #[test]
    fn test_std_is_sample_deviation() {
        let data = series(&[(-30, 2.0), (-20, 4.0), (-10, 4.0), (0, 6.0)]);
        // mean 4, squared deviations 4+0+0+4 = 8, / 3
        let expected = (8.0f64 / 3.0).sqrt();
        assert!((std(&data, 60, at(0)).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_extremes() {
        let data = series(&[(-3, 7.0), (-2, 1.0), (-1, 4.0)]);
        assert_eq!(percentile(&data, 60, at(0), 0.0), Some(1.0));
        assert_eq!(percentile(&data, 60, at(0), 100.0), Some(7.0));
        assert_eq!(percentile(&data, 60, at(0), 75.0), Some(5.5));
    }
}

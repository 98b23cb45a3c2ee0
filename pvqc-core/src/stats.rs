//! Leaf numeric utilities shared by the classifiers and shift detectors
//!
//! Everything here is a pure transform over slices or series. NaN is the
//! missing-value sentinel throughout: statistics skip NaN, and a window
//! with no finite observation yields NaN rather than an error.

use chrono::Timelike;
use std::collections::HashMap;

use crate::errors::{QcError, QcResult};
use crate::series::{BooleanMask, TimeSeries};

/// Statistic computed by [`rolling_by_minute`] and [`rolling_median`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollingStat {
    /// NaN-skipping median.
    Median,
    /// NaN-skipping mean.
    Mean,
    /// Number of finite observations.
    Count,
}

/// Min-max normalize a signal for classification.
///
/// Supplied outlier positions are first blanked to NaN, negative readings
/// are clamped to zero, and the result is scaled by the finite minimum and
/// maximum. A constant (or entirely missing) signal normalizes to all-NaN.
pub fn normalize_min_max(
    series: &TimeSeries<f64>,
    outliers: Option<&BooleanMask>,
) -> QcResult<TimeSeries<f64>> {
    if let Some(mask) = outliers {
        if mask.len() != series.len() {
            return Err(QcError::LengthMismatch {
                expected: series.len(),
                got: mask.len(),
            });
        }
    }
    let mut values: Vec<f64> = series.values().to_vec();
    if let Some(mask) = outliers {
        for (value, &is_outlier) in values.iter_mut().zip(mask.values()) {
            if is_outlier {
                *value = f64::NAN;
            }
        }
    }
    for value in values.iter_mut() {
        if *value < 0.0 {
            *value = 0.0;
        }
    }
    scale_unit_interval(&mut values);
    series.with_values(values)
}

/// Scale values in place onto `[0, 1]` by the finite minimum and maximum.
///
/// A zero range maps every value to NaN.
pub fn scale_unit_interval(values: &mut [f64]) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &value in values.iter() {
        if value.is_finite() {
            min = min.min(value);
            max = max.max(value);
        }
    }
    let range = max - min;
    for value in values.iter_mut() {
        *value = if range > 0.0 && range.is_finite() {
            (*value - min) / range
        } else {
            f64::NAN
        };
    }
}

/// Length of the run of consecutive equal values each sample belongs to.
pub fn run_lengths(mask: &BooleanMask) -> TimeSeries<usize> {
    let values = mask.values();
    let mut lengths = vec![0usize; values.len()];
    let mut start = 0;
    for i in 0..=values.len() {
        if i == values.len() || (i > 0 && values[i] != values[i - 1]) {
            for length in lengths.iter_mut().take(i).skip(start) {
                *length = i - start;
            }
            start = i;
        }
    }
    mask.with_values(lengths).expect("same length by construction")
}

/// Rolling statistic grouped by minute of day.
///
/// Samples are bucketed by their local minute of day, and within each
/// bucket a centered window of `days` entries is reduced with `stat`. One
/// entry per bucket per calendar day makes the window span `days`
/// surrounding days. Windows shrink at the series edges, down to a single
/// observation.
pub fn rolling_by_minute(
    series: &TimeSeries<f64>,
    days: usize,
    stat: RollingStat,
) -> TimeSeries<f64> {
    let days = days.max(1);
    let mut buckets: HashMap<u32, Vec<usize>> = HashMap::new();
    for (i, ts) in series.timestamps().iter().enumerate() {
        let minute = ts.hour() * 60 + ts.minute();
        buckets.entry(minute).or_default().push(i);
    }

    let before = (days - 1) / 2;
    let after = days / 2;
    let values = series.values();
    let mut out = vec![f64::NAN; series.len()];
    for indices in buckets.values() {
        for (pos, &i) in indices.iter().enumerate() {
            let lo = pos.saturating_sub(before);
            let hi = (pos + after).min(indices.len() - 1);
            let window: Vec<f64> = indices[lo..=hi].iter().map(|&j| values[j]).collect();
            out[i] = reduce(&window, stat);
        }
    }
    series.with_values(out).expect("same length by construction")
}

/// Centered rolling statistic over a plain slice, NaN-skipping,
/// shrinking at the edges.
pub fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let before = (window - 1) / 2;
    let after = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(values.len() - 1);
            reduce(&values[lo..=hi], RollingStat::Median)
        })
        .collect()
}

fn reduce(window: &[f64], stat: RollingStat) -> f64 {
    match stat {
        RollingStat::Median => nan_median(window),
        RollingStat::Mean => nan_mean(window),
        RollingStat::Count => window.iter().filter(|v| v.is_finite()).count() as f64,
    }
}

/// NaN-skipping median; NaN when no finite value exists.
pub fn nan_median(values: &[f64]) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(|a, b| a.total_cmp(b));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 1 {
        finite[mid]
    } else {
        (finite[mid - 1] + finite[mid]) / 2.0
    }
}

/// NaN-skipping mean; NaN when no finite value exists.
pub fn nan_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &value in values {
        if value.is_finite() {
            sum += value;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// NaN-skipping linear-interpolation quantile; NaN when no finite value
/// exists. `q` is clamped to `[0, 1]`.
pub fn nan_quantile(values: &[f64], q: f64) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(|a, b| a.total_cmp(b));
    let q = q.clamp(0.0, 1.0);
    let position = q * (finite.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        finite[lower]
    } else {
        let weight = position - lower as f64;
        finite[lower] * (1.0 - weight) + finite[upper] * weight
    }
}

/// Most frequent value; ties go to the value seen first.
pub fn mode_first(values: &[i64]) -> Option<i64> {
    let mut counts: HashMap<i64, (usize, usize)> = HashMap::new();
    for (i, &value) in values.iter().enumerate() {
        let entry = counts.entry(value).or_insert((0, i));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .min_by(|a, b| (b.1 .0).cmp(&a.1 .0).then((a.1 .1).cmp(&b.1 .1)))
        .map(|(value, _)| value)
}

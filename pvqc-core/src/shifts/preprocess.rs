//! Daily-series cleanup ahead of changepoint search
//!
//! Changepoint search is sensitive to exactly the artifacts field data is
//! full of: stuck sensors, zero readings from outages, and extreme
//! outliers all register as level changes. [`preprocess`] strips those
//! out, normalizes what remains, and optionally removes the annual
//! seasonal cycle so that only genuine level shifts survive into the
//! search.

use chrono::Datelike;
use std::collections::HashMap;

use crate::errors::{QcError, QcResult};
use crate::series::TimeSeries;
use crate::stats;
use crate::time::Frequency;

/// Runs of at least this many near-identical values are a stuck sensor.
const STALE_RUN_MIN: usize = 6;
/// Values equal after rounding to this many decimals count as identical.
const STALE_DECIMALS: u32 = 3;
/// Fraction trimmed from each end of the value distribution.
const QUANTILE_CUT: f64 = 0.01;

/// Reject anything that is not a chronological, daily-sampled series.
pub(crate) fn validate_daily(series: &TimeSeries<f64>) -> QcResult<()> {
    if !series.is_chronological() {
        return Err(QcError::NotChronological);
    }
    let freq = Frequency::infer(series)?;
    if !freq.is_daily() {
        return Err(QcError::NotDailySampled {
            got_minutes: freq.as_duration().num_minutes(),
        });
    }
    Ok(())
}

/// Clean a daily series for changepoint search.
///
/// With `filtering`, drops missing values, members of stale runs, values
/// at or below zero, and values in the bottom or top 1% of the
/// distribution. Duplicate timestamps are always dropped (first
/// occurrence wins). The survivors are min-max normalized to `[0, 1]`;
/// with `remove_seasonality`, the median normalized value for each
/// (month, day-of-month) across all years is subtracted, leaving the
/// non-seasonal residual.
///
/// Callers should only request seasonality removal on series spanning
/// more than two years; with fewer years per calendar day the "seasonal
/// median" is mostly the signal itself.
///
/// The input must be chronological and daily-sampled; anything else is a
/// hard error for the caller to resample first.
pub fn preprocess(
    series: &TimeSeries<f64>,
    filtering: bool,
    remove_seasonality: bool,
) -> QcResult<TimeSeries<f64>> {
    validate_daily(series)?;
    let filtered = if filtering {
        erroneous_filter(series)
    } else {
        series.clone()
    };
    let deduplicated = drop_duplicate_timestamps(&filtered);

    let (timestamps, mut values) = deduplicated.into_parts();
    stats::scale_unit_interval(&mut values);
    let normalized = TimeSeries::new(timestamps, values)?;

    if remove_seasonality {
        Ok(subtract_seasonal_median(&normalized))
    } else {
        Ok(normalized)
    }
}

/// Drop missing, stale, non-positive, and extreme-quantile values.
fn erroneous_filter(series: &TimeSeries<f64>) -> TimeSeries<f64> {
    let values = series.values();
    let stale = stale_run_members(values);
    let low = stats::nan_quantile(values, QUANTILE_CUT);
    let high = stats::nan_quantile(values, 1.0 - QUANTILE_CUT);

    let mut timestamps = Vec::new();
    let mut kept = Vec::new();
    for (i, (ts, &value)) in series.iter().enumerate() {
        if value.is_finite() && !stale[i] && value > 0.0 && value > low && value < high {
            timestamps.push(*ts);
            kept.push(value);
        }
    }
    TimeSeries::new(timestamps, kept).expect("same length by construction")
}

/// Flag every member of a run of `STALE_RUN_MIN`-plus values that are
/// identical to `STALE_DECIMALS` decimal places.
fn stale_run_members(values: &[f64]) -> Vec<bool> {
    let scale = 10f64.powi(STALE_DECIMALS as i32);
    let rounded: Vec<Option<i64>> = values
        .iter()
        .map(|&v| v.is_finite().then(|| (v * scale).round() as i64))
        .collect();

    let mut stale = vec![false; values.len()];
    let mut start = 0;
    for i in 0..=rounded.len() {
        let run_broke = i == rounded.len()
            || (i > 0 && (rounded[i] != rounded[i - 1] || rounded[i].is_none()));
        if run_broke {
            if i - start >= STALE_RUN_MIN && rounded[start].is_some() {
                stale[start..i].fill(true);
            }
            start = i;
        }
    }
    stale
}

/// Keep the first sample at each timestamp; assumes chronological input.
fn drop_duplicate_timestamps(series: &TimeSeries<f64>) -> TimeSeries<f64> {
    let mut timestamps = Vec::with_capacity(series.len());
    let mut values = Vec::with_capacity(series.len());
    for (ts, &value) in series.iter() {
        if timestamps.last() != Some(ts) {
            timestamps.push(*ts);
            values.push(value);
        }
    }
    TimeSeries::new(timestamps, values).expect("same length by construction")
}

/// Subtract the per-(month, day-of-month) median across years.
fn subtract_seasonal_median(series: &TimeSeries<f64>) -> TimeSeries<f64> {
    let mut groups: HashMap<(u32, u32), Vec<f64>> = HashMap::new();
    for (ts, &value) in series.iter() {
        groups.entry((ts.month(), ts.day())).or_default().push(value);
    }
    let medians: HashMap<(u32, u32), f64> = groups
        .into_iter()
        .map(|(day, members)| (day, stats::nan_median(&members)))
        .collect();

    let residual: Vec<f64> = series
        .iter()
        .map(|(ts, &value)| {
            value
                - medians
                    .get(&(ts.month(), ts.day()))
                    .copied()
                    .unwrap_or(f64::NAN)
        })
        .collect();
    series
        .with_values(residual)
        .expect("same length by construction")
}

//! Clock-shift detection from daily event times
//!
//! A logger whose clock drifts, loses its timezone, or mishandles DST
//! stamps every sample a fixed number of minutes off. Comparing the
//! measured clock time of a repeating daily event (solar noon, the
//! midpoint of the daylight period) against a modeled reference turns
//! that into a step signal: zero while the clock is right, a constant
//! offset while it is wrong. [`shifts_ruptures`] segments that difference
//! with an exact changepoint search and quantizes each segment to the
//! granularity clock errors actually come in.

use log::debug;

use pvqc_changepoint::{ChangepointSearch, CostFunction, SearchStrategy};

use crate::errors::{QcError, QcResult};
use crate::series::{BooleanMask, TimeSeries, Timestamp};
use crate::stats;

/// Tuning for [`shifts_ruptures`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ClockShiftConfig {
    /// Minimum shift duration, in days; shorter segments are not
    /// searched for.
    pub period_min: usize,
    /// Shift granularity in minutes; every reported shift is a multiple
    /// of this.
    pub shift_min: f64,
    /// Remainder above which magnitudes round up to the next multiple of
    /// `shift_min`; half of `shift_min` when `None`.
    pub round_up_from: Option<f64>,
    /// Changepoint search penalty on the event-minus-reference series.
    pub prediction_penalty: f64,
}

impl Default for ClockShiftConfig {
    fn default() -> Self {
        Self {
            period_min: 2,
            shift_min: 15.0,
            round_up_from: None,
            prediction_penalty: 13.0,
        }
    }
}

/// Detect clock shifts by comparing measured daily event times against a
/// modeled reference.
///
/// Both inputs are daily series of minutes since midnight. They are
/// matched by calendar date (the comparison is timezone-naive; both must
/// describe the same calendar days), and dates whose difference is
/// missing are dropped. The difference is segmented by an exact
/// changepoint search, each value is rounded to a multiple of
/// `shift_min`, and every segment is replaced by its modal rounded
/// value — ties go to the value that appears first in the segment.
///
/// Returns `(shifted, shift_amount)` over the matched dates, indexed by
/// the event series' own timestamps: `shift_amount` is the per-day shift
/// in minutes and `shifted` is simply `shift_amount != 0`.
///
/// # Errors
///
/// Non-chronological input and `period_min` exceeding the number of
/// matched days are hard errors; search backend failures propagate.
pub fn shifts_ruptures(
    event_times: &TimeSeries<f64>,
    reference_times: &TimeSeries<f64>,
    config: &ClockShiftConfig,
) -> QcResult<(BooleanMask, TimeSeries<i64>)> {
    if !event_times.is_chronological() || !reference_times.is_chronological() {
        return Err(QcError::NotChronological);
    }
    let (timestamps, diff) = date_matched_difference(event_times, reference_times);
    if config.period_min > diff.len() {
        return Err(QcError::PeriodTooLong {
            period_min: config.period_min,
            days: diff.len(),
        });
    }

    let mut search = SearchStrategy::Pelt {
        min_size: config.period_min,
        jump: 1,
    }
    .searcher(CostFunction::Rbf)?;
    search.fit(&diff)?;
    let breakpoints = search.predict(config.prediction_penalty)?;
    // Segment edges covering the full series: the search already
    // terminates at the length; the leading zero closes the first segment.
    let mut edges = vec![0];
    edges.extend(&breakpoints);
    debug!("clock-shift search split {} day(s) into {} segment(s)", diff.len(), edges.len() - 1);

    let round_up_from = config.round_up_from.unwrap_or(config.shift_min / 2.0);
    let rounded: Vec<i64> = diff
        .iter()
        .map(|&minutes| round_to_multiple(minutes, config.shift_min, round_up_from))
        .collect();

    let mut shift_amount = vec![0i64; rounded.len()];
    for pair in edges.windows(2) {
        let segment = &rounded[pair[0]..pair[1]];
        let mode = stats::mode_first(segment).unwrap_or(0);
        shift_amount[pair[0]..pair[1]].fill(mode);
    }

    let shifted: Vec<bool> = shift_amount.iter().map(|&m| m != 0).collect();
    let amounts = TimeSeries::new(timestamps.clone(), shift_amount)?;
    let shifted = TimeSeries::new(timestamps, shifted)?;
    Ok((shifted, amounts))
}

/// Event-minus-reference difference on the dates both series cover,
/// dropping missing differences. Keeps the event series' timestamps.
fn date_matched_difference(
    event_times: &TimeSeries<f64>,
    reference_times: &TimeSeries<f64>,
) -> (Vec<Timestamp>, Vec<f64>) {
    let mut timestamps = Vec::new();
    let mut diff = Vec::new();
    let mut j = 0;
    let reference = reference_times.timestamps();
    for (ts, &event) in event_times.iter() {
        let date = ts.date_naive();
        while j < reference.len() && reference[j].date_naive() < date {
            j += 1;
        }
        if j < reference.len() && reference[j].date_naive() == date {
            let difference = event - reference_times.values()[j];
            if difference.is_finite() {
                timestamps.push(*ts);
                diff.push(difference);
            }
        }
    }
    (timestamps, diff)
}

/// Round to a multiple of `to`, carrying the sign and rounding the
/// magnitude up only when its remainder exceeds `up_from`.
fn round_to_multiple(x: f64, to: f64, up_from: f64) -> i64 {
    let magnitude = x.abs();
    let quotient = (magnitude / to).floor();
    let remainder = magnitude - quotient * to;
    let rounded = if remainder > up_from {
        (quotient + 1.0) * to
    } else {
        quotient * to
    };
    (x.signum() * rounded).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn daily_series(values: Vec<f64>) -> TimeSeries<f64> {
        let offset = FixedOffset::east_opt(0).unwrap();
        let start = offset.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap();
        let timestamps: Vec<Timestamp> = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        TimeSeries::new(timestamps, values).unwrap()
    }

    #[test]
    fn rounding_carries_sign_and_threshold() {
        assert_eq!(round_to_multiple(0.0, 15.0, 7.5), 0);
        assert_eq!(round_to_multiple(7.0, 15.0, 7.5), 0);
        assert_eq!(round_to_multiple(8.0, 15.0, 7.5), 15);
        assert_eq!(round_to_multiple(22.0, 15.0, 7.5), 15);
        assert_eq!(round_to_multiple(23.0, 15.0, 7.5), 30);
        assert_eq!(round_to_multiple(-60.0, 15.0, 7.5), -60);
        assert_eq!(round_to_multiple(-8.0, 15.0, 7.5), -15);
        // A lower threshold rounds up earlier.
        assert_eq!(round_to_multiple(3.0, 15.0, 2.0), 15);
    }

    #[test]
    fn period_longer_than_the_series_is_rejected() {
        let event = daily_series(vec![720.0; 10]);
        let reference = daily_series(vec![720.0; 10]);
        let config = ClockShiftConfig {
            period_min: 11,
            ..ClockShiftConfig::default()
        };
        assert_eq!(
            shifts_ruptures(&event, &reference, &config).err(),
            Some(QcError::PeriodTooLong {
                period_min: 11,
                days: 10
            })
        );
    }

    #[test]
    fn agreeing_clocks_report_no_shift() {
        let event = daily_series((0..60).map(|i| 720.0 + (i % 3) as f64).collect());
        let reference = daily_series((0..60).map(|i| 720.0 + (i % 3) as f64).collect());
        let (shifted, amounts) =
            shifts_ruptures(&event, &reference, &ClockShiftConfig::default()).unwrap();
        assert!(shifted.values().iter().all(|&s| !s));
        assert!(amounts.values().iter().all(|&m| m == 0));
    }

    #[test]
    fn dates_missing_from_the_reference_are_dropped() {
        let event = daily_series(vec![720.0; 30]);
        let reference = daily_series(vec![725.0; 20]);
        let (shifted, amounts) =
            shifts_ruptures(&event, &reference, &ClockShiftConfig::default()).unwrap();
        assert_eq!(shifted.len(), 20);
        assert_eq!(amounts.len(), 20);
        // Constant -5 difference rounds to zero shift.
        assert!(amounts.values().iter().all(|&m| m == 0));
    }

    #[test]
    fn missing_event_times_are_dropped() {
        let mut values = vec![720.0; 30];
        values[10] = f64::NAN;
        let event = daily_series(values);
        let reference = daily_series(vec![720.0; 30]);
        let (shifted, _) =
            shifts_ruptures(&event, &reference, &ClockShiftConfig::default()).unwrap();
        assert_eq!(shifted.len(), 29);
    }

    #[test]
    fn output_keeps_the_event_timestamps() {
        let event = daily_series(vec![780.0; 40]);
        let reference = daily_series(vec![720.0; 40]);
        let (shifted, amounts) =
            shifts_ruptures(&event, &reference, &ClockShiftConfig::default()).unwrap();
        assert_eq!(shifted.timestamps(), event.timestamps());
        // One hour fast, everywhere.
        assert!(shifted.values().iter().all(|&s| s));
        assert!(amounts.values().iter().all(|&m| m == 60));
    }
}

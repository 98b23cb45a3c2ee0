//! Day/night classification from a power or irradiance signal
//!
//! PV telemetry rarely arrives with trustworthy sunrise/sunset metadata, so
//! [`power_or_irradiance`] derives a daytime mask from the signal itself:
//! night shows up as low values, low first differences, and a low rolling
//! median at the same minute of day. Two correction passes then repair the
//! classifications that the raw criteria get wrong: runs that flip between
//! day and night too quickly (mid-day outages, passing clouds over a
//! marginal sensor) and whole days that come out too short (DST
//! transitions, partial-day outages).
//!
//! [`sunrise`] and [`sunset`] read per-day edges off the finished mask,
//! adjusting for whether timestamps label the start, middle, or end of the
//! sampling interval.

use log::debug;

use crate::errors::{QcError, QcResult};
use crate::series::{BooleanMask, TimeSeries, Timestamp};
use crate::stats::{self, RollingStat};
use crate::time::{DataAlignment, Frequency};

/// Tuning for [`power_or_irradiance`].
///
/// The thresholds apply to the min-max normalized signal and were tuned on
/// minute-to-hourly field data; the defaults are a sensible starting point
/// for AC power, DC power, and plane-of-array irradiance alike.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DaytimeConfig {
    /// Normalized values at or below this read as night.
    pub low_value_threshold: f64,
    /// Normalized first differences (per minute) at or below this read as
    /// night.
    pub low_diff_threshold: f64,
    /// Rolling minute-of-day medians at or below this read as night.
    pub low_median_threshold: f64,
    /// Days in the centered window of the minute-of-day rolling median.
    pub median_days: usize,
    /// Days in the centered window of the majority vote used to repair
    /// invalid classifications.
    pub correction_window: usize,
    /// Day or night runs shorter than this many hours are presumed wrong
    /// and repaired by the majority vote.
    pub hours_min: f64,
    /// A day more than this many minutes shorter than the rolling median
    /// day length is repaired wholesale.
    pub day_length_difference_max: f64,
    /// Days in the centered window of the rolling median day length.
    pub day_length_window: usize,
    /// Sampling interval; inferred from the series when `None`.
    pub freq: Option<Frequency>,
}

impl Default for DaytimeConfig {
    fn default() -> Self {
        Self {
            low_value_threshold: 0.003,
            low_diff_threshold: 0.0005,
            low_median_threshold: 0.0015,
            median_days: 7,
            correction_window: 31,
            hours_min: 5.0,
            day_length_difference_max: 30.0,
            day_length_window: 14,
            freq: None,
        }
    }
}

/// Classify every timestamp of a power or irradiance series as day (True)
/// or night (False).
///
/// Missing readings count as darkness, not gaps. Positions flagged in
/// `outliers` are excluded from normalization and can never vote for
/// night on the value criterion. Positions flagged in `clipping` are
/// forced to day before the day-length repair runs; an inverter cannot
/// clip at night.
///
/// Returns an all-False mask for a series that never moves (all zero, all
/// missing, or constant).
pub fn power_or_irradiance(
    series: &TimeSeries<f64>,
    config: &DaytimeConfig,
    outliers: Option<&BooleanMask>,
    clipping: Option<&BooleanMask>,
) -> QcResult<BooleanMask> {
    if let Some(mask) = clipping {
        if mask.len() != series.len() {
            return Err(QcError::LengthMismatch {
                expected: series.len(),
                got: mask.len(),
            });
        }
    }
    let freq = match config.freq {
        Some(freq) => freq,
        None => Frequency::infer(series)?,
    };
    let minutes_per_value = freq.minutes_f64();

    let filled = series.map(|v| if v.is_finite() { *v } else { 0.0 });
    let mut normalized = stats::normalize_min_max(&filled, outliers)?;
    if normalized.values().iter().all(|v| !v.is_finite()) {
        // No range to scale by: a PV signal that never moves is dark the
        // whole way through. Keep outlier positions blank.
        let flat: Vec<f64> = match outliers {
            Some(mask) => mask
                .values()
                .iter()
                .map(|&out| if out { f64::NAN } else { 0.0 })
                .collect(),
            None => vec![0.0; series.len()],
        };
        normalized = series.with_values(flat)?;
    }

    // Normalized change per minute; the first sample has no history and
    // cannot vote on the difference criterion.
    let norm = normalized.values();
    let mut diff = vec![f64::NAN; norm.len()];
    for i in 1..norm.len() {
        diff[i] = (norm[i] - norm[i - 1]) / minutes_per_value;
    }

    let rolling_median = stats::rolling_by_minute(&normalized, config.median_days, RollingStat::Median);

    // Night needs two of the three low-signal criteria to agree. NaN
    // comparisons are false, so missing evidence never votes for night.
    let night: Vec<bool> = norm
        .iter()
        .zip(diff.iter())
        .zip(rolling_median.values())
        .map(|((&value, &delta), &median)| {
            let low_value = value <= config.low_value_threshold;
            let low_diff = delta.abs() <= config.low_diff_threshold;
            let low_median = median <= config.low_median_threshold;
            (low_value && low_diff) || (low_value && low_median) || (low_diff && low_median)
        })
        .collect();
    let night = series.with_values(night)?;

    let night = correct_midday_errors(&night, minutes_per_value, config)?;

    let night = match clipping {
        Some(mask) => night.with_values(
            night
                .values()
                .iter()
                .zip(mask.values())
                .map(|(&n, &clipped)| n && !clipped)
                .collect(),
        )?,
        None => night,
    };

    let night = correct_day_length(&night, minutes_per_value, config)?;

    Ok(night.map(|&n| !n))
}

/// Replace classifications at `invalid` positions with the strict majority
/// at the same minute of day across `correction_window` surrounding days.
///
/// Invalid positions do not vote. A tied or empty vote resolves to day.
fn correct_if_invalid(
    night: &BooleanMask,
    invalid: &[bool],
    correction_window: usize,
) -> QcResult<BooleanMask> {
    let votes: Vec<f64> = night
        .values()
        .iter()
        .zip(invalid)
        .map(|(&n, &bad)| {
            if bad {
                f64::NAN
            } else if n {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    let votes = night.with_values(votes)?;
    let majority = stats::rolling_by_minute(&votes, correction_window, RollingStat::Mean);
    night.with_values(
        night
            .values()
            .iter()
            .zip(invalid)
            .zip(majority.values())
            .map(|((&n, &bad), &mean)| if bad { mean > 0.5 } else { n })
            .collect(),
    )
}

/// Repair runs that flip between day and night faster than `hours_min`.
fn correct_midday_errors(
    night: &BooleanMask,
    minutes_per_value: f64,
    config: &DaytimeConfig,
) -> QcResult<BooleanMask> {
    let runs = stats::run_lengths(night);
    let invalid: Vec<bool> = runs
        .values()
        .iter()
        .map(|&len| (len as f64) * minutes_per_value < config.hours_min * 60.0)
        .collect();
    let repaired = invalid.iter().filter(|&&bad| bad).count();
    if repaired > 0 {
        debug!("repairing {repaired} sample(s) in too-short day/night runs");
    }
    correct_if_invalid(night, &invalid, config.correction_window)
}

/// Repair whole days that are much shorter than their neighbors.
///
/// Day length is the longest contiguous run of day samples within the
/// calendar day, in minutes; a day with no day samples has length zero.
/// A day more than `day_length_difference_max` minutes shorter than the
/// rolling median over `day_length_window` days is invalidated end to end,
/// so that DST transitions and partial outages do not leave a single
/// misplaced sunrise or sunset inside an otherwise plausible day.
fn correct_day_length(
    night: &BooleanMask,
    minutes_per_value: f64,
    config: &DaytimeConfig,
) -> QcResult<BooleanMask> {
    let groups = night.day_groups();
    let lengths: Vec<f64> = groups
        .iter()
        .map(|(_, range)| {
            let mut longest = 0usize;
            let mut current = 0usize;
            for &is_night in &night.values()[range.clone()] {
                if is_night {
                    current = 0;
                } else {
                    current += 1;
                    longest = longest.max(current);
                }
            }
            longest as f64 * minutes_per_value
        })
        .collect();
    let medians = stats::rolling_median(&lengths, config.day_length_window);

    let mut invalid = vec![false; night.len()];
    for ((date, range), (&length, &median)) in groups.iter().zip(lengths.iter().zip(&medians)) {
        if length < median - config.day_length_difference_max {
            debug!("repairing {date}: day length {length} min vs median {median} min");
            invalid[range.clone()].fill(true);
        }
    }
    correct_if_invalid(night, &invalid, config.correction_window)
}

/// Per-day sunrise instants read off a daytime mask.
///
/// Every timestamp of a calendar day carries that day's sunrise: the
/// timestamp of the day's first True sample, shifted according to
/// `alignment` so the returned instant marks the transition itself rather
/// than the interval label. Days with no day samples carry `None`.
pub fn sunrise(
    daytime_mask: &BooleanMask,
    alignment: DataAlignment,
    freq: Option<Frequency>,
) -> QcResult<TimeSeries<Option<Timestamp>>> {
    day_edge(daytime_mask, alignment, freq, DayEdge::First)
}

/// Per-day sunset instants read off a daytime mask.
///
/// Symmetric to [`sunrise`]: the timestamp of the day's last True sample,
/// shifted according to `alignment`. For left-aligned data the reported
/// sunset is one interval past the last day sample, the first instant the
/// sun is known to be down.
pub fn sunset(
    daytime_mask: &BooleanMask,
    alignment: DataAlignment,
    freq: Option<Frequency>,
) -> QcResult<TimeSeries<Option<Timestamp>>> {
    day_edge(daytime_mask, alignment, freq, DayEdge::Last)
}

#[derive(Clone, Copy, PartialEq)]
enum DayEdge {
    First,
    Last,
}

fn day_edge(
    mask: &BooleanMask,
    alignment: DataAlignment,
    freq: Option<Frequency>,
    edge: DayEdge,
) -> QcResult<TimeSeries<Option<Timestamp>>> {
    let freq = match freq {
        Some(freq) => freq,
        None => Frequency::infer(mask)?,
    };
    let interval = freq.as_duration();
    let offset = match (edge, alignment) {
        (DayEdge::First, DataAlignment::Left) => chrono::Duration::zero(),
        (DayEdge::First, DataAlignment::Center) => -interval / 2,
        (DayEdge::First, DataAlignment::Right) => -interval,
        (DayEdge::Last, DataAlignment::Left) => interval,
        (DayEdge::Last, DataAlignment::Center) => interval / 2,
        (DayEdge::Last, DataAlignment::Right) => chrono::Duration::zero(),
    };

    let mut out = vec![None; mask.len()];
    for (_, range) in mask.day_groups() {
        let values = &mask.values()[range.clone()];
        let position = match edge {
            DayEdge::First => values.iter().position(|&day| day),
            DayEdge::Last => values.iter().rposition(|&day| day),
        };
        if let Some(position) = position {
            let instant = mask.timestamps()[range.start + position] + offset;
            out[range].fill(Some(instant));
        }
    }
    mask.with_values(out)
}

//! Level-shift detection in daily summary series
//!
//! A capacity re-rating, sensor replacement, or logger scaling change
//! shows up as an abrupt level shift in a daily energy or insolation
//! series. [`detect_data_shifts`] finds those shifts with a penalized
//! changepoint search over the preprocessed signal;
//! [`get_longest_shift_segment_dates`] then picks the longest shift-free
//! stretch, which is what degradation and performance analyses want to
//! run on.

use chrono::NaiveDate;
use log::debug;

use pvqc_changepoint::{ChangepointSearch, CostFunction, SearchStrategy};

use crate::errors::{QcError, QcResult};
use crate::series::{BooleanMask, TimeSeries};
use crate::shifts::preprocess;

/// Span above which the annual cycle dominates and is removed first.
const SEASONALITY_SPAN_DAYS: i64 = 730;
/// Window width of the default short-series search.
const SHORT_SERIES_WINDOW: usize = 50;
/// Penalty of the default short-series search.
const SHORT_SERIES_PENALTY: f64 = 30.0;

/// Tuning for [`detect_data_shifts`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DataShiftConfig {
    /// Drop stale, non-positive, and extreme values before searching.
    pub filtering: bool,
    /// Pick search strategy and penalty from the series span. When false,
    /// `method` and `cost` must both be supplied.
    pub use_default_models: bool,
    /// Search strategy for `use_default_models = false`.
    pub method: Option<SearchStrategy>,
    /// Cost model for `use_default_models = false`.
    pub cost: Option<CostFunction>,
    /// Search penalty; higher means fewer detected shifts. The default
    /// short-series model overrides this with its own tuned penalty.
    pub penalty: f64,
}

impl Default for DataShiftConfig {
    fn default() -> Self {
        Self {
            filtering: true,
            use_default_models: true,
            method: None,
            cost: None,
            penalty: 40.0,
        }
    }
}

/// Detect abrupt level shifts in a daily series.
///
/// Returns a mask over the input index, True exactly at the first sample
/// of each new level. Samples removed by filtering are False. A series
/// with no detectable shift returns an all-False mask; that is a result,
/// not an error.
///
/// With `use_default_models`, series spanning more than two years are
/// deseasonalized and searched bottom-up, shorter series keep their
/// seasonality and get a sliding-window search; both use the RBF cost.
///
/// # Errors
///
/// Non-chronological or non-daily input is a hard error, as is a series
/// that filtering leaves empty (the search backend's failure is
/// propagated).
pub fn detect_data_shifts(
    series: &TimeSeries<f64>,
    config: &DataShiftConfig,
) -> QcResult<BooleanMask> {
    preprocess::validate_daily(series)?;
    let span_days = match (series.timestamps().first(), series.timestamps().last()) {
        (Some(first), Some(last)) => (*last - *first).num_days(),
        _ => 0,
    };
    let remove_seasonality = span_days > SEASONALITY_SPAN_DAYS;
    let preprocessed = preprocess::preprocess(series, config.filtering, remove_seasonality)?;

    let (strategy, cost, penalty) = if config.use_default_models {
        if remove_seasonality {
            (SearchStrategy::BottomUp, CostFunction::Rbf, config.penalty)
        } else {
            (
                SearchStrategy::Window {
                    width: SHORT_SERIES_WINDOW,
                },
                CostFunction::Rbf,
                SHORT_SERIES_PENALTY,
            )
        }
    } else {
        match (config.method, config.cost) {
            (Some(method), Some(cost)) => (method, cost, config.penalty),
            _ => return Err(QcError::MissingSearchConfig),
        }
    };
    debug!(
        "searching {} preprocessed day(s) with {strategy:?}/{cost:?}, penalty {penalty} \
         (seasonality removed: {remove_seasonality})"
    , preprocessed.len());

    let mut search = strategy.searcher(cost)?;
    search.fit(preprocessed.values())?;
    let mut breakpoints = search.predict(penalty)?;
    // The search terminates its output with the series length; that
    // sentinel is coverage bookkeeping, not a shift.
    if breakpoints.last() == Some(&preprocessed.len()) {
        breakpoints.pop();
    }
    debug!("{} data shift(s) detected", breakpoints.len());

    let mut shifted = vec![false; preprocessed.len()];
    for &breakpoint in &breakpoints {
        shifted[breakpoint] = true;
    }

    // Back onto the original index; filtered-out samples are False.
    let mut out = vec![false; series.len()];
    let kept = preprocessed.timestamps();
    let mut j = 0;
    for (i, ts) in series.timestamps().iter().enumerate() {
        if j < kept.len() && kept[j] == *ts {
            out[i] = shifted[j];
            j += 1;
        }
    }
    series.with_values(out)
}

/// Start and end dates of the longest shift-free stretch of a daily
/// series.
///
/// Detected shifts partition the series; the segment with the most
/// samples wins, earliest segment on a tie. `buffer_days` is added to the
/// start and subtracted from the end to keep the transition ramp out of
/// the returned interval. A segment shorter than `2 * buffer_days`
/// returns `end < start`; callers must check for that degenerate
/// interval rather than expect an error.
pub fn get_longest_shift_segment_dates(
    series: &TimeSeries<f64>,
    config: &DataShiftConfig,
    buffer_days: i64,
) -> QcResult<(NaiveDate, NaiveDate)> {
    let shift_mask = detect_data_shifts(series, config)?;

    // Segment id = number of shifts seen so far; (count, first, last) per id.
    let mut segments: Vec<(usize, usize, usize)> = Vec::new();
    for (i, &is_shift) in shift_mask.values().iter().enumerate() {
        if is_shift || segments.is_empty() {
            segments.push((0, i, i));
        }
        if let Some(current) = segments.last_mut() {
            current.0 += 1;
            current.2 = i;
        }
    }

    let (_, first, last) = segments
        .iter()
        .fold(None::<(usize, usize, usize)>, |best, &candidate| {
            match best {
                Some(best) if best.0 >= candidate.0 => Some(best),
                _ => Some(candidate),
            }
        })
        .ok_or(QcError::TooFewSamples { got: 0 })?;

    let timestamps = series.timestamps();
    let start = timestamps[first].date_naive() + chrono::Duration::days(buffer_days);
    let end = timestamps[last].date_naive() - chrono::Duration::days(buffer_days);
    debug!("longest shift-free segment: {start} to {end}");
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Timestamp;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn daily_series(values: Vec<f64>) -> TimeSeries<f64> {
        let offset = FixedOffset::east_opt(0).unwrap();
        let start = offset.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        let timestamps: Vec<Timestamp> = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        TimeSeries::new(timestamps, values).unwrap()
    }

    #[test]
    fn custom_models_require_method_and_cost() {
        let series = daily_series((0..120).map(|i| 10.0 + (i % 7) as f64).collect());
        let config = DataShiftConfig {
            use_default_models: false,
            ..DataShiftConfig::default()
        };
        assert_eq!(
            detect_data_shifts(&series, &config).err(),
            Some(QcError::MissingSearchConfig)
        );
    }

    #[test]
    fn clean_step_is_flagged_at_the_step() {
        let values: Vec<f64> = (0..120).map(|i| if i < 60 { 5.0 } else { 9.0 }).collect();
        let config = DataShiftConfig {
            filtering: false, // constant plateaus would read as stale
            ..DataShiftConfig::default()
        };
        let mask = detect_data_shifts(&daily_series(values), &config).unwrap();
        let flagged: Vec<usize> = mask
            .values()
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect();
        assert_eq!(flagged, vec![60]);
    }

    #[test]
    fn ramp_has_no_changepoints_and_no_sentinel_leak() {
        let values: Vec<f64> = (0..120).map(|i| i as f64 / 120.0).collect();
        let config = DataShiftConfig {
            filtering: false,
            ..DataShiftConfig::default()
        };
        let mask = detect_data_shifts(&daily_series(values), &config).unwrap();
        assert!(mask.values().iter().all(|&s| !s));
        assert_eq!(mask.len(), 120);
    }

    #[test]
    fn filtered_positions_stay_false_and_aligned() {
        let mut values: Vec<f64> = (0..200).map(|i| 10.0 + ((i * 37) % 17) as f64 / 10.0).collect();
        values[50] = -3.0;
        values[51] = f64::NAN;
        let series = daily_series(values);
        let mask = detect_data_shifts(&series, &DataShiftConfig::default()).unwrap();
        assert_eq!(mask.len(), series.len());
        assert!(!mask.values()[50]);
        assert!(!mask.values()[51]);
    }

    #[test]
    fn empty_after_filtering_propagates_the_search_failure() {
        let series = daily_series(vec![-1.0; 100]);
        assert!(matches!(
            detect_data_shifts(&series, &DataShiftConfig::default()),
            Err(QcError::Search(_))
        ));
    }

    #[test]
    fn buffer_can_invert_a_short_segment() {
        let values: Vec<f64> = (0..120).map(|i| if i < 110 { 5.0 } else { 9.0 }).collect();
        let config = DataShiftConfig {
            filtering: false,
            ..DataShiftConfig::default()
        };
        // Whatever segment wins spans fewer than 2 * 60 days here, so the
        // buffered interval comes back inverted.
        let (start, end) =
            get_longest_shift_segment_dates(&daily_series(values), &config, 60).unwrap();
        assert!(end < start);
    }
}

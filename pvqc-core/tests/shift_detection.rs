//! End-to-end shift detection scenarios
//!
//! Multi-year synthetic daily series with known level steps and clock
//! jumps, exercising model selection (seasonal bottom-up vs. short-series
//! window search), mask reindexing, segment selection, and the clock
//! shift estimator.

#![cfg(feature = "changepoint")]

use chrono::{Duration, FixedOffset, NaiveDate, TimeZone};
use proptest::prelude::*;

use pvqc_core::shifts::{self, ClockShiftConfig, DataShiftConfig};
use pvqc_core::{TimeSeries, Timestamp};

const BASE_YEAR: i32 = 2015;

fn daily_series(values: Vec<f64>) -> TimeSeries<f64> {
    let offset = FixedOffset::east_opt(0).unwrap();
    let start = offset.with_ymd_and_hms(BASE_YEAR, 1, 1, 0, 0, 0).unwrap();
    let timestamps: Vec<Timestamp> = (0..values.len())
        .map(|i| start + Duration::days(i as i64))
        .collect();
    TimeSeries::new(timestamps, values).unwrap()
}

fn base_date(day: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(BASE_YEAR, 1, 1).unwrap() + Duration::days(day)
}

/// Deterministic jitter, enough to keep quantile and stale filters from
/// eating entire plateaus.
fn jitter(i: usize) -> f64 {
    ((i * 7919) % 1000) as f64 / 1000.0 - 0.5
}

#[test]
fn multi_year_step_is_found_after_seasonality_removal() {
    // Three years of a clean annual cycle with a +0.5 step late in the
    // final year: long enough that the seasonal median comes from the
    // unstepped years and the residual keeps the step intact.
    let values: Vec<f64> = (0..1100)
        .map(|i| {
            let season = 0.5 * ((i % 365) as f64 / 365.0 * std::f64::consts::TAU).sin();
            let step = if i >= 900 { 0.5 } else { 0.0 };
            2.0 + season + step + 0.01 * jitter(i)
        })
        .collect();
    let series = daily_series(values);
    let mask = shifts::detect_data_shifts(&series, &DataShiftConfig::default()).unwrap();

    let flagged: Vec<NaiveDate> = mask
        .iter()
        .filter(|(_, &shifted)| shifted)
        .map(|(ts, _)| ts.date_naive())
        .collect();
    assert!(
        flagged
            .iter()
            .any(|d| (base_date(892)..=base_date(908)).contains(d)),
        "step at day 900 missed: {flagged:?}"
    );
}

#[test]
fn longest_shift_free_segment_is_buffered() {
    // Steps at days 100 and 300 of 400: segments of 100, 200, and 100
    // days. The middle segment wins, with a week trimmed from each end.
    let values: Vec<f64> = (0..400)
        .map(|i| {
            if i < 100 {
                5.0
            } else if i < 300 {
                8.0
            } else {
                6.5
            }
        })
        .collect();
    let config = DataShiftConfig {
        filtering: false,
        ..DataShiftConfig::default()
    };
    let series = daily_series(values);

    let mask = shifts::detect_data_shifts(&series, &config).unwrap();
    let flagged: Vec<usize> = mask
        .values()
        .iter()
        .enumerate()
        .filter_map(|(i, &s)| s.then_some(i))
        .collect();
    assert_eq!(flagged, vec![100, 300]);
    // The trailing search sentinel never leaks into the mask.
    assert!(!mask.values()[399]);

    let (start, end) = shifts::get_longest_shift_segment_dates(&series, &config, 7).unwrap();
    assert_eq!(start, base_date(100 + 7));
    assert_eq!(end, base_date(299 - 7));
}

#[test]
fn dst_style_reference_jump_flags_the_shifted_half() {
    // Measured event time stays put while the reference jumps an hour at
    // day 100: every day from the jump on is shifted by -60 minutes.
    let event = daily_series(vec![720.0; 200]);
    let reference =
        daily_series((0..200).map(|i| if i < 100 { 720.0 } else { 780.0 }).collect());

    let (shifted, amounts) =
        shifts::shifts_ruptures(&event, &reference, &ClockShiftConfig::default()).unwrap();
    for (i, (&is_shifted, &amount)) in shifted.values().iter().zip(amounts.values()).enumerate() {
        if i < 100 {
            assert!(!is_shifted, "day {i} should be clean");
            assert_eq!(amount, 0);
        } else {
            assert!(is_shifted, "day {i} should be shifted");
            assert_eq!(amount, -60);
        }
    }
}

#[test]
fn noisy_event_times_quantize_to_the_segment_mode() {
    // A 20-minute offset with a few minutes of scatter: every rounded
    // difference lands on 15 or 30, and the segment mode smooths the
    // scatter into one constant shift.
    let event = daily_series((0..80).map(|i| 740.0 + 2.0 * jitter(i)).collect());
    let reference = daily_series(vec![720.0; 80]);

    let (shifted, amounts) =
        shifts::shifts_ruptures(&event, &reference, &ClockShiftConfig::default()).unwrap();
    assert!(shifted.values().iter().all(|&s| s));
    let first = amounts.values()[0];
    assert!(first == 15 || first == 30);
    assert!(amounts.values().iter().all(|&m| m == first));
}

proptest! {
    /// Filtering is a one-shot transform: preprocessing its own output
    /// with filtering off changes nothing.
    #[test]
    fn preprocessing_is_one_shot(values in prop::collection::vec(0.5f64..100.0, 40..160)) {
        let series = daily_series(values);
        let once = shifts::preprocess(&series, true, false).unwrap();
        prop_assume!(once.len() >= 2);
        let twice = shifts::preprocess(&once, false, false).unwrap();
        prop_assert_eq!(&once, &twice);
    }

    /// Every reported clock shift is a multiple of the granularity.
    #[test]
    fn shift_amounts_are_multiples_of_the_granularity(
        offsets in prop::collection::vec(-90.0f64..90.0, 10..60),
    ) {
        let reference = daily_series(vec![720.0; offsets.len()]);
        let event = daily_series(offsets.iter().map(|o| 720.0 + o).collect());
        let (_, amounts) =
            shifts::shifts_ruptures(&event, &reference, &ClockShiftConfig::default()).unwrap();
        for &amount in amounts.values() {
            prop_assert_eq!(amount.rem_euclid(15), 0);
        }
    }
}

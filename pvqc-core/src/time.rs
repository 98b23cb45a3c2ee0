//! Sampling frequency and timestamp alignment
//!
//! A [`Frequency`] is the nominal spacing between samples. It is either
//! supplied explicitly (parsed from a small string vocabulary) or inferred
//! as the strict-plurality inter-sample gap; a series so irregular that no
//! gap dominates is a hard error, never a guess.

use chrono::Duration;
use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::{QcError, QcResult};
use crate::series::TimeSeries;

/// Nominal interval between consecutive samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frequency(Duration);

impl Frequency {
    /// Wrap a positive duration.
    pub fn from_duration(duration: Duration) -> QcResult<Self> {
        if duration <= Duration::zero() {
            return Err(QcError::InvalidFrequency);
        }
        Ok(Self(duration))
    }

    /// The interval as a [`Duration`].
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// The interval in whole seconds.
    pub fn seconds(&self) -> i64 {
        self.0.num_seconds()
    }

    /// The interval in (possibly fractional) minutes.
    pub fn minutes_f64(&self) -> f64 {
        self.0.num_seconds() as f64 / 60.0
    }

    /// Whether this is exactly one calendar day.
    pub fn is_daily(&self) -> bool {
        self.0 == Duration::days(1)
    }

    /// Infer the dominant inter-sample gap of a series.
    ///
    /// The gap that occurs strictly more often than every other gap wins.
    /// Two or fewer samples, a tie for the most common gap, or a series
    /// made only of duplicate timestamps cannot be inferred from.
    /// Backwards gaps mean the series is not chronological.
    pub fn infer<T>(series: &TimeSeries<T>) -> QcResult<Self> {
        if series.len() < 2 {
            return Err(QcError::TooFewSamples { got: series.len() });
        }
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for pair in series.timestamps().windows(2) {
            let gap = (pair[1] - pair[0]).num_seconds();
            if gap < 0 {
                return Err(QcError::NotChronological);
            }
            if gap == 0 {
                // Duplicate timestamps carry no spacing information.
                continue;
            }
            *counts.entry(gap).or_insert(0) += 1;
        }

        let mut dominant: Option<(i64, usize)> = None;
        let mut tied = false;
        for (&gap, &count) in &counts {
            match dominant {
                None => dominant = Some((gap, count)),
                Some((best_gap, best_count)) => {
                    if count > best_count {
                        dominant = Some((gap, count));
                        tied = false;
                    } else if count == best_count && gap != best_gap {
                        tied = true;
                    }
                }
            }
        }
        match dominant {
            Some((gap, _)) if !tied => Ok(Self(Duration::seconds(gap))),
            _ => Err(QcError::AmbiguousFrequency),
        }
    }
}

impl FromStr for Frequency {
    type Err = QcError;

    /// Parse strings like `"15min"`, `"1h"`, `"1d"`, `"30s"`.
    ///
    /// The count may be omitted (`"min"` means one minute).
    fn from_str(s: &str) -> QcResult<Self> {
        let trimmed = s.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count_str, unit) = trimmed.split_at(digits_end);
        let count: i64 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| QcError::UnrecognizedFrequency(s.to_string()))?
        };
        if count == 0 {
            return Err(QcError::InvalidFrequency);
        }
        let duration = match unit {
            "s" | "sec" => Duration::seconds(count),
            "min" | "T" => Duration::minutes(count),
            "h" | "H" => Duration::hours(count),
            "d" | "D" => Duration::days(count),
            _ => return Err(QcError::UnrecognizedFrequency(s.to_string())),
        };
        Self::from_duration(duration)
    }
}

/// Which instant of the sampling interval a timestamp labels.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataAlignment {
    /// Timestamp marks the start of the interval.
    Left,
    /// Timestamp marks the middle of the interval.
    Center,
    /// Timestamp marks the end of the interval.
    Right,
}

impl FromStr for DataAlignment {
    type Err = QcError;

    fn from_str(s: &str) -> QcResult<Self> {
        match s {
            "L" | "l" => Ok(Self::Left),
            "C" | "c" => Ok(Self::Center),
            "R" | "r" => Ok(Self::Right),
            other => Err(QcError::InvalidAlignment(other.to_string())),
        }
    }
}

//! Timestamp-indexed series
//!
//! [`TimeSeries`] is the one data structure everything else operates on: a
//! pair of parallel vectors, timestamps and values, aligned by position.
//! `f64` series use NaN as the missing-value sentinel; NaN propagates
//! through arithmetic and compares as `false`, which is exactly the
//! behavior the classifiers rely on.
//!
//! Series are borrowed, never mutated: every algorithm returns a new series
//! and leaves the caller's copy untouched.

use chrono::{DateTime, FixedOffset, NaiveDate};
use std::ops::Range;

use crate::errors::{QcError, QcResult};

/// Timestamp carrying its own fixed UTC offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Boolean series aligned 1:1 with the series it was derived from.
pub type BooleanMask = TimeSeries<bool>;

/// An ordered sequence of timestamped values.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T> {
    timestamps: Vec<Timestamp>,
    values: Vec<T>,
}

impl<T> TimeSeries<T> {
    /// Build a series from parallel timestamp and value vectors.
    pub fn new(timestamps: Vec<Timestamp>, values: Vec<T>) -> QcResult<Self> {
        if timestamps.len() != values.len() {
            return Err(QcError::LengthMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }
        Ok(Self { timestamps, values })
    }

    /// A series with no samples.
    pub fn empty() -> Self {
        Self {
            timestamps: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the series has no samples.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The timestamp index.
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// The values, in index order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Mutable view of the values; the index cannot change.
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Consume the series into its parts.
    pub fn into_parts(self) -> (Vec<Timestamp>, Vec<T>) {
        (self.timestamps, self.values)
    }

    /// Iterate over `(timestamp, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Timestamp, &T)> {
        self.timestamps.iter().zip(self.values.iter())
    }

    /// A new series over the same index with transformed values.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> TimeSeries<U> {
        TimeSeries {
            timestamps: self.timestamps.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }

    /// A new series over the same index with replacement values.
    pub fn with_values<U>(&self, values: Vec<U>) -> QcResult<TimeSeries<U>> {
        TimeSeries::new(self.timestamps.clone(), values)
    }

    /// Whether timestamps are non-decreasing.
    pub fn is_chronological(&self) -> bool {
        self.timestamps.windows(2).all(|w| w[0] <= w[1])
    }

    /// Contiguous calendar-day buckets, using each timestamp's own offset.
    ///
    /// On a chronological series every local date appears exactly once.
    pub fn day_groups(&self) -> Vec<(NaiveDate, Range<usize>)> {
        let mut groups = Vec::new();
        let mut start = 0;
        for i in 0..=self.timestamps.len() {
            if i == self.timestamps.len()
                || (i > 0 && self.timestamps[i].date_naive() != self.timestamps[i - 1].date_naive())
            {
                if i > start {
                    groups.push((self.timestamps[start].date_naive(), start..i));
                }
                start = i;
            }
        }
        groups
    }
}

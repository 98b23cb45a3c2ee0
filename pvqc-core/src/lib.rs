//! Quality control and feature labeling for photovoltaic telemetry
//!
//! Batch algorithms for cleaning time-series data from PV power systems
//! before downstream analytics. Two subsystems carry the weight:
//!
//! - [`daytime`]: classifies every timestamp of a power or irradiance
//!   series as day or night from the signal alone, then derives per-day
//!   sunrise and sunset instants from the mask.
//! - [`shifts`]: finds abrupt level shifts in daily summary series
//!   (capacity re-rating, sensor drift) and clock shifts in daily event
//!   times (DST, logger timezone changes), both via penalized changepoint
//!   search on a preprocessed signal.
//!
//! Everything operates on complete in-memory [`TimeSeries`] batches. All
//! functions are pure: inputs are borrowed, internal copies are made, and
//! the caller's series is never mutated. Missing values are NaN and flow
//! through each algorithm as documented, never as errors.
//!
//! ```
//! use pvqc_core::daytime::{self, DaytimeConfig};
//! # use pvqc_core::{TimeSeries, Timestamp};
//! # use chrono::{Duration, FixedOffset, TimeZone};
//! # let offset = FixedOffset::east_opt(0).unwrap();
//! # let start = offset.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
//! # let timestamps: Vec<Timestamp> = (0..96 * 4).map(|i| start + Duration::minutes(15 * i)).collect();
//! # let values = timestamps
//! #     .iter()
//! #     .map(|t| {
//! #         let hour = t.time().hour() as f64 + t.time().minute() as f64 / 60.0;
//! #         if (6.0..18.0).contains(&hour) { 800.0 * (1.0 - (hour - 12.0).abs() / 6.0) } else { 0.0 }
//! #     })
//! #     .collect();
//! # use chrono::Timelike;
//! let power = TimeSeries::new(timestamps, values)?;
//! let daylight = daytime::power_or_irradiance(&power, &DaytimeConfig::default(), None, None)?;
//! assert_eq!(daylight.len(), power.len());
//! # Ok::<(), pvqc_core::QcError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod daytime;
pub mod errors;
pub mod series;
#[cfg(feature = "changepoint")]
pub mod shifts;
pub mod stats;
pub mod time;

// Public API
pub use errors::{QcError, QcResult};
pub use series::{BooleanMask, TimeSeries, Timestamp};
pub use time::{DataAlignment, Frequency};

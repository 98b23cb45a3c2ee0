//! Changepoint-based shift detection for daily PV series
//!
//! Two kinds of abrupt change matter for PV quality control:
//!
//! - **Data shifts** ([`data`]): the level of a daily summary series jumps,
//!   typically from capacity re-rating, sensor replacement, or a logger
//!   scaling change. Detected by penalized changepoint search on a
//!   filtered, normalized, optionally deseasonalized signal.
//! - **Clock shifts** ([`clock`]): the clock time of a daily event (solar
//!   noon, midday) drifts against a modeled reference, typically from DST
//!   handling or a timezone misconfiguration. Detected by exact changepoint
//!   search on the measured-minus-reference difference, then quantized to
//!   the plausible shift granularity.
//!
//! [`preprocess`] holds the shared daily-series validation and cleanup
//! that runs ahead of every search.

pub mod clock;
pub mod data;
pub mod preprocess;

pub use clock::{shifts_ruptures, ClockShiftConfig};
pub use data::{detect_data_shifts, get_longest_shift_segment_dates, DataShiftConfig};
pub use preprocess::preprocess;

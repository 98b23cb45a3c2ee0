//! Error types for the QC engine
//!
//! The split follows the severity of the condition, not where it occurs:
//!
//! 1. **Contract violations** are hard errors: misaligned masks,
//!    non-chronological or non-daily indexes, uninferrable sampling
//!    intervals, impossible parameters. These come back as [`QcError`]
//!    immediately; nothing is coerced or guessed.
//!
//! 2. **Missing data** is a value, not an error. `f64` series use NaN and
//!    every algorithm defines how NaN flows through it.
//!
//! 3. **Degenerate results** (an all-night classification, zero detected
//!    changepoints, a segment shorter than its buffers) are ordinary return
//!    values. Callers inspect results, they do not catch errors, to notice
//!    them.

use thiserror::Error;

/// Result type for QC operations.
pub type QcResult<T> = Result<T, QcError>;

/// Errors raised by the QC engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QcError {
    /// Two aligned inputs have different lengths
    #[error("aligned inputs differ in length: {expected} vs {got}")]
    LengthMismatch {
        /// Length of the primary series
        expected: usize,
        /// Length of the misaligned companion
        got: usize,
    },

    /// Timestamps are not in chronological order
    #[error("timestamps are not in chronological order")]
    NotChronological,

    /// Too few samples to infer a sampling interval
    #[error("cannot infer a sampling interval from {got} sample(s)")]
    TooFewSamples {
        /// Number of samples available
        got: usize,
    },

    /// No single inter-sample gap dominates the series
    #[error("no dominant sampling interval; supply the frequency explicitly")]
    AmbiguousFrequency,

    /// A frequency must describe a positive span of time
    #[error("sampling interval must be positive")]
    InvalidFrequency,

    /// Frequency string outside the supported vocabulary
    #[error("unrecognized frequency {0:?}; expected forms like \"15min\", \"1h\", \"1d\"")]
    UnrecognizedFrequency(String),

    /// Alignment string outside the supported vocabulary
    #[error("unrecognized alignment {0:?}; expected \"L\", \"C\" or \"R\"")]
    InvalidAlignment(String),

    /// An operation that requires daily sampling received something else
    #[error("series must be sampled daily; dominant interval is {got_minutes} minute(s)")]
    NotDailySampled {
        /// Dominant interval found, in minutes
        got_minutes: i64,
    },

    /// Custom shift detection needs both a method and a cost
    #[error("method and cost are required when use_default_models is false")]
    MissingSearchConfig,

    /// Minimum shift period longer than the series itself
    #[error("minimum segment length {period_min} exceeds the {days} overlapping day(s)")]
    PeriodTooLong {
        /// Requested minimum segment length, in days
        period_min: usize,
        /// Days available after aligning the inputs
        days: usize,
    },

    /// The changepoint search backend rejected its input
    #[cfg(feature = "changepoint")]
    #[error("changepoint search failed: {0}")]
    Search(#[from] pvqc_changepoint::SearchError),
}

//! Error types for cost fitting and breakpoint prediction
//!
//! Contract violations (bad configuration, unusable signals, predict before
//! fit) are hard errors. A signal with no detectable change is not an error;
//! it predicts as a single segment.

use thiserror::Error;

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors raised by changepoint searches.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SearchError {
    /// Fitting was attempted on an empty signal
    #[error("signal is empty")]
    EmptySignal,

    /// Signal contains NaN or infinite values; filter before fitting
    #[error("signal contains non-finite values")]
    NonFiniteSignal,

    /// Signal shorter than the search can segment
    #[error("signal has {got} samples, need at least {needed}")]
    SignalTooShort {
        /// Minimum number of samples this search requires
        needed: usize,
        /// Actual number of samples in the fitted signal
        got: usize,
    },

    /// Window width must be an even number of at least 2 samples
    #[error("window width must be an even number >= 2; got {width}")]
    InvalidWindowWidth {
        /// Rejected width
        width: usize,
    },

    /// Breakpoint grid spacing must be at least 1
    #[error("jump must be >= 1")]
    InvalidJump,

    /// Minimum segment length must be at least 1
    #[error("min_size must be >= 1")]
    InvalidMinSize,

    /// Penalty must be a finite positive number
    #[error("penalty must be finite and > 0; got {penalty}")]
    InvalidPenalty {
        /// Rejected penalty
        penalty: f64,
    },

    /// `predict` was called before a successful `fit`
    #[error("predict called before fit")]
    NotFitted,

    /// No segmentation satisfies the configured constraints
    #[error("no feasible segmentation under the configured constraints")]
    NoFeasibleSegmentation,
}

//! Offline changepoint search for 1-D telemetry signals
//!
//! Finds the indices at which the level of a numeric signal shifts abruptly.
//! All searches share the same contract:
//!
//! 1. `fit` the search to a complete in-memory signal;
//! 2. `predict` with a penalty, receiving the sorted right edges of the
//!    detected segments, always terminated by the signal length as a
//!    sentinel (`predict` on an unchanged signal returns `[n]`).
//!
//! A higher penalty means fewer breakpoints. Three search strategies are
//! provided:
//!
//! - [`SlidingWindow`]: fixed-width local discrepancy scan; cheap, suited to
//!   short signals where a global search would overfit.
//! - [`BottomUp`]: starts from a fine grid partition and merges the most
//!   similar adjacent segments; robust on long, seasonal-residual signals.
//! - [`Pelt`]: penalized exact search with candidate pruning; used when the
//!   exact breakpoint position matters down to a single sample.
//!
//! ```
//! use pvqc_changepoint::{ChangepointSearch, CostFunction, SearchStrategy};
//!
//! let mut signal = vec![0.0; 40];
//! signal.extend(std::iter::repeat(4.0).take(40));
//!
//! let mut search = SearchStrategy::Pelt { min_size: 2, jump: 1 }
//!     .searcher(CostFunction::L2)
//!     .unwrap();
//! search.fit(&signal).unwrap();
//! assert_eq!(search.predict(5.0).unwrap(), vec![40, 80]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bottomup;
pub mod cost;
pub mod errors;
pub mod pelt;
pub mod window;

pub use bottomup::{BottomUp, BottomUpConfig};
pub use cost::{sum_of_costs, CostFunction, CostL2, CostRbf, SegmentCost};
pub use errors::{SearchError, SearchResult};
pub use pelt::{Pelt, PeltConfig};
pub use window::{SlidingWindow, SlidingWindowConfig};

/// Object-safe fit/predict contract shared by every search strategy.
///
/// Implementations are stateless between `fit` calls: fitting a new signal
/// discards the previous one. `predict` before any successful `fit` is an
/// error, not a panic.
pub trait ChangepointSearch {
    /// Fit the search to a signal.
    fn fit(&mut self, signal: &[f64]) -> SearchResult<()>;

    /// Predict breakpoints for the fitted signal under `penalty`.
    ///
    /// Returns strictly increasing right-edge indices; the last element is
    /// always the signal length.
    fn predict(&self, penalty: f64) -> SearchResult<Vec<usize>>;
}

/// Search strategy selector; the factory half of the search interface.
///
/// Pairs with [`CostFunction`] to build a boxed search without the caller
/// naming concrete generic types.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Fixed-width sliding window scan.
    Window {
        /// Full window width in samples; must be even and >= 2.
        width: usize,
    },
    /// Hierarchical merge from a fine grid partition.
    BottomUp,
    /// Penalized exact search.
    Pelt {
        /// Minimum admissible segment length.
        min_size: usize,
        /// Breakpoint grid spacing; 1 considers every sample.
        jump: usize,
    },
}

impl SearchStrategy {
    /// Build a boxed search over the given cost function.
    pub fn searcher(self, cost: CostFunction) -> SearchResult<Box<dyn ChangepointSearch>> {
        match (self, cost) {
            (Self::Window { width }, CostFunction::Rbf) => {
                let config = SlidingWindowConfig {
                    width,
                    ..SlidingWindowConfig::default()
                };
                Ok(Box::new(SlidingWindow::<CostRbf>::new(config)?))
            }
            (Self::Window { width }, CostFunction::L2) => {
                let config = SlidingWindowConfig {
                    width,
                    ..SlidingWindowConfig::default()
                };
                Ok(Box::new(SlidingWindow::<CostL2>::new(config)?))
            }
            (Self::BottomUp, CostFunction::Rbf) => {
                Ok(Box::new(BottomUp::<CostRbf>::new(BottomUpConfig::default())?))
            }
            (Self::BottomUp, CostFunction::L2) => {
                Ok(Box::new(BottomUp::<CostL2>::new(BottomUpConfig::default())?))
            }
            (Self::Pelt { min_size, jump }, CostFunction::Rbf) => {
                Ok(Box::new(Pelt::<CostRbf>::new(PeltConfig { min_size, jump })?))
            }
            (Self::Pelt { min_size, jump }, CostFunction::L2) => {
                Ok(Box::new(Pelt::<CostL2>::new(PeltConfig { min_size, jump })?))
            }
        }
    }
}

pub(crate) fn validate_penalty(penalty: f64) -> SearchResult<()> {
    if !penalty.is_finite() || penalty <= 0.0 {
        return Err(SearchError::InvalidPenalty { penalty });
    }
    Ok(())
}

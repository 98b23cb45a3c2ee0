//! Bottom-up changepoint search
//!
//! Starts from the finest admissible partition (a boundary every `jump`
//! samples) and repeatedly merges the pair of adjacent segments whose merge
//! costs the least, stopping once the cheapest remaining merge would raise
//! the segmentation cost by at least the penalty. Boundaries that survive
//! are the predicted breakpoints.
//!
//! Because it only ever merges, the search can place breakpoints no more
//! precisely than the initial grid; callers that need single-sample
//! precision should use [`crate::Pelt`] instead.

use log::debug;

use crate::cost::{CostRbf, SegmentCost};
use crate::errors::{SearchError, SearchResult};
use crate::{validate_penalty, ChangepointSearch};

/// Configuration for [`BottomUp`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BottomUpConfig {
    /// Initial grid spacing; one boundary every `jump` samples.
    pub jump: usize,
    /// Minimum admissible segment length.
    pub min_size: usize,
}

impl Default for BottomUpConfig {
    fn default() -> Self {
        Self {
            jump: 5,
            min_size: 2,
        }
    }
}

impl BottomUpConfig {
    fn validate(&self) -> SearchResult<()> {
        if self.jump == 0 {
            return Err(SearchError::InvalidJump);
        }
        if self.min_size == 0 {
            return Err(SearchError::InvalidMinSize);
        }
        Ok(())
    }
}

/// Hierarchical merge search from a fine grid partition.
pub struct BottomUp<C: SegmentCost = CostRbf> {
    config: BottomUpConfig,
    fitted: Option<C>,
}

impl<C: SegmentCost> BottomUp<C> {
    /// Create a search with the given configuration.
    pub fn new(config: BottomUpConfig) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fitted: None,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &BottomUpConfig {
        &self.config
    }
}

impl<C: SegmentCost> ChangepointSearch for BottomUp<C> {
    fn fit(&mut self, signal: &[f64]) -> SearchResult<()> {
        self.fitted = Some(C::fit(signal)?);
        Ok(())
    }

    fn predict(&self, penalty: f64) -> SearchResult<Vec<usize>> {
        validate_penalty(penalty)?;
        let cost = self.fitted.as_ref().ok_or(SearchError::NotFitted)?;
        let n = cost.n_samples();

        // Grid boundaries, including both series edges.
        let mut bounds: Vec<usize> = (0..n).step_by(self.config.jump).collect();
        bounds.push(n);

        while bounds.len() > 2 {
            // Cheapest merge of two adjacent segments; leftmost wins ties.
            let mut best_pos = 0;
            let mut best_gain = f64::INFINITY;
            for pos in 1..bounds.len() - 1 {
                let (a, b, c) = (bounds[pos - 1], bounds[pos], bounds[pos + 1]);
                let gain = cost.cost(a, c) - cost.cost(a, b) - cost.cost(b, c);
                if gain < best_gain {
                    best_gain = gain;
                    best_pos = pos;
                }
            }
            if best_gain >= penalty {
                break;
            }
            bounds.remove(best_pos);
        }

        let breakpoints: Vec<usize> = bounds[1..].to_vec();
        debug!(
            "bottom-up search kept {} breakpoint(s) of a {}-cell grid",
            breakpoints.len() - 1,
            n.div_ceil(self.config.jump)
        );
        Ok(breakpoints)
    }
}

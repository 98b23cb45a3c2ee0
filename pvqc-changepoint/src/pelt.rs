//! Penalized exact changepoint search with pruning
//!
//! Dynamic program over segment right edges: `F(t)` is the best penalized
//! cost of segmenting `[0, t)`, and each step asks which previous edge `tau`
//! should start the final segment. Candidates whose partial cost already
//! exceeds the running optimum can never win again and are pruned, which
//! keeps the candidate set small on signals with clear changes.
//!
//! Ties between equally good split points go to the leftmost `tau`.

use log::debug;

use crate::cost::{CostRbf, SegmentCost};
use crate::errors::{SearchError, SearchResult};
use crate::{validate_penalty, ChangepointSearch};

/// Configuration for [`Pelt`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeltConfig {
    /// Minimum admissible segment length.
    pub min_size: usize,
    /// Breakpoint grid spacing; 1 considers every sample.
    pub jump: usize,
}

impl Default for PeltConfig {
    fn default() -> Self {
        Self {
            min_size: 2,
            jump: 1,
        }
    }
}

impl PeltConfig {
    fn validate(&self) -> SearchResult<()> {
        if self.min_size == 0 {
            return Err(SearchError::InvalidMinSize);
        }
        if self.jump == 0 {
            return Err(SearchError::InvalidJump);
        }
        Ok(())
    }
}

/// Penalized exact search.
pub struct Pelt<C: SegmentCost = CostRbf> {
    config: PeltConfig,
    fitted: Option<C>,
}

impl<C: SegmentCost> Pelt<C> {
    /// Create a search with the given configuration.
    pub fn new(config: PeltConfig) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fitted: None,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &PeltConfig {
        &self.config
    }
}

impl<C: SegmentCost> ChangepointSearch for Pelt<C> {
    fn fit(&mut self, signal: &[f64]) -> SearchResult<()> {
        let cost = C::fit(signal)?;
        if cost.n_samples() < self.config.min_size {
            return Err(SearchError::SignalTooShort {
                needed: self.config.min_size,
                got: cost.n_samples(),
            });
        }
        self.fitted = Some(cost);
        Ok(())
    }

    fn predict(&self, penalty: f64) -> SearchResult<Vec<usize>> {
        validate_penalty(penalty)?;
        let cost = self.fitted.as_ref().ok_or(SearchError::NotFitted)?;
        let n = cost.n_samples();
        let min_size = self.config.min_size;
        let jump = self.config.jump;

        // Right edges considered by the dynamic program.
        let mut targets: Vec<usize> = (jump..n).step_by(jump).collect();
        if targets.last() != Some(&n) {
            targets.push(n);
        }

        let mut best_cost = vec![f64::INFINITY; n + 1];
        let mut previous = vec![0usize; n + 1];
        best_cost[0] = -penalty;

        let mut candidates: Vec<usize> = vec![0];
        for &t in &targets {
            let mut best = f64::INFINITY;
            let mut best_tau = usize::MAX;
            for &tau in &candidates {
                if t < tau + min_size || !best_cost[tau].is_finite() {
                    continue;
                }
                let value = best_cost[tau] + cost.cost(tau, t) + penalty;
                if value < best {
                    best = value;
                    best_tau = tau;
                }
            }
            if best_tau == usize::MAX {
                continue;
            }
            best_cost[t] = best;
            previous[t] = best_tau;

            // Prune candidates that can no longer improve on the optimum.
            candidates.retain(|&tau| {
                t < tau + min_size
                    || (best_cost[tau].is_finite()
                        && best_cost[tau] + cost.cost(tau, t) <= best_cost[t])
            });
            candidates.push(t);
        }

        if !best_cost[n].is_finite() {
            return Err(SearchError::NoFeasibleSegmentation);
        }

        let mut breakpoints = Vec::new();
        let mut edge = n;
        while edge > 0 {
            breakpoints.push(edge);
            edge = previous[edge];
        }
        breakpoints.reverse();
        debug!(
            "pelt found {} breakpoint(s) over {n} samples",
            breakpoints.len() - 1
        );
        Ok(breakpoints)
    }
}

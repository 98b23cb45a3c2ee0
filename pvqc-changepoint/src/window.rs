//! Sliding-window changepoint search
//!
//! Slides a fixed-width window over the signal and scores each admissible
//! split as the cost drop from cutting the window in half at that point.
//! Local maxima of the score curve are breakpoint candidates; candidates are
//! then accepted best-first while adding them still lowers the global
//! segmentation cost by more than the penalty.
//!
//! The window score only sees `width` samples at a time, so the acceptance
//! step re-evaluates each candidate against the full signal. This keeps the
//! scan cheap while preventing a locally plausible split from surviving when
//! the surrounding segments do not support it.

use log::debug;

use crate::cost::{sum_of_costs, CostRbf, SegmentCost};
use crate::errors::{SearchError, SearchResult};
use crate::{validate_penalty, ChangepointSearch};

/// Configuration for [`SlidingWindow`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlidingWindowConfig {
    /// Full window width in samples; must be even and >= 2.
    pub width: usize,
    /// Candidate spacing; scores are evaluated every `jump` samples.
    pub jump: usize,
    /// Minimum admissible segment length.
    pub min_size: usize,
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self {
            width: 50,
            jump: 5,
            min_size: 2,
        }
    }
}

impl SlidingWindowConfig {
    fn validate(&self) -> SearchResult<()> {
        if self.width < 2 || self.width % 2 != 0 {
            return Err(SearchError::InvalidWindowWidth { width: self.width });
        }
        if self.jump == 0 {
            return Err(SearchError::InvalidJump);
        }
        if self.min_size == 0 {
            return Err(SearchError::InvalidMinSize);
        }
        Ok(())
    }

    /// Peak neighborhood, in score-curve positions.
    fn order(&self) -> usize {
        (self.width.max(2 * self.min_size) / (2 * self.jump)).max(1)
    }
}

struct FittedWindow<C> {
    cost: C,
    /// `(split index, score)` pairs in index order.
    scores: Vec<(usize, f64)>,
}

/// Fixed-width sliding-window search.
pub struct SlidingWindow<C: SegmentCost = CostRbf> {
    config: SlidingWindowConfig,
    fitted: Option<FittedWindow<C>>,
}

impl<C: SegmentCost> SlidingWindow<C> {
    /// Create a search with the given configuration.
    pub fn new(config: SlidingWindowConfig) -> SearchResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fitted: None,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &SlidingWindowConfig {
        &self.config
    }

    fn peaks(&self, fitted: &FittedWindow<C>) -> Vec<(usize, f64)> {
        let order = self.config.order();
        let scores = &fitted.scores;
        let mut peaks = Vec::new();
        for k in 0..scores.len() {
            let (idx, score) = scores[k];
            if !score.is_finite() {
                continue;
            }
            let lo = k.saturating_sub(order);
            let hi = (k + order).min(scores.len().saturating_sub(1));
            let is_peak = (lo..=hi).all(|m| m == k || scores[m].1 < score);
            if is_peak {
                peaks.push((idx, score));
            }
        }
        peaks
    }
}

impl<C: SegmentCost> ChangepointSearch for SlidingWindow<C> {
    fn fit(&mut self, signal: &[f64]) -> SearchResult<()> {
        let cost = C::fit(signal)?;
        let n = cost.n_samples();
        if n < self.config.width {
            return Err(SearchError::SignalTooShort {
                needed: self.config.width,
                got: n,
            });
        }
        let half = self.config.width / 2;
        let mut scores = Vec::new();
        let mut t = half;
        while t + half <= n {
            let score =
                cost.cost(t - half, t + half) - cost.cost(t - half, t) - cost.cost(t, t + half);
            scores.push((t, score));
            t += self.config.jump;
        }
        self.fitted = Some(FittedWindow { cost, scores });
        Ok(())
    }

    fn predict(&self, penalty: f64) -> SearchResult<Vec<usize>> {
        validate_penalty(penalty)?;
        let fitted = self.fitted.as_ref().ok_or(SearchError::NotFitted)?;
        let n = fitted.cost.n_samples();

        let mut peaks = self.peaks(fitted);
        peaks.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut breakpoints = vec![n];
        let mut current = sum_of_costs(&fitted.cost, &breakpoints);
        for (idx, _) in peaks {
            let mut candidate = breakpoints.clone();
            candidate.push(idx);
            candidate.sort_unstable();
            candidate.dedup();
            let with_peak = sum_of_costs(&fitted.cost, &candidate);
            let gain = current - with_peak;
            if gain > penalty {
                debug!("window search accepted breakpoint {idx} (gain {gain:.3})");
                breakpoints = candidate;
                current = with_peak;
            } else {
                break;
            }
        }
        Ok(breakpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostL2;

    fn two_level_signal(n_per_level: usize) -> Vec<f64> {
        let mut signal = vec![0.0; n_per_level];
        signal.extend(std::iter::repeat(1.0).take(n_per_level));
        signal
    }

    #[test]
    fn config_rejects_odd_width() {
        let config = SlidingWindowConfig {
            width: 7,
            ..SlidingWindowConfig::default()
        };
        assert_eq!(
            SlidingWindow::<CostL2>::new(config).err(),
            Some(SearchError::InvalidWindowWidth { width: 7 })
        );
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let search = SlidingWindow::<CostL2>::new(SlidingWindowConfig::default()).unwrap();
        assert_eq!(search.predict(10.0).err(), Some(SearchError::NotFitted));
    }

    #[test]
    fn short_signal_is_rejected() {
        let mut search = SlidingWindow::<CostL2>::new(SlidingWindowConfig::default()).unwrap();
        let err = search.fit(&[1.0; 20]).err().unwrap();
        assert_eq!(
            err,
            SearchError::SignalTooShort {
                needed: 50,
                got: 20
            }
        );
    }

    #[test]
    fn finds_single_step_with_rbf_cost() {
        let signal = two_level_signal(50);
        let config = SlidingWindowConfig {
            width: 20,
            jump: 5,
            min_size: 2,
        };
        let mut search = SlidingWindow::<CostRbf>::new(config).unwrap();
        search.fit(&signal).unwrap();
        assert_eq!(search.predict(10.0).unwrap(), vec![50, 100]);
    }

    #[test]
    fn constant_signal_has_only_the_sentinel() {
        let config = SlidingWindowConfig {
            width: 20,
            jump: 5,
            min_size: 2,
        };
        let mut search = SlidingWindow::<CostL2>::new(config).unwrap();
        search.fit(&[2.0; 80]).unwrap();
        assert_eq!(search.predict(1.0).unwrap(), vec![80]);
    }

    #[test]
    fn higher_penalty_never_adds_breakpoints() {
        let mut signal = two_level_signal(60);
        signal.extend(std::iter::repeat(3.0).take(60));
        let config = SlidingWindowConfig {
            width: 20,
            jump: 5,
            min_size: 2,
        };
        let mut search = SlidingWindow::<CostL2>::new(config).unwrap();
        search.fit(&signal).unwrap();
        let loose = search.predict(1.0).unwrap();
        let strict = search.predict(1e6).unwrap();
        assert!(strict.len() <= loose.len());
        assert_eq!(*strict.last().unwrap(), 180);
    }
}

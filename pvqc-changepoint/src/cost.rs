//! Segment cost models
//!
//! A cost model is fitted once per signal and then queried for the cost of
//! arbitrary half-open segments `[start, end)`. Searches compare the cost of
//! a segment against the summed cost of its sub-segments; a large drop means
//! the segment is better described in two pieces.
//!
//! Both models answer segment queries in O(1) from prefix tables built at
//! fit time. [`CostRbf`] stores a prefix table over the full Gram matrix, so
//! its memory grows quadratically with the signal length; it is meant for
//! daily-resolution series, not raw minute data.

use crate::errors::{SearchError, SearchResult};

/// Cost model selector used by the search factory.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostFunction {
    /// Gaussian-kernel cost; sensitive to level and distribution shifts.
    Rbf,
    /// Mean-shift cost (within-segment sum of squared deviations).
    L2,
}

/// Per-segment cost over one fitted signal.
pub trait SegmentCost: Sized {
    /// Fit the model to a signal. Rejects empty or non-finite input.
    fn fit(signal: &[f64]) -> SearchResult<Self>;

    /// Number of samples in the fitted signal.
    fn n_samples(&self) -> usize;

    /// Cost of the half-open segment `[start, end)`.
    ///
    /// Callers guarantee `start < end <= n_samples()`.
    fn cost(&self, start: usize, end: usize) -> f64;
}

/// Total cost of a segmentation given as sorted right edges ending at the
/// signal length.
pub fn sum_of_costs<C: SegmentCost>(cost: &C, breakpoints: &[usize]) -> f64 {
    let mut total = 0.0;
    let mut start = 0;
    for &end in breakpoints {
        if end > start {
            total += cost.cost(start, end);
        }
        start = end;
    }
    total
}

fn validate_signal(signal: &[f64]) -> SearchResult<()> {
    if signal.is_empty() {
        return Err(SearchError::EmptySignal);
    }
    if signal.iter().any(|v| !v.is_finite()) {
        return Err(SearchError::NonFiniteSignal);
    }
    Ok(())
}

/// Gaussian (RBF) kernel cost.
///
/// `cost(a, b) = (b - a) - (1 / (b - a)) * sum over i, j in [a, b) of
/// k(x_i, x_j)` with `k(x, y) = exp(-gamma * (x - y)^2)`.
///
/// The bandwidth `gamma` is the reciprocal of the median pairwise squared
/// distance of the fitted signal (the lower median for an even pair count),
/// falling back to 1.0 when the median is zero, as on constant signals.
pub struct CostRbf {
    n: usize,
    gamma: f64,
    stride: usize,
    /// Inclusive 2-D prefix sums of the Gram matrix, `(n + 1) x (n + 1)`.
    prefix: Vec<f64>,
}

impl CostRbf {
    /// Fitted kernel bandwidth.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl SegmentCost for CostRbf {
    fn fit(signal: &[f64]) -> SearchResult<Self> {
        validate_signal(signal)?;
        let n = signal.len();
        let gamma = median_bandwidth(signal);
        let stride = n + 1;
        let mut prefix = vec![0.0; stride * stride];
        for i in 0..n {
            for j in 0..n {
                let d = signal[i] - signal[j];
                let k = (-gamma * d * d).exp();
                prefix[(i + 1) * stride + (j + 1)] = k + prefix[i * stride + (j + 1)]
                    + prefix[(i + 1) * stride + j]
                    - prefix[i * stride + j];
            }
        }
        Ok(Self {
            n,
            gamma,
            stride,
            prefix,
        })
    }

    fn n_samples(&self) -> usize {
        self.n
    }

    fn cost(&self, start: usize, end: usize) -> f64 {
        debug_assert!(start < end && end <= self.n);
        let len = (end - start) as f64;
        let sum = self.prefix[end * self.stride + end]
            - self.prefix[start * self.stride + end]
            - self.prefix[end * self.stride + start]
            + self.prefix[start * self.stride + start];
        len - sum / len
    }
}

/// Median of the pairwise squared distances, as the RBF bandwidth heuristic.
fn median_bandwidth(signal: &[f64]) -> f64 {
    let n = signal.len();
    if n < 2 {
        return 1.0;
    }
    let mut dists = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = signal[i] - signal[j];
            dists.push(d * d);
        }
    }
    let mid = (dists.len() - 1) / 2;
    let (_, median, _) = dists.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let median = *median;
    if median > 0.0 {
        1.0 / median
    } else {
        1.0
    }
}

/// Mean-shift cost: the within-segment sum of squared deviations.
pub struct CostL2 {
    n: usize,
    /// Prefix sums of values, length `n + 1`.
    sums: Vec<f64>,
    /// Prefix sums of squared values, length `n + 1`.
    sq_sums: Vec<f64>,
}

impl SegmentCost for CostL2 {
    fn fit(signal: &[f64]) -> SearchResult<Self> {
        validate_signal(signal)?;
        let n = signal.len();
        let mut sums = Vec::with_capacity(n + 1);
        let mut sq_sums = Vec::with_capacity(n + 1);
        sums.push(0.0);
        sq_sums.push(0.0);
        for &v in signal {
            sums.push(sums[sums.len() - 1] + v);
            sq_sums.push(sq_sums[sq_sums.len() - 1] + v * v);
        }
        Ok(Self { n, sums, sq_sums })
    }

    fn n_samples(&self) -> usize {
        self.n
    }

    fn cost(&self, start: usize, end: usize) -> f64 {
        debug_assert!(start < end && end <= self.n);
        let len = (end - start) as f64;
        let total = self.sums[end] - self.sums[start];
        let sq_total = self.sq_sums[end] - self.sq_sums[start];
        sq_total - total * total / len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_signal(level_len: usize) -> Vec<f64> {
        let mut signal = vec![0.0; level_len];
        signal.extend(std::iter::repeat(1.0).take(level_len));
        signal
    }

    #[test]
    fn rejects_empty_and_non_finite() {
        assert!(matches!(CostL2::fit(&[]), Err(SearchError::EmptySignal)));
        assert!(matches!(
            CostL2::fit(&[1.0, f64::NAN]),
            Err(SearchError::NonFiniteSignal)
        ));
        assert!(matches!(
            CostRbf::fit(&[1.0, f64::INFINITY]),
            Err(SearchError::NonFiniteSignal)
        ));
    }

    #[test]
    fn l2_matches_naive_sum_of_squares() {
        let signal = [1.0, 2.0, 4.0, 8.0, 16.0, 3.0];
        let cost = CostL2::fit(&signal).unwrap();
        for start in 0..signal.len() {
            for end in (start + 1)..=signal.len() {
                let seg = &signal[start..end];
                let mean = seg.iter().sum::<f64>() / seg.len() as f64;
                let naive: f64 = seg.iter().map(|v| (v - mean) * (v - mean)).sum();
                assert!((cost.cost(start, end) - naive).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn constant_segment_costs_nothing() {
        let signal = [3.5; 10];
        let l2 = CostL2::fit(&signal).unwrap();
        let rbf = CostRbf::fit(&signal).unwrap();
        assert!(l2.cost(0, 10).abs() < 1e-9);
        assert!(rbf.cost(2, 8).abs() < 1e-9);
    }

    #[test]
    fn rbf_gamma_falls_back_on_constant_signal() {
        let rbf = CostRbf::fit(&[7.0; 5]).unwrap();
        assert_eq!(rbf.gamma(), 1.0);
    }

    #[test]
    fn rbf_prefix_matches_naive_kernel_sum() {
        let signal = [0.0, 0.5, 1.0, -1.0, 2.0, 0.25];
        let rbf = CostRbf::fit(&signal).unwrap();
        let gamma = rbf.gamma();
        for start in 0..signal.len() {
            for end in (start + 1)..=signal.len() {
                let len = (end - start) as f64;
                let mut sum = 0.0;
                for i in start..end {
                    for j in start..end {
                        let d = signal[i] - signal[j];
                        sum += (-gamma * d * d).exp();
                    }
                }
                let naive = len - sum / len;
                assert!((rbf.cost(start, end) - naive).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn splitting_at_the_step_removes_all_cost() {
        let signal = step_signal(20);
        let l2 = CostL2::fit(&signal).unwrap();
        let merged = sum_of_costs(&l2, &[40]);
        let split = sum_of_costs(&l2, &[20, 40]);
        assert!(merged > 5.0);
        assert!(split.abs() < 1e-9);
    }
}

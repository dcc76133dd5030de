//! Pattern Space — exponential-family algebra over binary activation patterns.
//!
//! Purpose
//! -------
//! Represent the log-linear (maximum-entropy) model over the 2^N joint
//! activation patterns of N channels, restricted to interactions of order at
//! most O. A [`PatternSpace`] owns the pattern table and the eta map and turns
//! any natural-parameter vector θ into the quantities the estimator needs.
//!
//! Key behaviors
//! -------------
//! - [`PatternSpace::build`] validates `(N, O)` and constructs the pattern
//!   enumeration and the `D × 2^N` eta map once.
//! - [`PatternSpace::log_partition`] evaluates ψ(θ) = log Σ_i exp(θ·eta_i)
//!   with a max-shifted log-sum-exp.
//! - [`PatternSpace::probabilities`], [`PatternSpace::gradient`] and
//!   [`PatternSpace::fisher_information`] give p(θ), η(θ) = ∂ψ/∂θ and
//!   G(θ) = ∂²ψ/∂θ∂θᵀ; [`PatternSpace::moments`] returns all of them from a
//!   single pass over the patterns.
//!
//! Invariants & assumptions
//! ------------------------
//! - `1 <= order <= n <= MAX_CHANNELS`, `dim = Σ_{k=1..order} C(n, k)`.
//! - Every θ-consuming method checks `θ.len() == dim` and reports
//!   [`SSError::DimensionMismatch`] otherwise.
//! - The value is immutable after construction and therefore `Send + Sync`;
//!   it can be shared across concurrent analyses with the same `(N, O)`.
//!
//! Conventions
//! -----------
//! - Rows of the eta map follow [`interaction_subsets`]; columns follow
//!   [`enumerate`]. Entry `(k, i)` is 1 iff every channel of subset `k` is
//!   active in pattern `i`.
//! - Natural logarithms throughout.
use crate::{
    errors::{SSError, SSResult},
    numerics::linalg::log_sum_exp,
    patterns::combinatorics::{
        dimension, enumerate, interaction_subsets, pattern_index, validate_shape,
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// PatternSpace — pattern table and eta map for a fixed `(N, O)`.
///
/// Fields
/// ------
/// - `n`: number of channels N.
/// - `order`: maximal interaction order O.
/// - `dim`: number of natural parameters D.
/// - `patterns`: `2^N × N` binary table, row `i` = binary expansion of `i`.
/// - `subsets`: the D channel subsets indexing the natural parameters.
/// - `eta_map`: `D × 2^N` sufficient-statistic matrix.
///
/// Performance
/// -----------
/// - Construction is O(D · 2^N). Each θ evaluation is one `2^N × D`
///   matrix–vector product; the Fisher information adds one
///   `D × 2^N × D` product.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternSpace {
    n: usize,
    order: usize,
    dim: usize,
    patterns: Array2<u8>,
    subsets: Vec<Vec<usize>>,
    eta_map: Array2<f64>,
}

/// Moments — log-partition and its first two derivatives at one θ.
#[derive(Debug, Clone, PartialEq)]
pub struct Moments {
    /// ψ(θ).
    pub log_partition: f64,
    /// η(θ) = E_θ[eta], length D.
    pub gradient: Array1<f64>,
    /// G(θ) = Cov_θ[eta], D × D.
    pub fisher: Array2<f64>,
}

impl PatternSpace {
    /// Build the pattern table and eta map for `n` channels and interactions
    /// up to `order`.
    ///
    /// Errors
    /// ------
    /// - `SSError::InvalidChannelCount` when `n == 0` or `n > MAX_CHANNELS`.
    /// - `SSError::InvalidOrder` when `order == 0` or `order > n`.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ssasc::patterns::PatternSpace;
    /// let space = PatternSpace::build(3, 2).unwrap();
    /// assert_eq!(space.dim(), 6);
    /// assert_eq!(space.n_patterns(), 8);
    /// ```
    pub fn build(n: usize, order: usize) -> SSResult<Self> {
        validate_shape(n, order)?;
        let dim = dimension(n, order);
        let patterns = enumerate(n);
        let subsets = interaction_subsets(n, order);
        let eta_map = Array2::from_shape_fn((dim, patterns.nrows()), |(k, i)| {
            if subsets[k].iter().all(|&channel| patterns[[i, channel]] == 1) { 1.0 } else { 0.0 }
        });
        Ok(PatternSpace { n, order, dim, patterns, subsets, eta_map })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of natural parameters D.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of patterns, 2^N.
    pub fn n_patterns(&self) -> usize {
        self.patterns.nrows()
    }

    pub fn patterns(&self) -> ArrayView2<'_, u8> {
        self.patterns.view()
    }

    pub fn subsets(&self) -> &[Vec<usize>] {
        &self.subsets
    }

    /// The `D × 2^N` sufficient-statistic matrix.
    pub fn eta_map(&self) -> ArrayView2<'_, f64> {
        self.eta_map.view()
    }

    /// Eta column for a single binary pattern given channel by channel.
    pub fn eta_of(&self, pattern: ArrayView1<'_, u8>) -> SSResult<ArrayView1<'_, f64>> {
        if pattern.len() != self.n {
            return Err(SSError::DimensionMismatch {
                what: "pattern channels",
                expected: self.n,
                actual: pattern.len(),
            });
        }
        Ok(self.eta_map.column(pattern_index(pattern)))
    }

    /// Check that `theta` has length D.
    pub fn check_theta(&self, theta: ArrayView1<'_, f64>) -> SSResult<()> {
        if theta.len() != self.dim {
            return Err(SSError::DimensionMismatch {
                what: "theta",
                expected: self.dim,
                actual: theta.len(),
            });
        }
        Ok(())
    }

    /// ψ(θ) = log Σ_i exp(θ·eta_i).
    pub fn log_partition(&self, theta: ArrayView1<'_, f64>) -> SSResult<f64> {
        self.check_theta(theta)?;
        Ok(log_sum_exp(self.potentials(theta).view()))
    }

    /// p_i = exp(θ·eta_i − ψ(θ)) for every pattern, in pattern order.
    pub fn probabilities(&self, theta: ArrayView1<'_, f64>) -> SSResult<Array1<f64>> {
        self.check_theta(theta)?;
        let (_, p) = self.normalized(theta);
        Ok(p)
    }

    /// η(θ) = Σ_i p_i eta_i, the expected sufficient statistics.
    pub fn gradient(&self, theta: ArrayView1<'_, f64>) -> SSResult<Array1<f64>> {
        self.check_theta(theta)?;
        let (_, p) = self.normalized(theta);
        Ok(self.eta_map.dot(&p))
    }

    /// G(θ) = Σ_i p_i eta_i eta_iᵀ − η ηᵀ, the covariance of the sufficient
    /// statistics.
    pub fn fisher_information(&self, theta: ArrayView1<'_, f64>) -> SSResult<Array2<f64>> {
        Ok(self.moments(theta)?.fisher)
    }

    /// ψ(θ), η(θ) and G(θ) from a single probability evaluation.
    pub fn moments(&self, theta: ArrayView1<'_, f64>) -> SSResult<Moments> {
        self.check_theta(theta)?;
        let (log_partition, p) = self.normalized(theta);
        let gradient = self.eta_map.dot(&p);
        let weighted = &self.eta_map * &p.view().insert_axis(Axis(0));
        let mut fisher = weighted.dot(&self.eta_map.t());
        let col = gradient.view().insert_axis(Axis(1));
        let row = gradient.view().insert_axis(Axis(0));
        fisher -= &col.dot(&row);
        Ok(Moments { log_partition, gradient, fisher })
    }

    /// Pattern probabilities for every row of a `T × D` parameter sequence,
    /// returned as a `T × 2^N` matrix.
    pub fn probability_matrix(&self, theta_seq: ArrayView2<'_, f64>) -> SSResult<Array2<f64>> {
        if theta_seq.ncols() != self.dim {
            return Err(SSError::DimensionMismatch {
                what: "theta sequence columns",
                expected: self.dim,
                actual: theta_seq.ncols(),
            });
        }
        let mut out = Array2::<f64>::zeros((theta_seq.nrows(), self.n_patterns()));
        for (theta, mut row) in theta_seq.rows().into_iter().zip(out.rows_mut()) {
            let (_, p) = self.normalized(theta);
            row.assign(&p);
        }
        Ok(out)
    }

    /// Unnormalized log-probabilities θ·eta_i for all patterns.
    pub(crate) fn potentials(&self, theta: ArrayView1<'_, f64>) -> Array1<f64> {
        self.eta_map.t().dot(&theta)
    }

    // ---- Helper Methods ----

    fn normalized(&self, theta: ArrayView1<'_, f64>) -> (f64, Array1<f64>) {
        let potentials = self.potentials(theta);
        let psi = log_sum_exp(potentials.view());
        (psi, potentials.mapv(|v| (v - psi).exp()))
    }
}

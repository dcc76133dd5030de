//! numerics::linalg — dense symmetric linear algebra for the Kalman recursions.
//!
//! Purpose
//! -------
//! Bridge `ndarray` storage and `nalgebra` factorizations for the small dense
//! symmetric matrices that appear in the filter, smoother and M-step:
//! predicted/filtered covariances, posterior precisions and the transition
//! noise covariance.
//!
//! Key behaviors
//! -------------
//! - Copy between `ndarray::Array2` and `nalgebra::DMatrix` ([`to_dmatrix`],
//!   [`from_dmatrix`]).
//! - Factor symmetric positive-definite matrices once via Cholesky
//!   ([`SpdFactor`]) and reuse the factor for inverses, solves and
//!   log-determinants.
//! - Measure conditioning through a symmetric eigendecomposition
//!   ([`condition_number`]).
//! - Provide a max-shifted [`log_sum_exp`] for log-partition evaluation.
//!
//! Invariants & assumptions
//! ------------------------
//! - Matrices handed to [`SpdFactor::new`] are square; only their lower
//!   triangle is read by the factorization, so callers symmetrize first.
//! - A failed factorization (`None`) means "not numerically positive-definite"
//!   and is mapped to a domain error by the caller.
//!
//! Conventions
//! -----------
//! - No explicit inverse is formed through Gaussian elimination; inverses come
//!   from the Cholesky factor.
//! - Pure functions: no I/O, no logging, no global state.
use crate::numerics::constants::EIGEN_EPS;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Copy an `ndarray` matrix into a freshly allocated `DMatrix`.
pub fn to_dmatrix(a: ArrayView2<'_, f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Copy a `DMatrix` back into `ndarray` storage.
pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Replace `a` by `(a + aᵀ) / 2` in place.
///
/// Panics if `a` is not square (programming error).
pub fn symmetrize(a: &mut Array2<f64>) {
    let n = a.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let mean = 0.5 * (a[[i, j]] + a[[j, i]]);
            a[[i, j]] = mean;
            a[[j, i]] = mean;
        }
    }
}

/// SpdFactor — Cholesky factor of a symmetric positive-definite matrix.
///
/// Purpose
/// -------
/// Factor a covariance or precision matrix once and reuse the factor for the
/// inverse, linear solves, and the log-determinant needed by the approximate
/// marginal likelihood.
///
/// Invariants
/// ----------
/// - Construction succeeds only when every pivot is strictly positive, so the
///   wrapped matrix is numerically positive-definite.
#[derive(Debug, Clone)]
pub struct SpdFactor {
    chol: Cholesky<f64, Dyn>,
}

impl SpdFactor {
    /// Factor `a`; returns `None` if `a` is not positive-definite or contains
    /// non-finite entries.
    pub fn new(a: ArrayView2<'_, f64>) -> Option<Self> {
        if a.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let chol = Cholesky::new(to_dmatrix(a))?;
        if chol.l_dirty().diagonal().iter().any(|l| !(l.is_finite() && *l > 0.0)) {
            return None;
        }
        Some(SpdFactor { chol })
    }

    /// Dense inverse `A⁻¹`, symmetrized.
    pub fn inverse(&self) -> Array2<f64> {
        let mut inv = from_dmatrix(&self.chol.inverse());
        symmetrize(&mut inv);
        inv
    }

    /// Solve `A x = b`.
    pub fn solve(&self, b: ArrayView1<'_, f64>) -> Array1<f64> {
        let rhs = DVector::from_iterator(b.len(), b.iter().copied());
        let x = self.chol.solve(&rhs);
        Array1::from_iter(x.iter().copied())
    }

    /// `log |A|` from the Cholesky diagonal: `2 Σ log L_ii`.
    pub fn log_det(&self) -> f64 {
        2.0 * self.chol.l_dirty().diagonal().iter().map(|l| l.ln()).sum::<f64>()
    }
}

/// Inverse of a symmetric positive-definite matrix, or `None` if it is not
/// positive-definite.
pub fn spd_inverse(a: ArrayView2<'_, f64>) -> Option<Array2<f64>> {
    SpdFactor::new(a).map(|factor| factor.inverse())
}

/// condition_number — spectral condition number of a symmetric matrix.
///
/// Returns `λ_max / λ_min` from a symmetric eigendecomposition, or
/// `f64::INFINITY` when the smallest eigenvalue is at most
/// [`EIGEN_EPS`]·max(1, λ_max) or any eigenvalue is non-finite. The caller
/// decides what counts as ill-conditioned.
pub fn condition_number(a: ArrayView2<'_, f64>) -> f64 {
    if a.iter().any(|v| !v.is_finite()) {
        return f64::INFINITY;
    }
    let eigen = to_dmatrix(a).symmetric_eigen();
    let (min, max) = eigen
        .eigenvalues
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !min.is_finite() || !max.is_finite() || min <= EIGEN_EPS * max.max(1.0) {
        return f64::INFINITY;
    }
    max / min
}

/// Numerically stable `log Σ exp(x_i)`: shift by the maximum before summing.
///
/// Returns `-∞` for an empty input.
pub fn log_sum_exp(x: ArrayView1<'_, f64>) -> f64 {
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + x.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Cholesky-based inverse, solve and log-determinant on small SPD inputs.
    // - Rejection of indefinite / non-finite matrices.
    // - Condition numbers and log-sum-exp stability.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check the inverse and log-determinant of a 2×2 SPD matrix against the
    // closed form.
    //
    // Given
    // -----
    // - A = [[4, 1], [1, 3]], |A| = 11.
    //
    // Expect
    // ------
    // - A·A⁻¹ = I and log|A| = ln 11.
    fn spd_factor_inverse_and_log_det_match_closed_form() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let factor = SpdFactor::new(a.view()).expect("A is SPD");
        let inv = factor.inverse();
        let eye = a.dot(&inv);

        assert_relative_eq!(eye[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(eye[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(eye[[1, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(factor.log_det(), 11.0_f64.ln(), epsilon = 1e-12);

        let x = factor.solve(array![1.0, 2.0].view());
        let back = a.dot(&x);
        assert_relative_eq!(back[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(back[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Ensure indefinite and non-finite inputs are rejected.
    fn spd_factor_rejects_indefinite_and_non_finite() {
        let indefinite = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(SpdFactor::new(indefinite.view()).is_none());

        let non_finite = array![[1.0, 0.0], [0.0, f64::NAN]];
        assert!(SpdFactor::new(non_finite.view()).is_none());
    }

    #[test]
    // Purpose
    // -------
    // Verify condition numbers for a well-conditioned diagonal matrix and
    // infinity for a singular one.
    fn condition_number_diagonal_and_singular() {
        let diag = array![[2.0, 0.0], [0.0, 0.5]];
        assert_relative_eq!(condition_number(diag.view()), 4.0, epsilon = 1e-10);

        let singular = array![[1.0, 1.0], [1.0, 1.0]];
        assert!(condition_number(singular.view()).is_infinite());
    }

    #[test]
    // Purpose
    // -------
    // Confirm log-sum-exp does not overflow for large exponents and agrees with
    // the naive formula where the latter is safe.
    fn log_sum_exp_is_stable() {
        let big = array![1000.0, 1000.0];
        assert_relative_eq!(log_sum_exp(big.view()), 1000.0 + 2.0_f64.ln(), epsilon = 1e-12);

        let small = array![0.1, -0.3, 0.7];
        let naive = small.iter().map(|v: &f64| v.exp()).sum::<f64>().ln();
        assert_relative_eq!(log_sum_exp(small.view()), naive, epsilon = 1e-12);
    }

    #[test]
    fn symmetrize_averages_off_diagonal() {
        let mut a = array![[1.0, 2.0], [4.0, 3.0]];
        symmetrize(&mut a);
        assert_eq!(a, array![[1.0, 3.0], [3.0, 3.0]]);
    }
}

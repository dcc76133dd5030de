//! Per-timestep Kullback–Leibler divergence between two parameter sequences.
//!
//! For a reference sequence p (e.g. the generating parameters) and an
//! estimate q, both `T × D` in the natural parameterization of one
//! [`PatternSpace`], computes
//!
//! `KL_t = Σ_i q_i(t) (log q_i(t) − log p_i(t))`
//!
//! over all `2^N` patterns, in nats. The log-probabilities come straight from
//! the eta map and the log-partition, so no probability is exponentiated and
//! re-logged. A sequence compared against itself gives exactly 0.
use crate::{
    errors::{SSError, SSResult},
    numerics::linalg::log_sum_exp,
    patterns::space::PatternSpace,
};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// kl_divergence — `KL(q_t ‖ p_t)` for every timestep.
///
/// Errors
/// ------
/// - `SSError::DimensionMismatch` when the sequences disagree in length or
///   their column count is not `space.dim()`.
pub fn kl_divergence(
    space: &PatternSpace, p_theta: ArrayView2<'_, f64>, q_theta: ArrayView2<'_, f64>,
) -> SSResult<Array1<f64>> {
    for columns in [p_theta.ncols(), q_theta.ncols()] {
        if columns != space.dim() {
            return Err(SSError::DimensionMismatch {
                what: "theta sequence columns",
                expected: space.dim(),
                actual: columns,
            });
        }
    }
    if p_theta.nrows() != q_theta.nrows() {
        return Err(SSError::DimensionMismatch {
            what: "theta sequence timesteps",
            expected: p_theta.nrows(),
            actual: q_theta.nrows(),
        });
    }
    Ok(p_theta
        .rows()
        .into_iter()
        .zip(q_theta.rows())
        .map(|(p, q)| divergence_at(space, p, q))
        .collect())
}

fn divergence_at(space: &PatternSpace, p: ArrayView1<'_, f64>, q: ArrayView1<'_, f64>) -> f64 {
    let log_p = log_probabilities(space, p);
    let log_q = log_probabilities(space, q);
    log_q.iter().zip(log_p.iter()).map(|(&lq, &lp)| lq.exp() * (lq - lp)).sum()
}

fn log_probabilities(space: &PatternSpace, theta: ArrayView1<'_, f64>) -> Array1<f64> {
    let potentials = space.potentials(theta);
    let psi = log_sum_exp(potentials.view());
    potentials - psi
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Self-divergence, a closed-form Bernoulli case, non-negativity, and shape
    // checks.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A sequence compared with itself has zero divergence at every t.
    fn self_divergence_is_exactly_zero() {
        let space = PatternSpace::build(3, 2).unwrap();
        let theta = Array2::from_shape_fn((10, 6), |(t, k)| -2.0 + 0.1 * t as f64 - 0.3 * k as f64);
        let kl = kl_divergence(&space, theta.view(), theta.view()).unwrap();
        assert!(kl.iter().all(|&v| v == 0.0));
    }

    #[test]
    // Purpose
    // -------
    // N = 1 reduces to the Bernoulli divergence with q as the first argument.
    //
    // Given
    // -----
    // - p = σ(−3), q = σ(−2).
    //
    // Expect
    // ------
    // - KL = q ln(q/p) + (1 − q) ln((1 − q)/(1 − p)).
    fn bernoulli_closed_form() {
        let space = PatternSpace::build(1, 1).unwrap();
        let kl = kl_divergence(&space, array![[-3.0]].view(), array![[-2.0]].view()).unwrap();
        let sigmoid = |x: f64| 1.0 / (1.0 + (-x).exp());
        let (p, q) = (sigmoid(-3.0), sigmoid(-2.0));
        let expected = q * (q / p).ln() + (1.0 - q) * ((1.0 - q) / (1.0 - p)).ln();
        assert_relative_eq!(kl[0], expected, epsilon = 1e-14);
    }

    #[test]
    fn divergence_is_non_negative() {
        let space = PatternSpace::build(2, 2).unwrap();
        let p = array![[-3.0, -3.0, -1.0], [0.5, -0.5, 0.0]];
        let q = array![[-2.5, -3.5, 0.0], [0.0, 0.0, 0.0]];
        let kl = kl_divergence(&space, p.view(), q.view()).unwrap();
        assert!(kl.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn shapes_are_checked() {
        let space = PatternSpace::build(2, 1).unwrap();
        let p = Array2::<f64>::zeros((4, 2));
        let q = Array2::<f64>::zeros((3, 2));
        assert_eq!(
            kl_divergence(&space, p.view(), q.view()).unwrap_err(),
            SSError::DimensionMismatch { what: "theta sequence timesteps", expected: 4, actual: 3 }
        );
        let wide = Array2::<f64>::zeros((4, 3));
        assert_eq!(
            kl_divergence(&space, p.view(), wide.view()).unwrap_err(),
            SSError::DimensionMismatch { what: "theta sequence columns", expected: 2, actual: 3 }
        );
    }
}

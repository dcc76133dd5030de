//! numerics — dense linear algebra and shared tolerances.
//!
//! Purpose
//! -------
//! Collect the numerical building blocks the estimator relies on: Cholesky
//! factors of symmetric positive-definite matrices, conditioning checks,
//! symmetrization, and a stable log-sum-exp. Tolerances live in
//! [`constants`] so every layer shares the same thresholds.
//!
//! Conventions
//! -----------
//! - Storage is `ndarray` everywhere; `nalgebra` is used only inside
//!   [`linalg`] for factorizations and eigendecompositions.
//! - Helpers return `Option` on numerical failure; mapping to
//!   [`SSError`](crate::errors::SSError) happens at the call site, where the
//!   timestep and iterate are known.

pub mod constants;
pub mod linalg;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::constants::{COND_MAX, EIGEN_EPS, MAX_CHANNELS, PROBABILITY_TOL};
pub use self::linalg::{
    SpdFactor, condition_number, from_dmatrix, log_sum_exp, spd_inverse, symmetrize, to_dmatrix,
};

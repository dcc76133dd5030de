//! Shared numerical tolerances.
//!
//! Centralizes the small constants used by the linear-algebra helpers, the
//! M-step conditioning check and the probability validation in synthesis, so
//! the estimator and its collaborators agree on what "degenerate" means.

/// Eigenvalues at or below `EIGEN_EPS · max(1, λ_max)` are treated as zero.
pub const EIGEN_EPS: f64 = 1e-14;

/// Largest spectral condition number accepted for a transition covariance.
pub const COND_MAX: f64 = 1e12;

/// Tolerance on `|Σ p_i − 1|` when validating externally supplied
/// pattern-probability rows.
pub const PROBABILITY_TOL: f64 = 1e-8;

/// Largest channel count for which the 2^N pattern table is built.
pub const MAX_CHANNELS: usize = 20;

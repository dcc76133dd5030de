//! Errors for state-space spike-correlation analysis (configuration checks,
//! dimension agreement, numerical divergence, and M-step degeneracy).
//!
//! This module defines the crate error type, [`SSError`], and a coarse
//! classification, [`ErrorKind`], used by callers that only care about which
//! class of failure occurred. `SSError` implements `Display`/`Error` and, with
//! the `python-bindings` feature, converts to `PyErr`.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy). Spike indices are reported as
//!   `(trial, t, channel)`.
//! - Configuration and dimension errors are raised before any numeric work.
//! - Numerical divergence carries the last parameter vector, the Fisher-scoring
//!   sub-iteration and the timestep at which it happened.
//! - M-step degeneracy is only an error after repeated consecutive occurrences;
//!   single occurrences are warnings recorded on the result.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Crate-wide result alias for operations that may produce [`SSError`].
pub type SSResult<T> = Result<T, SSError>;

/// Failure class of an [`SSError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    DimensionMismatch,
    NumericalDivergence,
    Degeneracy,
}

/// Unified error type for pattern-space construction, aggregation, and EM
/// estimation.
#[derive(Debug, Clone, PartialEq)]
pub enum SSError {
    // ---- Configuration ----
    /// Channel count must be at least 1 and small enough to enumerate 2^N patterns.
    InvalidChannelCount { n: usize, max: usize },

    /// Interaction order must satisfy 1 <= order <= n.
    InvalidOrder { order: usize, n: usize },

    /// Spike tensor has a zero-length axis.
    EmptySpikes { trials: usize, timesteps: usize, channels: usize },

    /// A spike entry is not 0 or 1.
    NonBinarySpike { trial: usize, t: usize, channel: usize, value: f64 },

    /// Estimation needs at least two timesteps to observe a transition.
    TooFewTimesteps { timesteps: usize, min: usize },

    /// A tolerance must be finite and > 0.
    InvalidTolerance { name: &'static str, value: f64 },

    /// An iteration cap must be >= 1.
    InvalidIterationCap { name: &'static str, value: usize },

    /// A covariance scale must be finite and > 0.
    InvalidScale { name: &'static str, value: f64 },

    /// A user-supplied matrix must be square, finite and symmetric positive-definite.
    InvalidCovariance { name: &'static str, reason: &'static str },

    /// Probability matrix row does not describe a distribution over patterns.
    InvalidProbabilities { t: usize, reason: &'static str },

    /// An option given by name (e.g. from Python) is not recognized.
    UnknownOption { name: String, reason: &'static str },

    // ---- Dimension agreement ----
    /// A vector or matrix length disagrees with the active dimension.
    DimensionMismatch { what: &'static str, expected: usize, actual: usize },

    // ---- Numerical divergence ----
    /// Fisher scoring failed at a timestep; carries the last iterate.
    NumericalDivergence { t: usize, iteration: usize, theta: Vec<f64>, reason: &'static str },

    // ---- M-step degeneracy ----
    /// The transition covariance update was degenerate too many times in a row.
    DegenerateTransition { consecutive: usize, em_iteration: usize },
}

impl SSError {
    /// Classify this error into one of the four failure kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SSError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            SSError::NumericalDivergence { .. } => ErrorKind::NumericalDivergence,
            SSError::DegenerateTransition { .. } => ErrorKind::Degeneracy,
            _ => ErrorKind::Configuration,
        }
    }
}

impl std::error::Error for SSError {}

impl std::fmt::Display for SSError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            SSError::InvalidChannelCount { n, max } => {
                write!(f, "Channel count must satisfy 1 <= N <= {max}; got: {n}")
            }
            SSError::InvalidOrder { order, n } => {
                write!(f, "Interaction order must satisfy 1 <= O <= N ({n}); got: {order}")
            }
            SSError::EmptySpikes { trials, timesteps, channels } => {
                write!(
                    f,
                    "Spike tensor must be non-empty; got shape ({trials}, {timesteps}, {channels})"
                )
            }
            SSError::NonBinarySpike { trial, t, channel, value } => {
                write!(
                    f,
                    "Spike at (trial {trial}, t {t}, channel {channel}) is not binary: {value}"
                )
            }
            SSError::TooFewTimesteps { timesteps, min } => {
                write!(f, "Estimation needs at least {min} timesteps; got: {timesteps}")
            }
            SSError::InvalidTolerance { name, value } => {
                write!(f, "Tolerance {name} must be finite and > 0; got: {value}")
            }
            SSError::InvalidIterationCap { name, value } => {
                write!(f, "Iteration cap {name} must be >= 1; got: {value}")
            }
            SSError::InvalidScale { name, value } => {
                write!(f, "Scale {name} must be finite and > 0; got: {value}")
            }
            SSError::InvalidCovariance { name, reason } => {
                write!(f, "Covariance {name} is invalid: {reason}")
            }
            SSError::InvalidProbabilities { t, reason } => {
                write!(f, "Pattern probabilities at t {t} are invalid: {reason}")
            }
            SSError::UnknownOption { name, reason } => {
                write!(f, "Unknown option '{name}': {reason}")
            }
            // ---- Dimension agreement ----
            SSError::DimensionMismatch { what, expected, actual } => {
                write!(f, "Dimension mismatch for {what}: expected {expected}, got {actual}")
            }
            // ---- Numerical divergence ----
            SSError::NumericalDivergence { t, iteration, theta, reason } => {
                write!(
                    f,
                    "Fisher scoring diverged at t {t} (sub-iteration {iteration}): {reason}; last theta = {theta:?}"
                )
            }
            // ---- M-step degeneracy ----
            SSError::DegenerateTransition { consecutive, em_iteration } => {
                write!(
                    f,
                    "Transition covariance update degenerate for {consecutive} consecutive EM iterations (at iteration {em_iteration})"
                )
            }
        }
    }
}

/// Convert an [`SSError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<SSError> for PyErr {
    fn from(err: SSError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the kind classification and a few `Display` payloads.
    // Construction sites of each variant are tested in their own modules.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that every variant maps onto the documented failure kind.
    //
    // Expect
    // ------
    // - Configuration variants classify as `Configuration`.
    // - Dimension, divergence and degeneracy classify as themselves.
    fn kind_classifies_variants() {
        assert_eq!(SSError::InvalidOrder { order: 3, n: 2 }.kind(), ErrorKind::Configuration);
        assert_eq!(
            SSError::NonBinarySpike { trial: 0, t: 1, channel: 2, value: 2.0 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            SSError::DimensionMismatch { what: "theta", expected: 3, actual: 2 }.kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(
            SSError::NumericalDivergence {
                t: 4,
                iteration: 9,
                theta: vec![0.0],
                reason: "sub-iteration cap exceeded"
            }
            .kind(),
            ErrorKind::NumericalDivergence
        );
        assert_eq!(
            SSError::DegenerateTransition { consecutive: 4, em_iteration: 7 }.kind(),
            ErrorKind::Degeneracy
        );
    }

    #[test]
    // Purpose
    // -------
    // Ensure diagnostic context reaches the rendered message.
    //
    // Given
    // -----
    // - A divergence error at t = 12, sub-iteration 3.
    //
    // Expect
    // ------
    // - The message names the timestep, the sub-iteration and the reason.
    fn display_includes_divergence_context() {
        let err = SSError::NumericalDivergence {
            t: 12,
            iteration: 3,
            theta: vec![-3.0, 0.5],
            reason: "precision matrix is not positive-definite",
        };
        let msg = err.to_string();
        assert!(msg.contains("t 12"));
        assert!(msg.contains("sub-iteration 3"));
        assert!(msg.contains("not positive-definite"));
    }
}

//! M-step — closed-form update of the transition covariance F.
//!
//! Purpose
//! -------
//! Maximize the expected complete-data log likelihood over F given the
//! smoothed moments:
//!
//! `F_new = (1/T) Σ_{t=1}^{T−1} [ΔΔᵀ + Σ_{t|T} + Σ_{t−1|T} − C_t − C_tᵀ]`,
//!
//! with `Δ = θ_{t|T} − θ_{t−1|T}` and `C_t = Σ_{t,t−1|T}`, then symmetrize
//! and project onto the configured [`TransitionStructure`].
//!
//! Key behaviors
//! -------------
//! - A candidate that is non-finite, not positive-definite, or has a spectral
//!   condition number above [`COND_MAX`] is reported as
//!   [`TransitionUpdate::Degenerate`]; the EM loop keeps the previous F.
//! - [`update_prior`] returns the smoothed t = 0 moments for callers that
//!   re-estimate the initial state.
use crate::{
    estimation::{options::TransitionStructure, smoother::SmootherOutput},
    numerics::{
        constants::COND_MAX,
        linalg::{SpdFactor, condition_number, symmetrize},
    },
};
use ndarray::{Array1, Array2, Axis};
use std::fmt;

/// Outcome of one transition-covariance update.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionUpdate {
    Accepted(Array2<f64>),
    Degenerate(Degeneracy),
}

/// Why a candidate F was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    NonFinite,
    NotPositiveDefinite,
    IllConditioned,
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degeneracy::NonFinite => write!(f, "transition covariance has non-finite entries"),
            Degeneracy::NotPositiveDefinite => {
                write!(f, "transition covariance is not positive-definite")
            }
            Degeneracy::IllConditioned => {
                write!(f, "transition covariance condition number exceeds {COND_MAX:e}")
            }
        }
    }
}

/// Unconstrained, symmetrized sufficient-statistic average defining F_new.
pub fn expected_transition(smoothed: &SmootherOutput) -> Array2<f64> {
    let t_len = smoothed.timesteps();
    let d = smoothed.theta_s.ncols();
    let mut acc = Array2::<f64>::zeros((d, d));
    for t in 1..t_len {
        let delta = &smoothed.theta_s.row(t) - &smoothed.theta_s.row(t - 1);
        let col = delta.view().insert_axis(Axis(1));
        let row = delta.view().insert_axis(Axis(0));
        acc += &col.dot(&row);
        acc += &smoothed.sigma_at(t);
        acc += &smoothed.sigma_at(t - 1);
        let cross = smoothed.lag_one_at(t);
        acc -= &cross;
        acc -= &cross.t();
    }
    acc /= t_len as f64;
    symmetrize(&mut acc);
    acc
}

/// Project a symmetric matrix onto the requested structure.
pub fn apply_structure(f: Array2<f64>, structure: TransitionStructure) -> Array2<f64> {
    match structure {
        TransitionStructure::Full => f,
        TransitionStructure::Diagonal => Array2::from_diag(&f.diag()),
        TransitionStructure::Isotropic => {
            let d = f.nrows();
            let level = f.diag().sum() / d as f64;
            Array2::eye(d) * level
        }
    }
}

/// Classify a candidate F; `None` means it is usable.
pub fn check_transition(f: &Array2<f64>) -> Option<Degeneracy> {
    if f.iter().any(|v| !v.is_finite()) {
        return Some(Degeneracy::NonFinite);
    }
    if SpdFactor::new(f.view()).is_none() {
        return Some(Degeneracy::NotPositiveDefinite);
    }
    if condition_number(f.view()) > COND_MAX {
        return Some(Degeneracy::IllConditioned);
    }
    None
}

/// update_transition — full M-step for F.
pub fn update_transition(smoothed: &SmootherOutput, structure: TransitionStructure) -> TransitionUpdate {
    let candidate = apply_structure(expected_transition(smoothed), structure);
    match check_transition(&candidate) {
        None => TransitionUpdate::Accepted(candidate),
        Some(reason) => TransitionUpdate::Degenerate(reason),
    }
}

/// Smoothed moments at t = 0, used as the next prior when the initial state
/// is re-estimated.
pub fn update_prior(smoothed: &SmootherOutput) -> (Array1<f64>, Array2<f64>) {
    (smoothed.theta_s.row(0).to_owned(), smoothed.sigma_at(0).to_owned())
}

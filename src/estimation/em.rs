//! EM loop — alternate the Fisher-scoring filter/smoother with the F update.
//!
//! Purpose
//! -------
//! Drive expectation–maximization for the random-walk log-linear model until
//! the configured criterion stops changing or the iteration cap is reached.
//!
//! Key behaviors
//! -------------
//! - Each iteration runs [`filter`], [`smooth`] and [`update_transition`], in
//!   that order, then evaluates the stopping rule.
//! - A degenerate F candidate keeps the previous F, is recorded as an
//!   [`EMWarning`] and logged with `tracing::warn!`. More than
//!   `max_degenerate` consecutive degenerate iterations abort with
//!   [`SSError::DegenerateTransition`]. An iteration with a degenerate update
//!   never counts as converged.
//! - The E-step is a deterministic function of `(F, θ₀, Σ₀)`. After a
//!   degenerate update without a prior update none of them changed, so the
//!   next iteration reuses the previous E-step instead of recomputing it and
//!   reaches the same degenerate candidate; escalation costs no extra passes.
//! - With `update_prior`, the smoothed t = 0 moments become the next prior.
//!
//! Conventions
//! -----------
//! - Iterations are counted from 1. The returned smoothed moments come from
//!   the last E-step; the returned F is the one after the last M-step.
//! - Relative changes are `|new − old| / max(|old|, f64::MIN_POSITIVE)`.
//! - One `tracing::debug!` event per iteration, one `tracing::info!` on exit.
use crate::{
    errors::{SSError, SSResult},
    estimation::{
        filter::filter,
        mstep::{Degeneracy, TransitionUpdate, update_prior, update_transition},
        options::{ConvergenceCriterion, EMOptions},
        smoother::{SmootherOutput, smooth},
    },
    observations::aggregate::Observations,
    patterns::space::PatternSpace,
};
use ndarray::{Array2, Array3};
use std::fmt;

/// A recovered M-step degeneracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EMWarning {
    /// EM iteration (1-based) whose update was rejected.
    pub iteration: usize,
    pub reason: Degeneracy,
}

impl fmt::Display for EMWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EM iteration {}: {}; previous transition covariance kept", self.iteration, self.reason)
    }
}

/// EMOutcome — everything the EM loop produces.
#[derive(Debug, Clone, PartialEq)]
pub struct EMOutcome {
    pub theta_s: Array2<f64>,
    pub sigma_s: Array3<f64>,
    pub transition: Array2<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Approximate log marginal likelihood of each E-step, in order.
    pub log_marginal_trace: Vec<f64>,
    pub warnings: Vec<EMWarning>,
}

/// fit — run EM on aggregated observations.
///
/// Errors
/// ------
/// - `SSError::DimensionMismatch` if the prior does not match `space.dim()`.
/// - `SSError::NumericalDivergence` propagated from the filter.
/// - `SSError::DegenerateTransition` after too many consecutive degenerate
///   M-steps.
pub fn fit(space: &PatternSpace, obs: &Observations, opts: &EMOptions) -> SSResult<EMOutcome> {
    let d = space.dim();
    let (mut theta0, mut sigma0) = opts.prior.resolve(d)?;
    let mut transition = Array2::<f64>::eye(d) * opts.initial_transition_scale;
    let mut trace: Vec<f64> = Vec::with_capacity(opts.max_iter);
    let mut warnings = Vec::new();
    let mut consecutive = 0usize;
    let mut converged = false;
    let mut iterations = 0usize;
    let mut smoothed: Option<SmootherOutput> = None;
    let mut unchanged: Option<(f64, SmootherOutput)> = None;

    for iteration in 1..=opts.max_iter {
        let (log_marginal, current) = match unchanged.take() {
            Some(reused) => reused,
            None => {
                let filtered =
                    filter(space, obs, transition.view(), theta0.view(), sigma0.view(), &opts.fisher)?;
                (filtered.log_marginal, smooth(&filtered))
            }
        };

        let previous = transition.clone();
        let accepted = match update_transition(&current, opts.structure) {
            TransitionUpdate::Accepted(next) => {
                transition = next;
                consecutive = 0;
                true
            }
            TransitionUpdate::Degenerate(reason) => {
                consecutive += 1;
                tracing::warn!(iteration, consecutive, %reason, "degenerate transition update");
                warnings.push(EMWarning { iteration, reason });
                if consecutive > opts.max_degenerate {
                    return Err(SSError::DegenerateTransition { consecutive, em_iteration: iteration });
                }
                false
            }
        };
        if opts.update_prior {
            (theta0, sigma0) = update_prior(&current);
        } else if !accepted {
            unchanged = Some((log_marginal, current.clone()));
        }

        let change = match opts.criterion {
            ConvergenceCriterion::LogMarginal => {
                trace.last().map(|&old| relative_change(log_marginal, old))
            }
            ConvergenceCriterion::TransitionCovariance => {
                Some(frobenius(&(&transition - &previous)) / frobenius(&previous).max(f64::MIN_POSITIVE))
            }
        };
        trace.push(log_marginal);
        iterations = iteration;
        smoothed = Some(current);
        tracing::debug!(iteration, log_marginal, change = ?change, accepted, "EM iteration");

        if accepted && change.is_some_and(|c| c < opts.tol) {
            converged = true;
            break;
        }
    }

    let smoothed = smoothed.ok_or(SSError::InvalidIterationCap { name: "em.max_iter", value: 0 })?;
    tracing::info!(
        iterations,
        converged,
        log_marginal = trace.last().copied(),
        warnings = warnings.len(),
        "EM finished"
    );
    Ok(EMOutcome {
        theta_s: smoothed.theta_s,
        sigma_s: smoothed.sigma_s,
        transition,
        iterations,
        converged,
        log_marginal_trace: trace,
        warnings,
    })
}

// ---- Helper Methods ----

fn relative_change(new: f64, old: f64) -> f64 {
    (new - old).abs() / old.abs().max(f64::MIN_POSITIVE)
}

fn frobenius(a: &Array2<f64>) -> f64 {
    a.iter().map(|v| v * v).sum::<f64>().sqrt()
}

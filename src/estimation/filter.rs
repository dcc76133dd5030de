//! Forward pass — Fisher-scoring Kalman filter for the log-linear state.
//!
//! Purpose
//! -------
//! Propagate the Gaussian approximation of `p(θ_t | y_0..y_t)` forward in time
//! under the random-walk transition `θ_{t+1} = θ_t + w_t`, `w_t ~ N(0, F)`,
//! with the exponential-family observation model of a [`PatternSpace`].
//!
//! Key behaviors
//! -------------
//! - Prediction: `θ_{t|t−1} = θ_{t−1|t−1}`, `Σ_{t|t−1} = Σ_{t−1|t−1} + F`;
//!   t = 0 uses the prior `(θ₀, Σ₀)` directly.
//! - Update: the filtered mean maximizes the log posterior
//!   `R(y_t·θ − ψ(θ)) − ½(θ − θ_{t|t−1})ᵀ Σ_{t|t−1}⁻¹ (θ − θ_{t|t−1})`,
//!   reached by damped Fisher scoring; the filtered covariance is the inverse
//!   posterior precision `(Σ_{t|t−1}⁻¹ + R·G(θ_{t|t}))⁻¹`.
//! - Accumulates the Laplace approximation of the log marginal likelihood
//!   of the observations, used as the default EM convergence criterion.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Observations` were aggregated through the same `PatternSpace`, so
//!   `y.ncols() == space.dim()`; the prior and `F` are `D`-dimensional.
//! - Every covariance produced here is symmetrized before it is stored.
//!
//! Conventions
//! -----------
//! - Failures carry the timestep, the Fisher-scoring sub-iteration and the
//!   last iterate in [`SSError::NumericalDivergence`].
//! - The multinomial normalizing constant of the observations does not depend
//!   on θ or F and is omitted from the log marginal likelihood.
use crate::{
    errors::{SSError, SSResult},
    estimation::options::FisherScoringOptions,
    numerics::linalg::{SpdFactor, symmetrize},
    observations::aggregate::Observations,
    patterns::space::PatternSpace,
};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};

/// FilterOutput — predicted and filtered moments for every timestep.
///
/// Fields
/// ------
/// - `theta_pred`, `sigma_pred`: `T × D` means and `T × D × D` covariances of
///   the one-step predictions.
/// - `precision_pred`: inverses of `sigma_pred`, reused by the smoother gain.
/// - `theta_filt`, `sigma_filt`: filtered means and covariances.
/// - `log_marginal`: Laplace-approximated `log p(y_0..y_{T−1})` up to a
///   θ-independent constant.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutput {
    pub theta_pred: Array2<f64>,
    pub sigma_pred: Array3<f64>,
    pub precision_pred: Array3<f64>,
    pub theta_filt: Array2<f64>,
    pub sigma_filt: Array3<f64>,
    pub log_marginal: f64,
}

impl FilterOutput {
    pub fn timesteps(&self) -> usize {
        self.theta_filt.nrows()
    }
}

/// Posterior at one timestep after Fisher scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedState {
    pub theta: Array1<f64>,
    pub sigma: Array2<f64>,
    /// Sub-iterations used.
    pub iterations: usize,
    /// `R(y·θ − ψ(θ)) − ½(θ − θ_pred)ᵀ P (θ − θ_pred)` at the returned θ.
    pub log_posterior: f64,
    /// `log |Σ_pred⁻¹ + R·G(θ)|` at the returned θ.
    pub log_det_precision: f64,
}

/// filter — run the forward pass over all timesteps.
///
/// Parameters
/// ----------
/// - `space`: pattern space the observations were aggregated with.
/// - `obs`: `T × D` observation sequence and trial count R.
/// - `transition`: `D × D` transition covariance F.
/// - `theta0`, `sigma0`: prior mean and covariance of the state at t = 0.
/// - `opts`: Fisher-scoring controls.
///
/// Errors
/// ------
/// - `SSError::DimensionMismatch` when the inputs disagree with `space.dim()`.
/// - `SSError::NumericalDivergence` when a predicted covariance or posterior
///   precision is not positive-definite, or Fisher scoring fails to converge.
pub fn filter(
    space: &PatternSpace, obs: &Observations, transition: ArrayView2<'_, f64>,
    theta0: ArrayView1<'_, f64>, sigma0: ArrayView2<'_, f64>, opts: &FisherScoringOptions,
) -> SSResult<FilterOutput> {
    let d = space.dim();
    check_square("transition covariance", transition, d)?;
    check_square("prior covariance", sigma0, d)?;
    space.check_theta(theta0)?;
    if obs.dim() != d {
        return Err(SSError::DimensionMismatch {
            what: "observation columns",
            expected: d,
            actual: obs.dim(),
        });
    }

    let t_len = obs.timesteps();
    let trials = obs.trials() as f64;
    let mut out = FilterOutput {
        theta_pred: Array2::zeros((t_len, d)),
        sigma_pred: Array3::zeros((t_len, d, d)),
        precision_pred: Array3::zeros((t_len, d, d)),
        theta_filt: Array2::zeros((t_len, d)),
        sigma_filt: Array3::zeros((t_len, d, d)),
        log_marginal: 0.0,
    };

    for t in 0..t_len {
        let (theta_pred, mut sigma_pred) = if t == 0 {
            (theta0.to_owned(), sigma0.to_owned())
        } else {
            let sigma = &out.sigma_filt.index_axis(Axis(0), t - 1) + &transition;
            (out.theta_filt.row(t - 1).to_owned(), sigma)
        };
        symmetrize(&mut sigma_pred);
        let pred_factor = SpdFactor::new(sigma_pred.view()).ok_or_else(|| {
            divergence(t, 0, theta_pred.view(), "predicted covariance is not positive-definite")
        })?;
        let precision_pred = pred_factor.inverse();

        let state = fisher_scoring(
            space,
            obs.at(t),
            trials,
            theta_pred.view(),
            precision_pred.view(),
            opts,
            t,
        )?;
        out.log_marginal +=
            state.log_posterior - 0.5 * state.log_det_precision - 0.5 * pred_factor.log_det();

        out.theta_pred.row_mut(t).assign(&theta_pred);
        out.sigma_pred.index_axis_mut(Axis(0), t).assign(&sigma_pred);
        out.precision_pred.index_axis_mut(Axis(0), t).assign(&precision_pred);
        out.theta_filt.row_mut(t).assign(&state.theta);
        out.sigma_filt.index_axis_mut(Axis(0), t).assign(&state.sigma);
    }
    Ok(out)
}

/// fisher_scoring — posterior mode and covariance at a single timestep.
///
/// Newton iteration on the concave log posterior with Fisher-information
/// curvature:
/// `δ = (P + R·G(θ))⁻¹ [R(y − η(θ)) − P(θ − θ_pred)]`, where `P = Σ_pred⁻¹`.
/// The full step is taken when it does not decrease the log posterior
/// (up to round-off); otherwise it is halved up to
/// `opts.max_damped_retries` times. Iteration stops once `max|δ| < opts.tol`;
/// the fixed point satisfies `θ = θ_pred + Σ_pred·R·(y − η(θ))`.
///
/// Errors
/// ------
/// - `SSError::NumericalDivergence` when the posterior precision is not
///   positive-definite, a step is non-finite, the damped retries are
///   exhausted, or `opts.max_iter` sub-iterations pass without convergence.
pub fn fisher_scoring(
    space: &PatternSpace, y: ArrayView1<'_, f64>, trials: f64, theta_pred: ArrayView1<'_, f64>,
    precision_pred: ArrayView2<'_, f64>, opts: &FisherScoringOptions, t: usize,
) -> SSResult<UpdatedState> {
    let mut theta = theta_pred.to_owned();
    for iteration in 0..opts.max_iter {
        let moments = space.moments(theta.view())?;
        let offset = &theta - &theta_pred;
        let current = trials * (y.dot(&theta) - moments.log_partition)
            - 0.5 * offset.dot(&precision_pred.dot(&offset));

        let factor = posterior_precision(precision_pred, &moments.fisher, trials)
            .ok_or_else(|| {
                divergence(t, iteration, theta.view(), "posterior precision is not positive-definite")
            })?;
        let score = (&y - &moments.gradient) * trials - precision_pred.dot(&offset);
        let step = factor.solve(score.view());
        let max_step = step.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if !max_step.is_finite() {
            return Err(divergence(t, iteration, theta.view(), "Fisher-scoring step is not finite"));
        }

        if max_step < opts.tol {
            theta += &step;
            return finish(space, y, trials, theta_pred, precision_pred, theta, iteration + 1, t);
        }

        let slack = 1e-10 * (1.0 + current.abs());
        let mut scale = 1.0;
        let mut accepted = None;
        for _ in 0..=opts.max_damped_retries {
            let candidate = &theta + &(&step * scale);
            let value = log_posterior(space, y, trials, theta_pred, precision_pred, candidate.view())?;
            if value.is_finite() && value >= current - slack {
                accepted = Some(candidate);
                break;
            }
            scale *= 0.5;
        }
        theta = accepted.ok_or_else(|| {
            divergence(t, iteration, theta.view(), "damped step retries exhausted")
        })?;
    }
    Err(divergence(t, opts.max_iter, theta.view(), "sub-iteration cap exceeded"))
}

// ---- Helper Methods ----

#[allow(clippy::too_many_arguments)]
fn finish(
    space: &PatternSpace, y: ArrayView1<'_, f64>, trials: f64, theta_pred: ArrayView1<'_, f64>,
    precision_pred: ArrayView2<'_, f64>, theta: Array1<f64>, iterations: usize, t: usize,
) -> SSResult<UpdatedState> {
    let moments = space.moments(theta.view())?;
    let factor = posterior_precision(precision_pred, &moments.fisher, trials).ok_or_else(|| {
        divergence(t, iterations, theta.view(), "posterior precision is not positive-definite")
    })?;
    let offset = &theta - &theta_pred;
    let log_posterior = trials * (y.dot(&theta) - moments.log_partition)
        - 0.5 * offset.dot(&precision_pred.dot(&offset));
    Ok(UpdatedState {
        sigma: factor.inverse(),
        log_det_precision: factor.log_det(),
        theta,
        iterations,
        log_posterior,
    })
}

fn log_posterior(
    space: &PatternSpace, y: ArrayView1<'_, f64>, trials: f64, theta_pred: ArrayView1<'_, f64>,
    precision_pred: ArrayView2<'_, f64>, theta: ArrayView1<'_, f64>,
) -> SSResult<f64> {
    let offset = &theta - &theta_pred;
    Ok(trials * (y.dot(&theta) - space.log_partition(theta)?)
        - 0.5 * offset.dot(&precision_pred.dot(&offset)))
}

fn posterior_precision(
    precision_pred: ArrayView2<'_, f64>, fisher: &Array2<f64>, trials: f64,
) -> Option<SpdFactor> {
    let mut h = &precision_pred + &(fisher * trials);
    symmetrize(&mut h);
    SpdFactor::new(h.view())
}

fn divergence(t: usize, iteration: usize, theta: ArrayView1<'_, f64>, reason: &'static str) -> SSError {
    SSError::NumericalDivergence { t, iteration, theta: theta.to_vec(), reason }
}

fn check_square(what: &'static str, a: ArrayView2<'_, f64>, d: usize) -> SSResult<()> {
    if a.nrows() != d || a.ncols() != d {
        let actual = if a.nrows() != d { a.nrows() } else { a.ncols() };
        return Err(SSError::DimensionMismatch { what, expected: d, actual });
    }
    Ok(())
}

//! Driver — one call from a spike tensor to a smoothed parameter sequence.
//!
//! Purpose
//! -------
//! Validate the raw inputs, derive `(N, T, D)`, obtain the pattern space,
//! aggregate observations, run EM, and package an immutable
//! [`EstimationResult`].
//!
//! Key behaviors
//! -------------
//! - [`run`] uses default [`EMOptions`]; [`run_with_options`] takes explicit
//!   options; [`run_with_cache`] reuses a shared [`PatternSpaceCache`].
//! - All configuration and dimension checks (order range, T ≥ 2, prior length
//!   against D) happen before any numerical work.
//!
//! Invariants & assumptions
//! ------------------------
//! - `SpikeTrains` already guarantees a non-empty binary tensor.
//! - A result is produced once per call and never mutated afterwards.
use crate::{
    errors::{SSError, SSResult},
    estimation::{
        em::{EMWarning, fit},
        options::EMOptions,
    },
    observations::{aggregate::aggregate, spikes::SpikeTrains},
    patterns::{cache::PatternSpaceCache, combinatorics::validate_shape, space::PatternSpace},
};
use ndarray::{Array2, Array3, ArrayView2, Axis};

/// Smallest number of timesteps with at least one transition.
pub const MIN_TIMESTEPS: usize = 2;

/// EstimationMeta — dimensions and EM bookkeeping of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationMeta {
    /// Channels N.
    pub n: usize,
    /// Timesteps T.
    pub t: usize,
    /// Natural parameters D.
    pub d: usize,
    /// Interaction order O.
    pub order: usize,
    /// Trials R.
    pub trials: usize,
    pub iterations: usize,
    pub converged: bool,
    /// Final transition covariance F (`D × D`).
    pub transition: Array2<f64>,
}

/// EstimationResult — smoothed states, their covariances, and the inputs
/// that produced them.
///
/// Fields
/// ------
/// - `theta_s`: `T × D` smoothed means.
/// - `sigma_s`: `T × D × D` smoothed covariances (symmetric).
/// - `y`: `T × D` empirical observations.
/// - `meta`: dimensions, iteration count, converged flag, final F.
/// - `log_marginal_trace`: approximate log marginal likelihood per EM
///   iteration.
/// - `warnings`: M-step degeneracies recovered during the run.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationResult {
    pub theta_s: Array2<f64>,
    pub sigma_s: Array3<f64>,
    pub y: Array2<f64>,
    pub meta: EstimationMeta,
    pub log_marginal_trace: Vec<f64>,
    pub warnings: Vec<EMWarning>,
}

impl EstimationResult {
    /// `T × D` marginal posterior standard deviations, `sqrt(diag Σ_s[t])`.
    ///
    /// Negative round-off on a diagonal is clamped to zero.
    pub fn standard_errors(&self) -> Array2<f64> {
        let (t_len, d, _) = self.sigma_s.dim();
        Array2::from_shape_fn((t_len, d), |(t, i)| self.sigma_s[[t, i, i]].max(0.0).sqrt())
    }

    /// Smoothed covariance at timestep `t`.
    pub fn sigma_at(&self, t: usize) -> ArrayView2<'_, f64> {
        self.sigma_s.index_axis(Axis(0), t)
    }
}

/// run — estimate with default options.
///
/// Errors
/// ------
/// - Configuration: `InvalidOrder` (O = 0 or O > N), `InvalidChannelCount`,
///   `TooFewTimesteps`.
/// - `NumericalDivergence`, `DegenerateTransition` from EM.
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::Array3;
/// # use ssasc::estimation::driver::run;
/// # use ssasc::observations::SpikeTrains;
/// let data = Array3::from_shape_fn((20, 30, 2), |(r, t, n)| ((r * 7 + t * 3 + n) % 9 == 0) as u8);
/// let spikes = SpikeTrains::new(data).unwrap();
/// let result = run(&spikes, 1).unwrap();
/// assert_eq!(result.theta_s.dim(), (30, 2));
/// assert_eq!(result.meta.d, 2);
/// ```
pub fn run(spikes: &SpikeTrains, order: usize) -> SSResult<EstimationResult> {
    run_with_options(spikes, order, &EMOptions::default())
}

/// run_with_options — estimate with explicit EM options; builds a fresh
/// pattern space.
pub fn run_with_options(
    spikes: &SpikeTrains, order: usize, opts: &EMOptions,
) -> SSResult<EstimationResult> {
    validate_inputs(spikes, order, opts)?;
    let space = PatternSpace::build(spikes.channels(), order)?;
    estimate(&space, spikes, order, opts)
}

/// run_with_cache — like [`run_with_options`] but takes the pattern space
/// from a shared cache.
pub fn run_with_cache(
    cache: &PatternSpaceCache, spikes: &SpikeTrains, order: usize, opts: &EMOptions,
) -> SSResult<EstimationResult> {
    validate_inputs(spikes, order, opts)?;
    let space = cache.get_or_build(spikes.channels(), order)?;
    estimate(&space, spikes, order, opts)
}

// ---- Helper Methods ----

fn validate_inputs(spikes: &SpikeTrains, order: usize, opts: &EMOptions) -> SSResult<()> {
    let n = spikes.channels();
    validate_shape(n, order)?;
    if spikes.timesteps() < MIN_TIMESTEPS {
        return Err(SSError::TooFewTimesteps { timesteps: spikes.timesteps(), min: MIN_TIMESTEPS });
    }
    opts.prior.resolve(crate::patterns::dimension(n, order))?;
    Ok(())
}

fn estimate(
    space: &PatternSpace, spikes: &SpikeTrains, order: usize, opts: &EMOptions,
) -> SSResult<EstimationResult> {
    let obs = aggregate(spikes, space)?;
    tracing::debug!(
        n = space.n(),
        order,
        d = space.dim(),
        t = obs.timesteps(),
        trials = obs.trials(),
        "starting estimation"
    );
    let outcome = fit(space, &obs, opts)?;
    let meta = EstimationMeta {
        n: space.n(),
        t: obs.timesteps(),
        d: space.dim(),
        order,
        trials: obs.trials(),
        iterations: outcome.iterations,
        converged: outcome.converged,
        transition: outcome.transition,
    };
    Ok(EstimationResult {
        theta_s: outcome.theta_s,
        sigma_s: outcome.sigma_s,
        y: obs.into_inner(),
        meta,
        log_marginal_trace: outcome.log_marginal_trace,
        warnings: outcome.warnings,
    })
}

//! ssasc — state-space analysis of time-varying spike correlations.
//!
//! Purpose
//! -------
//! Estimate how interactions among N binary channels (spike trains) evolve
//! over discretized time. Joint activity at each timestep follows a
//! log-linear model over all `2^N` patterns, restricted to interactions of
//! order at most O; the natural parameters drift as a Gaussian random walk.
//! EM alternates a Fisher-scoring filter/smoother with a closed-form update
//! of the random-walk covariance and returns smoothed parameters with
//! uncertainty.
//!
//! Key behaviors
//! -------------
//! - [`patterns`]: pattern enumeration, eta map, log-partition and its
//!   derivatives; a keyed cache of pattern spaces.
//! - [`observations`]: validated spike tensors and their aggregation into
//!   per-timestep sufficient statistics.
//! - [`estimation`]: filter, smoother, M-step, EM loop and the driver
//!   ([`estimation::run`]).
//! - [`diagnostics`]: seeded spike synthesis and per-timestep KL divergence
//!   for validation against known ground truth.
//! - With the `python-bindings` feature, a `_ssasc` extension module exposes
//!   the driver and diagnostics to Python.
//!
//! Invariants & assumptions
//! ------------------------
//! - D = Σ_{k=1..O} C(N, k) is fixed per `(N, O)` and every θ, y and
//!   covariance agrees with it; mismatches are reported, never coerced.
//! - Pattern spaces are immutable values passed explicitly; there is no
//!   global state.
//!
//! Conventions
//! -----------
//! - Spike tensors are `(trials, timesteps, channels)`; channel 0 is the most
//!   significant bit of a pattern index.
//! - Errors are [`errors::SSError`] internally and become `ValueError` at the
//!   PyO3 boundary.
//! - Logging goes through `tracing`; the library installs no subscriber.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; end-to-end scenarios on synthetic
//!   spikes live under `tests/`.

pub mod diagnostics;
pub mod errors;
pub mod estimation;
pub mod numerics;
pub mod observations;
pub mod patterns;
pub mod utils;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyArray2, PyArray3};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    diagnostics::{generate_spikes, kl_divergence},
    estimation::{EstimationResult, run_with_options},
    patterns::PatternSpace,
    utils::{extract_em_options, extract_f64_matrix, extract_spike_trains},
};

/// StateSpaceAnalysis — Python-facing wrapper around one estimation run.
///
/// Purpose
/// -------
/// Validate a Python spike array, run EM with the requested options, and
/// expose the result as NumPy arrays.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `StateSpaceAnalysis(spikes, order, max_iter=None, tol=None, criterion=None,
/// structure=None, initial_transition_scale=None, prior=None,
/// update_prior=None, max_degenerate=None, fisher=None)`:
/// - `spikes`: 3-D array-like `(trials, timesteps, channels)` of 0/1.
/// - `order`: interaction order O, `1 <= O <= N`.
/// - `prior`: optional `(mean, variance)` for an isotropic prior.
/// - `fisher`: optional `(tol, max_iter, max_damped_retries)`.
/// - remaining keywords map onto [`estimation::EMOptions`].
///
/// Notes
/// -----
/// - Native Rust code should call [`estimation::run_with_options`] directly.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "ssasc.estimation")]
pub struct StateSpaceAnalysis {
    inner: EstimationResult,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl StateSpaceAnalysis {
    #[new]
    #[pyo3(signature = (
        spikes, order, max_iter = None, tol = None, criterion = None, structure = None,
        initial_transition_scale = None, prior = None, update_prior = None,
        max_degenerate = None, fisher = None
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn new<'py>(
        py: Python<'py>, spikes: &Bound<'py, PyAny>, order: usize, max_iter: Option<usize>,
        tol: Option<f64>, criterion: Option<&str>, structure: Option<&str>,
        initial_transition_scale: Option<f64>, prior: Option<(f64, f64)>,
        update_prior: Option<bool>, max_degenerate: Option<usize>,
        fisher: Option<(f64, usize, usize)>,
    ) -> PyResult<StateSpaceAnalysis> {
        let spikes = extract_spike_trains(spikes)?;
        let opts = extract_em_options(
            max_iter,
            tol,
            criterion,
            structure,
            initial_transition_scale,
            prior,
            update_prior,
            max_degenerate,
            fisher,
        )?;
        let inner = py.allow_threads(|| run_with_options(&spikes, order, &opts))?;
        Ok(StateSpaceAnalysis { inner })
    }

    /// Smoothed means, `T × D`.
    #[getter]
    pub fn theta_s<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.theta_s.clone().into_pyarray(py)
    }

    /// Smoothed covariances, `T × D × D`.
    #[getter]
    pub fn sigma_s<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray3<f64>> {
        self.inner.sigma_s.clone().into_pyarray(py)
    }

    /// Empirical observations, `T × D`.
    #[getter]
    pub fn y<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.y.clone().into_pyarray(py)
    }

    /// sqrt(diag Σ_s[t]), `T × D`.
    #[getter]
    pub fn standard_errors<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.standard_errors().into_pyarray(py)
    }

    /// Final transition covariance F, `D × D`.
    #[getter]
    pub fn transition<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.meta.transition.clone().into_pyarray(py)
    }

    #[getter]
    pub fn log_marginal_trace<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.log_marginal_trace.clone().into_pyarray(py)
    }

    #[getter]
    pub fn warnings(&self) -> Vec<String> {
        self.inner.warnings.iter().map(ToString::to_string).collect()
    }

    #[getter(N)]
    pub fn n(&self) -> usize {
        self.inner.meta.n
    }

    #[getter(T)]
    pub fn t(&self) -> usize {
        self.inner.meta.t
    }

    #[getter(D)]
    pub fn d(&self) -> usize {
        self.inner.meta.d
    }

    #[getter]
    pub fn order(&self) -> usize {
        self.inner.meta.order
    }

    #[getter]
    pub fn trials(&self) -> usize {
        self.inner.meta.trials
    }

    #[getter]
    pub fn iterations(&self) -> usize {
        self.inner.meta.iterations
    }

    #[getter]
    pub fn converged(&self) -> bool {
        self.inner.meta.converged
    }
}

/// Draw a `(trials, T, N)` uint8 spike array from a `T × 2^N` matrix of
/// pattern probabilities.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(signature = (p, trials, seed = 0))]
fn synthesize_spikes<'py>(
    py: Python<'py>, p: &Bound<'py, PyAny>, trials: usize, seed: u64,
) -> PyResult<Bound<'py, numpy::PyArray3<u8>>> {
    let p = extract_f64_matrix(p)?;
    let spikes = generate_spikes(p.view(), trials, seed)?;
    Ok(spikes.into_inner().into_pyarray(py))
}

/// Pattern probabilities for a `T × D` parameter sequence, `T × 2^N`.
#[cfg(feature = "python-bindings")]
#[pyfunction]
fn pattern_probabilities<'py>(
    py: Python<'py>, theta: &Bound<'py, PyAny>, n: usize, order: usize,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let theta = extract_f64_matrix(theta)?;
    let space = PatternSpace::build(n, order)?;
    Ok(space.probability_matrix(theta.view())?.into_pyarray(py))
}

/// Per-timestep KL divergence of `q_theta` from `p_theta`, in nats.
#[cfg(feature = "python-bindings")]
#[pyfunction]
fn kl_divergence_per_timestep<'py>(
    py: Python<'py>, p_theta: &Bound<'py, PyAny>, q_theta: &Bound<'py, PyAny>, n: usize,
    order: usize,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let p_theta = extract_f64_matrix(p_theta)?;
    let q_theta = extract_f64_matrix(q_theta)?;
    let space = PatternSpace::build(n, order)?;
    Ok(kl_divergence(&space, p_theta.view(), q_theta.view())?.into_pyarray(py))
}

/// _ssasc — PyO3 module initializer.
///
/// Registers the `estimation` and `diagnostics` submodules and inserts them
/// into `sys.modules` so `import ssasc.estimation` works with dot notation.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _ssasc<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let estimation_mod = PyModule::new(_py, "estimation")?;
    let diagnostics_mod = PyModule::new(_py, "diagnostics")?;
    estimation_module(m, &estimation_mod)?;
    diagnostics_module(m, &diagnostics_mod)?;

    let modules = _py.import("sys")?.getattr("modules")?;
    modules.set_item("ssasc.estimation", estimation_mod)?;
    modules.set_item("ssasc.diagnostics", diagnostics_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn estimation_module<'py>(root: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<StateSpaceAnalysis>()?;
    root.add_submodule(m)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn diagnostics_module<'py>(root: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(synthesize_spikes, m)?)?;
    m.add_function(wrap_pyfunction!(pattern_probabilities, m)?)?;
    m.add_function(wrap_pyfunction!(kl_divergence_per_timestep, m)?)?;
    root.add_submodule(m)?;
    Ok(())
}

//! Python-boundary helpers: convert Python objects into validated crate
//! types. Everything here is behind the `python-bindings` feature and is
//! called only from the PyO3 wrappers in `lib.rs`.
#[cfg(feature = "python-bindings")]
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use numpy::{PyReadonlyArray2, PyReadonlyArray3};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyTypeError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    estimation::options::{
        ConvergenceCriterion, EMOptions, FisherScoringOptions, Prior, TransitionStructure,
    },
    observations::spikes::SpikeTrains,
};

/// Accept a 3-D `uint8`/`bool`-like or `float64` array (or nested sequence)
/// shaped `(trials, timesteps, channels)` and validate it as spikes.
#[cfg(feature = "python-bindings")]
pub fn extract_spike_trains<'py>(raw: &Bound<'py, PyAny>) -> PyResult<SpikeTrains> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray3<u8>>() {
        return Ok(SpikeTrains::new(arr.as_array().to_owned())?);
    }
    if let Ok(arr) = raw.extract::<PyReadonlyArray3<f64>>() {
        return Ok(SpikeTrains::from_real(arr.as_array())?);
    }
    if let Ok(obj) = raw.call_method1("astype", ("float64",)) {
        if let Ok(arr) = obj.extract::<PyReadonlyArray3<f64>>() {
            return Ok(SpikeTrains::from_real(arr.as_array())?);
        }
    }
    let nested: Vec<Vec<Vec<f64>>> = raw.extract().map_err(|_| {
        PyTypeError::new_err("spikes must be a 3-D array-like shaped (trials, timesteps, channels)")
    })?;
    let trials = nested.len();
    let timesteps = nested.first().map_or(0, Vec::len);
    let channels = nested.first().and_then(|t| t.first()).map_or(0, Vec::len);
    let flat: Vec<f64> = nested.into_iter().flatten().flatten().collect();
    let data = ndarray::Array3::from_shape_vec((trials, timesteps, channels), flat)
        .map_err(|_| PyTypeError::new_err("spikes must be a rectangular 3-D sequence"))?;
    Ok(SpikeTrains::from_real(data.view())?)
}

/// Accept a 2-D `float64` array-like and copy it into an owned matrix.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(raw: &Bound<'py, PyAny>) -> PyResult<Array2<f64>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr.as_array().to_owned());
    }
    let rows: Vec<Vec<f64>> = raw
        .extract()
        .map_err(|_| PyTypeError::new_err("expected a 2-D numpy.ndarray or sequence of float64"))?;
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|_| PyTypeError::new_err("expected a rectangular 2-D sequence"))
}

/// Build validated [`EMOptions`] from keyword arguments; `None` keeps the
/// default for that field.
#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
pub fn extract_em_options(
    max_iter: Option<usize>, tol: Option<f64>, criterion: Option<&str>, structure: Option<&str>,
    initial_transition_scale: Option<f64>, prior: Option<(f64, f64)>, update_prior: Option<bool>,
    max_degenerate: Option<usize>, fisher: Option<(f64, usize, usize)>,
) -> PyResult<EMOptions> {
    let defaults = EMOptions::default();
    let criterion = match criterion {
        Some(name) => name.parse::<ConvergenceCriterion>()?,
        None => defaults.criterion,
    };
    let mut opts = EMOptions::new(
        max_iter.unwrap_or(defaults.max_iter),
        tol.unwrap_or(defaults.tol),
        criterion,
    )?;
    if let Some(name) = structure {
        opts = opts.with_structure(name.parse::<TransitionStructure>()?);
    }
    if let Some(scale) = initial_transition_scale {
        opts = opts.with_initial_transition_scale(scale)?;
    }
    if let Some((mean, variance)) = prior {
        opts = opts.with_prior(Prior::isotropic(mean, variance)?);
    }
    if let Some((fs_tol, fs_max_iter, retries)) = fisher {
        opts = opts.with_fisher_scoring(FisherScoringOptions::new(fs_tol, fs_max_iter, retries)?);
    }
    Ok(opts
        .with_prior_update(update_prior.unwrap_or(defaults.update_prior))
        .with_max_degenerate(max_degenerate.unwrap_or(defaults.max_degenerate)))
}

//! Estimation options — validated configuration for the EM estimator.
//!
//! Purpose
//! -------
//! Collect every knob of the EM procedure in one place so call sites pass a
//! single validated value instead of ad-hoc arguments: iteration caps and
//! tolerances, the convergence criterion, the structure imposed on the
//! transition covariance, the initial state prior, and the inner
//! Fisher-scoring controls.
//!
//! Key behaviors
//! -------------
//! - Builders (`new`, `isotropic`, `explicit`, `with_*`) validate eagerly and
//!   return [`SSResult`]; `Default` gives the settings used by
//!   [`run`](crate::estimation::driver::run).
//! - [`ConvergenceCriterion`] and [`TransitionStructure`] implement `FromStr`
//!   (case-insensitive) for callers that configure by name.
//!
//! Invariants & assumptions
//! ------------------------
//! - Tolerances are finite and strictly positive; iteration caps are ≥ 1.
//! - An explicit prior is finite and its covariance symmetric positive-definite;
//!   agreement of its length with D is checked by [`Prior::resolve`] once D is
//!   known.
//!
//! Conventions
//! -----------
//! - Defaults: 1000 EM iterations, relative tolerance 1e-6 on the log marginal
//!   likelihood, full transition covariance initialized to 0.01·I, prior
//!   N(0, 0.1·I), prior update off, at most 3 consecutive degenerate M-steps.
//! - Fisher scoring defaults: step tolerance 1e-8, 100 sub-iterations, 30
//!   step halvings per sub-iteration.
use crate::{
    errors::{SSError, SSResult},
    numerics::linalg::SpdFactor,
};
use ndarray::{Array1, Array2};
use std::str::FromStr;

/// Quantity whose relative change decides EM convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvergenceCriterion {
    /// Laplace-approximated log marginal likelihood of the observations.
    #[default]
    LogMarginal,
    /// Frobenius norm of the change in the transition covariance F.
    TransitionCovariance,
}

impl FromStr for ConvergenceCriterion {
    type Err = SSError;

    /// Accepts `"log_marginal"` / `"logmarginal"` and
    /// `"transition_covariance"` / `"transitioncovariance"`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "").as_str() {
            "logmarginal" => Ok(ConvergenceCriterion::LogMarginal),
            "transitioncovariance" => Ok(ConvergenceCriterion::TransitionCovariance),
            _ => Err(SSError::UnknownOption {
                name: s.to_string(),
                reason: "Valid criteria are 'log_marginal' or 'transition_covariance'.",
            }),
        }
    }
}

/// Structure imposed on the transition covariance F by the M-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionStructure {
    /// Unrestricted symmetric positive-definite F.
    #[default]
    Full,
    /// Off-diagonal entries forced to zero.
    Diagonal,
    /// F = σ²·I with σ² the mean of the unrestricted diagonal.
    Isotropic,
}

impl FromStr for TransitionStructure {
    type Err = SSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(TransitionStructure::Full),
            "diagonal" => Ok(TransitionStructure::Diagonal),
            "isotropic" => Ok(TransitionStructure::Isotropic),
            _ => Err(SSError::UnknownOption {
                name: s.to_string(),
                reason: "Valid structures are 'full', 'diagonal' or 'isotropic'.",
            }),
        }
    }
}

/// Prior — distribution of the state at t = 0, N(θ₀, Σ₀).
///
/// Variants
/// --------
/// - `Isotropic { mean, variance }`: θ₀ = mean·1, Σ₀ = variance·I, sized to D
///   at resolve time.
/// - `Explicit { mean, covariance }`: fully specified; must match D.
#[derive(Debug, Clone, PartialEq)]
pub enum Prior {
    Isotropic { mean: f64, variance: f64 },
    Explicit { mean: Array1<f64>, covariance: Array2<f64> },
}

impl Default for Prior {
    fn default() -> Self {
        Prior::Isotropic { mean: 0.0, variance: 0.1 }
    }
}

impl Prior {
    /// Isotropic prior with a common mean and variance.
    ///
    /// Errors
    /// ------
    /// - `SSError::InvalidScale` if `mean` is non-finite or `variance` is not
    ///   finite and > 0.
    pub fn isotropic(mean: f64, variance: f64) -> SSResult<Self> {
        if !mean.is_finite() {
            return Err(SSError::InvalidScale { name: "prior mean", value: mean });
        }
        verify_scale("prior variance", variance)?;
        Ok(Prior::Isotropic { mean, variance })
    }

    /// Fully specified prior.
    ///
    /// Errors
    /// ------
    /// - `SSError::DimensionMismatch` if `covariance` is not `len × len`.
    /// - `SSError::InvalidCovariance` if the mean is non-finite or the
    ///   covariance is not symmetric positive-definite.
    pub fn explicit(mean: Array1<f64>, covariance: Array2<f64>) -> SSResult<Self> {
        let d = mean.len();
        if covariance.nrows() != d || covariance.ncols() != d {
            return Err(SSError::DimensionMismatch {
                what: "prior covariance",
                expected: d,
                actual: if covariance.nrows() != d { covariance.nrows() } else { covariance.ncols() },
            });
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(SSError::InvalidCovariance {
                name: "prior",
                reason: "mean entries must be finite",
            });
        }
        verify_spd("prior covariance", &covariance)?;
        Ok(Prior::Explicit { mean, covariance })
    }

    /// Materialize `(θ₀, Σ₀)` for dimension `dim`.
    ///
    /// Errors
    /// ------
    /// - `SSError::DimensionMismatch` if an explicit prior has length ≠ `dim`.
    pub fn resolve(&self, dim: usize) -> SSResult<(Array1<f64>, Array2<f64>)> {
        match self {
            Prior::Isotropic { mean, variance } => {
                Ok((Array1::from_elem(dim, *mean), Array2::eye(dim) * *variance))
            }
            Prior::Explicit { mean, covariance } => {
                if mean.len() != dim {
                    return Err(SSError::DimensionMismatch {
                        what: "prior mean",
                        expected: dim,
                        actual: mean.len(),
                    });
                }
                Ok((mean.clone(), covariance.clone()))
            }
        }
    }
}

/// FisherScoringOptions — controls of the per-timestep filter update.
///
/// Fields
/// ------
/// - `tol`: stop when the largest absolute Newton step is below `tol`.
/// - `max_iter`: sub-iteration cap; exceeding it is a numerical divergence.
/// - `max_damped_retries`: step halvings allowed while searching for an
///   increase of the log posterior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FisherScoringOptions {
    pub tol: f64,
    pub max_iter: usize,
    pub max_damped_retries: usize,
}

impl FisherScoringOptions {
    pub fn new(tol: f64, max_iter: usize, max_damped_retries: usize) -> SSResult<Self> {
        verify_tol("fisher_scoring.tol", tol)?;
        verify_cap("fisher_scoring.max_iter", max_iter)?;
        Ok(FisherScoringOptions { tol, max_iter, max_damped_retries })
    }
}

impl Default for FisherScoringOptions {
    fn default() -> Self {
        FisherScoringOptions { tol: 1e-8, max_iter: 100, max_damped_retries: 30 }
    }
}

/// EMOptions — configuration of the EM loop.
///
/// Construct with [`EMOptions::new`] for the iteration controls and refine
/// with the `with_*` builders; every builder validates its argument.
///
/// Fields
/// ------
/// - `max_iter`, `tol`, `criterion`: stopping rule. EM stops when the relative
///   change of `criterion` is below `tol` or after `max_iter` iterations.
/// - `structure`: constraint applied to each M-step update of F.
/// - `initial_transition_scale`: F at iteration 0 is this value times I.
/// - `prior`, `update_prior`: the t = 0 state distribution and whether the
///   M-step replaces it with the smoothed state at t = 0.
/// - `max_degenerate`: consecutive degenerate M-steps tolerated before
///   [`SSError::DegenerateTransition`] is raised.
/// - `fisher`: inner filter update controls.
#[derive(Debug, Clone, PartialEq)]
pub struct EMOptions {
    pub max_iter: usize,
    pub tol: f64,
    pub criterion: ConvergenceCriterion,
    pub structure: TransitionStructure,
    pub initial_transition_scale: f64,
    pub prior: Prior,
    pub update_prior: bool,
    pub max_degenerate: usize,
    pub fisher: FisherScoringOptions,
}

impl EMOptions {
    /// Validated iteration controls; every other field takes its default.
    ///
    /// Errors
    /// ------
    /// - `SSError::InvalidIterationCap` if `max_iter == 0`.
    /// - `SSError::InvalidTolerance` if `tol` is not finite and > 0.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ssasc::estimation::options::{ConvergenceCriterion, EMOptions, TransitionStructure};
    /// let opts = EMOptions::new(200, 1e-5, ConvergenceCriterion::TransitionCovariance)
    ///     .unwrap()
    ///     .with_structure(TransitionStructure::Diagonal);
    /// assert_eq!(opts.max_iter, 200);
    /// assert!(EMOptions::new(0, 1e-5, ConvergenceCriterion::LogMarginal).is_err());
    /// ```
    pub fn new(max_iter: usize, tol: f64, criterion: ConvergenceCriterion) -> SSResult<Self> {
        verify_cap("em.max_iter", max_iter)?;
        verify_tol("em.tol", tol)?;
        Ok(EMOptions { max_iter, tol, criterion, ..EMOptions::default() })
    }

    pub fn with_structure(mut self, structure: TransitionStructure) -> Self {
        self.structure = structure;
        self
    }

    pub fn with_prior(mut self, prior: Prior) -> Self {
        self.prior = prior;
        self
    }

    pub fn with_prior_update(mut self, update_prior: bool) -> Self {
        self.update_prior = update_prior;
        self
    }

    pub fn with_fisher_scoring(mut self, fisher: FisherScoringOptions) -> Self {
        self.fisher = fisher;
        self
    }

    pub fn with_max_degenerate(mut self, max_degenerate: usize) -> Self {
        self.max_degenerate = max_degenerate;
        self
    }

    /// Scale of the initial transition covariance `F₀ = scale · I`.
    pub fn with_initial_transition_scale(mut self, scale: f64) -> SSResult<Self> {
        verify_scale("initial_transition_scale", scale)?;
        self.initial_transition_scale = scale;
        Ok(self)
    }
}

impl Default for EMOptions {
    fn default() -> Self {
        EMOptions {
            max_iter: 1000,
            tol: 1e-6,
            criterion: ConvergenceCriterion::LogMarginal,
            structure: TransitionStructure::Full,
            initial_transition_scale: 0.01,
            prior: Prior::default(),
            update_prior: false,
            max_degenerate: 3,
            fisher: FisherScoringOptions::default(),
        }
    }
}

// ---- Helper Methods ----

fn verify_tol(name: &'static str, value: f64) -> SSResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SSError::InvalidTolerance { name, value });
    }
    Ok(())
}

fn verify_cap(name: &'static str, value: usize) -> SSResult<()> {
    if value == 0 {
        return Err(SSError::InvalidIterationCap { name, value });
    }
    Ok(())
}

fn verify_scale(name: &'static str, value: f64) -> SSResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SSError::InvalidScale { name, value });
    }
    Ok(())
}

fn verify_spd(name: &'static str, a: &Array2<f64>) -> SSResult<()> {
    let n = a.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let scale = a[[i, j]].abs().max(a[[j, i]].abs()).max(1.0);
            if (a[[i, j]] - a[[j, i]]).abs() > 1e-12 * scale {
                return Err(SSError::InvalidCovariance { name, reason: "matrix is not symmetric" });
            }
        }
    }
    if SpdFactor::new(a.view()).is_none() {
        return Err(SSError::InvalidCovariance {
            name,
            reason: "matrix is not finite positive-definite",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Defaults and validated builders of `EMOptions` / `FisherScoringOptions`.
    // - `Prior` construction and resolution against D.
    // - Case-insensitive parsing of the option enums.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Pin the documented defaults.
    fn defaults_are_documented_values() {
        let opts = EMOptions::default();
        assert_eq!(opts.max_iter, 1000);
        assert_eq!(opts.tol, 1e-6);
        assert_eq!(opts.criterion, ConvergenceCriterion::LogMarginal);
        assert_eq!(opts.structure, TransitionStructure::Full);
        assert_eq!(opts.initial_transition_scale, 0.01);
        assert_eq!(opts.prior, Prior::Isotropic { mean: 0.0, variance: 0.1 });
        assert!(!opts.update_prior);
        assert_eq!(opts.max_degenerate, 3);
        assert_eq!(opts.fisher, FisherScoringOptions { tol: 1e-8, max_iter: 100, max_damped_retries: 30 });
    }

    #[test]
    // Purpose
    // -------
    // Invalid tolerances, caps and scales are rejected with named errors.
    fn builders_reject_invalid_values() {
        assert_eq!(
            EMOptions::new(0, 1e-6, ConvergenceCriterion::LogMarginal).unwrap_err(),
            SSError::InvalidIterationCap { name: "em.max_iter", value: 0 }
        );
        assert!(matches!(
            EMOptions::new(10, f64::NAN, ConvergenceCriterion::LogMarginal),
            Err(SSError::InvalidTolerance { name: "em.tol", .. })
        ));
        assert_eq!(
            FisherScoringOptions::new(-1.0, 10, 5).unwrap_err(),
            SSError::InvalidTolerance { name: "fisher_scoring.tol", value: -1.0 }
        );
        assert_eq!(
            EMOptions::default().with_initial_transition_scale(0.0).unwrap_err(),
            SSError::InvalidScale { name: "initial_transition_scale", value: 0.0 }
        );
        assert!(Prior::isotropic(0.0, -0.1).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Explicit priors are checked for shape and positive-definiteness, and
    // their length is checked against D at resolve time.
    //
    // Given
    // -----
    // - A valid 2-dimensional prior, an indefinite covariance and a
    //   non-square covariance.
    //
    // Expect
    // ------
    // - The valid prior resolves for D = 2 and fails for D = 3.
    // - The invalid ones are rejected at construction.
    fn explicit_prior_validation_and_resolution() {
        let prior = Prior::explicit(array![-3.0, -2.0], array![[0.2, 0.05], [0.05, 0.1]]).unwrap();
        let (mean, cov) = prior.resolve(2).unwrap();
        assert_eq!(mean, array![-3.0, -2.0]);
        assert_eq!(cov[[0, 1]], 0.05);
        assert_eq!(
            prior.resolve(3).unwrap_err(),
            SSError::DimensionMismatch { what: "prior mean", expected: 3, actual: 2 }
        );

        let indefinite = Prior::explicit(array![0.0, 0.0], array![[1.0, 2.0], [2.0, 1.0]]);
        assert!(matches!(indefinite, Err(SSError::InvalidCovariance { .. })));

        let ragged = Prior::explicit(array![0.0, 0.0], Array2::eye(3));
        assert!(matches!(ragged, Err(SSError::DimensionMismatch { .. })));
    }

    #[test]
    fn isotropic_prior_resolves_to_scaled_identity() {
        let (mean, cov) = Prior::isotropic(-1.0, 0.5).unwrap().resolve(3).unwrap();
        assert_eq!(mean, array![-1.0, -1.0, -1.0]);
        assert_eq!(cov, Array2::eye(3) * 0.5);
    }

    #[test]
    // Purpose
    // -------
    // Option enums parse case-insensitively and reject unknown names.
    fn option_enums_parse_by_name() {
        assert_eq!("Log_Marginal".parse::<ConvergenceCriterion>().unwrap(), ConvergenceCriterion::LogMarginal);
        assert_eq!(
            "transitioncovariance".parse::<ConvergenceCriterion>().unwrap(),
            ConvergenceCriterion::TransitionCovariance
        );
        assert_eq!("DIAGONAL".parse::<TransitionStructure>().unwrap(), TransitionStructure::Diagonal);
        assert!(matches!("banded".parse::<TransitionStructure>(), Err(SSError::UnknownOption { .. })));
    }
}

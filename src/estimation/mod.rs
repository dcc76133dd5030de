//! estimation — state-space EM for time-varying log-linear parameters.
//!
//! Purpose
//! -------
//! Recover a smoothed sequence of natural parameters θ_t, with covariances,
//! from per-timestep observations, under a Gaussian random-walk prior on θ.
//!
//! Key behaviors
//! -------------
//! - [`filter`]: forward Fisher-scoring Kalman filter (E-step, forward).
//! - [`smoother`]: backward fixed-interval smoother (E-step, backward).
//! - [`mstep`]: closed-form transition-covariance update.
//! - [`em`]: the iteration, convergence test and degeneracy handling.
//! - [`driver`]: spike tensor in, [`EstimationResult`] out.
//! - [`options`]: validated configuration.
//!
//! Downstream usage
//! ----------------
//! - Most callers only need [`run`] or [`run_with_options`]; the stage
//!   functions are public for callers that aggregate observations themselves.
//!
//! Testing notes
//! -------------
//! - Each stage has unit tests against closed forms or hand-rolled scalar
//!   recursions; end-to-end accuracy on synthetic spikes is covered under
//!   `tests/`.
pub mod driver;
pub mod em;
pub mod filter;
pub mod mstep;
pub mod options;
pub mod smoother;

pub use self::driver::{
    EstimationMeta, EstimationResult, MIN_TIMESTEPS, run, run_with_cache, run_with_options,
};
pub use self::em::{EMOutcome, EMWarning, fit};
pub use self::options::{
    ConvergenceCriterion, EMOptions, FisherScoringOptions, Prior, TransitionStructure,
};

pub mod prelude {
    pub use super::{
        ConvergenceCriterion, EMOptions, EstimationResult, FisherScoringOptions, Prior,
        TransitionStructure, run, run_with_cache, run_with_options,
    };
}

//! diagnostics — validation collaborators around the estimator.
//!
//! Nothing in here is used by estimation itself. [`synthesis`] draws spike
//! trains from known pattern probabilities; [`divergence`] scores an
//! estimated parameter sequence against the truth, timestep by timestep.
pub mod divergence;
pub mod synthesis;

pub use self::divergence::kl_divergence;
pub use self::synthesis::generate_spikes;

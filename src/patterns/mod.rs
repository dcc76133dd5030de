//! patterns — the log-linear model over binary activation patterns.
//!
//! Purpose
//! -------
//! Everything that depends only on the channel count N and the interaction
//! order O: pattern enumeration, the interaction-subset index, the eta map,
//! and the log-partition with its derivatives.
//!
//! Key behaviors
//! -------------
//! - [`combinatorics`]: dimension formula, pattern table, subset ordering.
//! - [`space`]: [`PatternSpace`], the θ → (ψ, p, η, G) evaluator.
//! - [`cache`]: [`PatternSpaceCache`], shared immutable spaces per `(N, O)`.
//!
//! Downstream usage
//! ----------------
//! - `observations` uses [`PatternSpace::eta_map`] to aggregate spikes.
//! - `estimation` calls [`PatternSpace::moments`] inside Fisher scoring.
//! - `diagnostics` maps θ sequences to pattern probabilities.
pub mod cache;
pub mod combinatorics;
pub mod space;

pub use self::cache::PatternSpaceCache;
pub use self::combinatorics::{dimension, enumerate, interaction_subsets, pattern_index};
pub use self::space::{Moments, PatternSpace};

pub mod prelude {
    pub use super::{Moments, PatternSpace, PatternSpaceCache, dimension};
}

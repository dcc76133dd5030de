//! observations — validated spike input and its aggregation into the
//! per-timestep observation sequence.
//!
//! - [`spikes`]: [`SpikeTrains`], the checked `(R, T, N)` binary tensor.
//! - [`aggregate`](mod@aggregate): [`Observations`] and the
//!   [`aggregate`](fn@aggregate) routine mapping spikes through the eta map.
pub mod aggregate;
pub mod spikes;

pub use self::aggregate::{Observations, aggregate};
pub use self::spikes::SpikeTrains;

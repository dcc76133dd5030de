//! Observation Aggregator — per-timestep empirical sufficient statistics.
//!
//! For each timestep t, every trial's pattern is mapped to its eta column and
//! the columns are averaged over trials:
//! `y_t = (1/R) Σ_r eta(pattern_{r,t})`. The result is the observation
//! sequence the filter consumes, together with the trial count R that scales
//! the observation likelihood.
use crate::{
    errors::{SSError, SSResult},
    observations::spikes::SpikeTrains,
    patterns::{combinatorics::pattern_index, space::PatternSpace},
};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Observations — `T × D` empirical means plus the trial count.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    y: Array2<f64>,
    trials: usize,
}

impl Observations {
    /// Wrap a precomputed `T × D` observation matrix.
    ///
    /// Errors
    /// ------
    /// - `SSError::DimensionMismatch` when the column count is not `space.dim()`.
    /// - `SSError::EmptySpikes` when `y` has no rows or `trials == 0`; the
    ///   statistics could not have come from a non-empty spike tensor.
    pub fn new(y: Array2<f64>, trials: usize, space: &PatternSpace) -> SSResult<Self> {
        if y.ncols() != space.dim() {
            return Err(SSError::DimensionMismatch {
                what: "observation columns",
                expected: space.dim(),
                actual: y.ncols(),
            });
        }
        if trials == 0 || y.nrows() == 0 {
            return Err(SSError::EmptySpikes {
                trials,
                timesteps: y.nrows(),
                channels: space.n(),
            });
        }
        Ok(Observations { y, trials })
    }

    pub fn y(&self) -> ArrayView2<'_, f64> {
        self.y.view()
    }

    /// Observation vector at timestep `t`.
    pub fn at(&self, t: usize) -> ArrayView1<'_, f64> {
        self.y.row(t)
    }

    /// Number of trials R.
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Number of timesteps T.
    pub fn timesteps(&self) -> usize {
        self.y.nrows()
    }

    pub fn dim(&self) -> usize {
        self.y.ncols()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.y
    }
}

/// aggregate — empirical mean sufficient statistics per timestep.
///
/// Parameters
/// ----------
/// - `spikes`: validated `(R, T, N)` tensor.
/// - `space`: pattern space built for the same N.
///
/// Errors
/// ------
/// - `SSError::DimensionMismatch` when `spikes.channels() != space.n()`.
///
/// Performance
/// -----------
/// - O(R · T · (N + D)): one pattern-index computation and one eta-column
///   accumulation per trial and timestep.
pub fn aggregate(spikes: &SpikeTrains, space: &PatternSpace) -> SSResult<Observations> {
    if spikes.channels() != space.n() {
        return Err(SSError::DimensionMismatch {
            what: "spike channels",
            expected: space.n(),
            actual: spikes.channels(),
        });
    }
    let trials = spikes.trials();
    let eta_map = space.eta_map();
    let mut y = Array2::<f64>::zeros((spikes.timesteps(), space.dim()));
    for trial in spikes.data().axis_iter(Axis(0)) {
        for (pattern, mut row) in trial.rows().into_iter().zip(y.rows_mut()) {
            row += &eta_map.column(pattern_index(pattern));
        }
    }
    y /= trials as f64;
    Observations::new(y, trials, space)
}

//! Validated multi-trial spike tensors.
//!
//! Purpose
//! -------
//! Hold the raw binary input of an analysis: an `R × T × N` tensor
//! (trials × timesteps × channels) with every entry 0 or 1. All input checks
//! happen here, at the boundary, so aggregation and estimation can assume
//! clean data.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every axis has length ≥ 1.
//! - Every entry is exactly 0 or 1.
//!
//! Conventions
//! -----------
//! - Axis order is `(trial, t, channel)`; the first offending index is
//!   reported on failure.
//! - Real-valued input ([`SpikeTrains::from_real`]) must hold exactly 0.0 or
//!   1.0; no thresholding or rounding is applied.
use crate::errors::{SSError, SSResult};
use ndarray::{Array3, ArrayView2, ArrayView3};

/// SpikeTrains — binary spike tensor of shape `(R, T, N)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeTrains {
    data: Array3<u8>,
}

impl SpikeTrains {
    /// Validate and wrap a `(trials, timesteps, channels)` tensor.
    ///
    /// Errors
    /// ------
    /// - `SSError::EmptySpikes` if any axis has length zero.
    /// - `SSError::NonBinarySpike` at the first entry not in `{0, 1}`.
    pub fn new(data: Array3<u8>) -> SSResult<Self> {
        check_non_empty(data.dim())?;
        if let Some(((trial, t, channel), &value)) = data.indexed_iter().find(|&(_, &v)| v > 1) {
            return Err(SSError::NonBinarySpike { trial, t, channel, value: f64::from(value) });
        }
        Ok(SpikeTrains { data })
    }

    /// Validate a real-valued tensor whose entries must be exactly 0.0 or 1.0.
    pub fn from_real(data: ArrayView3<'_, f64>) -> SSResult<Self> {
        check_non_empty(data.dim())?;
        if let Some(((trial, t, channel), &value)) =
            data.indexed_iter().find(|&(_, &v)| v != 0.0 && v != 1.0)
        {
            return Err(SSError::NonBinarySpike { trial, t, channel, value });
        }
        Ok(SpikeTrains { data: data.mapv(|v| u8::from(v == 1.0)) })
    }

    /// Number of trials R.
    pub fn trials(&self) -> usize {
        self.data.dim().0
    }

    /// Number of timesteps T.
    pub fn timesteps(&self) -> usize {
        self.data.dim().1
    }

    /// Number of channels N.
    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// `T × N` slice for a single trial.
    pub fn trial(&self, r: usize) -> ArrayView2<'_, u8> {
        self.data.index_axis(ndarray::Axis(0), r)
    }

    pub fn into_inner(self) -> Array3<u8> {
        self.data
    }
}

fn check_non_empty((trials, timesteps, channels): (usize, usize, usize)) -> SSResult<()> {
    if trials == 0 || timesteps == 0 || channels == 0 {
        return Err(SSError::EmptySpikes { trials, timesteps, channels });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Construction of `SpikeTrains` from integer and real tensors: happy
    // path, empty axes, non-binary entries.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A valid binary tensor is accepted and its shape accessors agree.
    fn new_accepts_binary_tensor() {
        let data = Array3::from_shape_fn((3, 5, 2), |(r, t, n)| ((r + t + n) % 2) as u8);
        let spikes = SpikeTrains::new(data.clone()).unwrap();
        assert_eq!((spikes.trials(), spikes.timesteps(), spikes.channels()), (3, 5, 2));
        assert_eq!(spikes.trial(1), data.index_axis(ndarray::Axis(0), 1));
    }

    #[test]
    // Purpose
    // -------
    // Any zero-length axis is rejected before value checks.
    fn new_rejects_empty_axes() {
        let err = SpikeTrains::new(Array3::zeros((2, 0, 3))).unwrap_err();
        assert_eq!(err, SSError::EmptySpikes { trials: 2, timesteps: 0, channels: 3 });
    }

    #[test]
    // Purpose
    // -------
    // The first non-binary entry (in (trial, t, channel) order) is reported.
    //
    // Given
    // -----
    // - Zeros everywhere except 2 at (1, 2, 0) and 3 at (1, 3, 1).
    //
    // Expect
    // ------
    // - `NonBinarySpike { trial: 1, t: 2, channel: 0, value: 2.0 }`.
    fn new_reports_first_non_binary_entry() {
        let mut data = Array3::<u8>::zeros((2, 4, 2));
        data[[1, 2, 0]] = 2;
        data[[1, 3, 1]] = 3;
        let err = SpikeTrains::new(data).unwrap_err();
        assert_eq!(err, SSError::NonBinarySpike { trial: 1, t: 2, channel: 0, value: 2.0 });
    }

    #[test]
    // Purpose
    // -------
    // Real tensors need exact 0.0 / 1.0 entries.
    fn from_real_requires_exact_binary_values() {
        let mut data = Array3::<f64>::zeros((1, 3, 2));
        data[[0, 1, 1]] = 1.0;
        let spikes = SpikeTrains::from_real(data.view()).unwrap();
        assert_eq!(spikes.data()[[0, 1, 1]], 1);

        data[[0, 2, 0]] = 0.5;
        let err = SpikeTrains::from_real(data.view()).unwrap_err();
        assert_eq!(err, SSError::NonBinarySpike { trial: 0, t: 2, channel: 0, value: 0.5 });

        data[[0, 2, 0]] = f64::NAN;
        assert!(SpikeTrains::from_real(data.view()).is_err());
    }
}

//! Seeded spike-train synthesis from per-timestep pattern probabilities.
//!
//! Purpose
//! -------
//! Produce `R` independent trials of binary spikes whose joint pattern at
//! each timestep is drawn from a given distribution over the `2^N` patterns.
//! Used to validate the estimator against a known ground truth; the
//! estimator never calls it.
//!
//! Conventions
//! -----------
//! - Column `i` of the probability matrix refers to pattern `i` of
//!   [`enumerate`], so channel 0 is the most significant bit.
//! - Draws are made timestep-major (all trials at t = 0, then t = 1, …) from a
//!   `StdRng` seeded with `seed`; the same `(p, trials, seed)` always yields
//!   the same tensor.
use crate::{
    errors::{SSError, SSResult},
    numerics::constants::{MAX_CHANNELS, PROBABILITY_TOL},
    observations::spikes::SpikeTrains,
    patterns::combinatorics::enumerate,
};
use ndarray::{Array3, ArrayView1, ArrayView2};
use rand::{SeedableRng, distributions::Distribution, rngs::StdRng};
use statrs::distribution::Categorical;

/// generate_spikes — sample an `(R, T, N)` spike tensor.
///
/// Parameters
/// ----------
/// - `p`: `T × 2^N` matrix; every row is a probability vector over patterns.
/// - `trials`: number of trials R (≥ 1).
/// - `seed`: RNG seed.
///
/// Errors
/// ------
/// - `SSError::DimensionMismatch` if the column count is not `2^N` for some
///   `1 <= N <= MAX_CHANNELS`.
/// - `SSError::InvalidProbabilities` for a row with negative or non-finite
///   entries, or whose sum differs from 1 by more than `PROBABILITY_TOL`.
/// - `SSError::EmptySpikes` when `trials == 0` or `p` has no rows.
pub fn generate_spikes(p: ArrayView2<'_, f64>, trials: usize, seed: u64) -> SSResult<SpikeTrains> {
    let n = channels_for(p.ncols())?;
    if trials == 0 || p.nrows() == 0 {
        return Err(SSError::EmptySpikes { trials, timesteps: p.nrows(), channels: n });
    }
    let patterns = enumerate(n);
    let dists = p
        .rows()
        .into_iter()
        .enumerate()
        .map(|(t, row)| categorical(t, row))
        .collect::<SSResult<Vec<_>>>()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Array3::<u8>::zeros((trials, p.nrows(), n));
    for (t, dist) in dists.iter().enumerate() {
        for r in 0..trials {
            let index: f64 = dist.sample(&mut rng);
            for channel in 0..n {
                data[[r, t, channel]] = patterns[[index as usize, channel]];
            }
        }
    }
    SpikeTrains::new(data)
}

// ---- Helper Methods ----

fn channels_for(columns: usize) -> SSResult<usize> {
    if columns < 2 || !columns.is_power_of_two() || columns.trailing_zeros() as usize > MAX_CHANNELS {
        return Err(SSError::DimensionMismatch {
            what: "pattern columns (a power of two)",
            expected: columns.max(2).next_power_of_two(),
            actual: columns,
        });
    }
    Ok(columns.trailing_zeros() as usize)
}

fn categorical(t: usize, row: ArrayView1<'_, f64>) -> SSResult<Categorical> {
    if row.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(SSError::InvalidProbabilities {
            t,
            reason: "entries must be finite and non-negative",
        });
    }
    if (row.sum() - 1.0).abs() > PROBABILITY_TOL {
        return Err(SSError::InvalidProbabilities { t, reason: "entries must sum to 1" });
    }
    let weights = row.to_vec();
    Categorical::new(&weights)
        .map_err(|_| SSError::InvalidProbabilities { t, reason: "not a valid categorical distribution" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::space::PatternSpace;
    use ndarray::{Array2, Axis, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Determinism under a fixed seed.
    // - Degenerate (point-mass) rows producing exactly the requested pattern.
    // - Empirical frequencies on a larger sample.
    // - Validation of malformed probability matrices.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The same seed gives the same tensor; a different seed does not.
    fn same_seed_same_spikes() {
        let p = Array2::from_elem((20, 4), 0.25);
        let a = generate_spikes(p.view(), 10, 1).unwrap();
        let b = generate_spikes(p.view(), 10, 1).unwrap();
        let c = generate_spikes(p.view(), 10, 2).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!((a.trials(), a.timesteps(), a.channels()), (10, 20, 2));
    }

    #[test]
    // Purpose
    // -------
    // Point masses map to the binary expansion of their column index.
    //
    // Given
    // -----
    // - N = 3; t = 0 puts all mass on pattern 6 (110), t = 1 on pattern 1 (001).
    fn point_mass_rows_reproduce_patterns() {
        let mut p = Array2::<f64>::zeros((2, 8));
        p[[0, 6]] = 1.0;
        p[[1, 1]] = 1.0;
        let spikes = generate_spikes(p.view(), 5, 3).unwrap();
        for r in 0..5 {
            assert_eq!(spikes.data().index_axis(Axis(0), r).row(0), array![1u8, 1, 0]);
            assert_eq!(spikes.data().index_axis(Axis(0), r).row(1), array![0u8, 0, 1]);
        }
    }

    #[test]
    // Purpose
    // -------
    // Empirical single-channel rates track the model marginals.
    //
    // Given
    // -----
    // - N = 2, independent channels with θ = (−1, 0.5), 4000 trials, 1 bin.
    //
    // Expect
    // ------
    // - Rates within 0.03 of σ(−1) and σ(0.5).
    fn empirical_rates_track_marginals() {
        let space = PatternSpace::build(2, 1).unwrap();
        let p = space.probability_matrix(array![[-1.0, 0.5]].view()).unwrap();
        let spikes = generate_spikes(p.view(), 4000, 42).unwrap();
        let data = spikes.data();
        for (channel, theta) in [(0usize, -1.0f64), (1, 0.5)] {
            let rate = data.index_axis(Axis(2), channel).iter().map(|&v| f64::from(v)).sum::<f64>() / 4000.0;
            let expected = 1.0 / (1.0 + (-theta).exp());
            assert!((rate - expected).abs() < 0.03, "channel {channel}: {rate} vs {expected}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Malformed inputs are rejected with the offending timestep.
    fn malformed_probabilities_are_rejected() {
        let bad_sum = array![[0.25, 0.25, 0.25, 0.25], [0.5, 0.5, 0.5, 0.0]];
        assert_eq!(
            generate_spikes(bad_sum.view(), 3, 0).unwrap_err(),
            SSError::InvalidProbabilities { t: 1, reason: "entries must sum to 1" }
        );

        let negative = array![[1.25, -0.25]];
        assert!(matches!(
            generate_spikes(negative.view(), 3, 0),
            Err(SSError::InvalidProbabilities { t: 0, .. })
        ));

        let ragged = Array2::from_elem((2, 3), 1.0 / 3.0);
        assert!(matches!(
            generate_spikes(ragged.view(), 3, 0),
            Err(SSError::DimensionMismatch { actual: 3, .. })
        ));
        assert!(matches!(
            generate_spikes(Array2::from_elem((2, 2), 0.5).view(), 0, 0),
            Err(SSError::EmptySpikes { .. })
        ));
    }
}

//! Pattern enumeration and interaction-subset bookkeeping.
//!
//! Purpose
//! -------
//! Provide the combinatorial facts the log-linear model is built on: the
//! dimension `D = Σ_{k=1..O} C(N, k)`, the ordered list of 2^N binary
//! patterns, and the ordered list of channel subsets (interactions) that index
//! rows of the eta map.
//!
//! Conventions
//! -----------
//! - Pattern `i` is the N-digit binary expansion of `i` read left to right,
//!   so channel 0 is the most significant bit.
//! - Interaction subsets are ordered by size, then lexicographically:
//!   `{0}, {1}, …, {N−1}, {0,1}, {0,2}, …, {N−2,N−1}, {0,1,2}, …`.
use crate::{
    errors::{SSError, SSResult},
    numerics::constants::MAX_CHANNELS,
};
use ndarray::{Array2, ArrayView1};
use statrs::function::factorial::binomial;

/// Validate a `(n, order)` pair: `1 <= n <= MAX_CHANNELS` and `1 <= order <= n`.
pub fn validate_shape(n: usize, order: usize) -> SSResult<()> {
    if n == 0 || n > MAX_CHANNELS {
        return Err(SSError::InvalidChannelCount { n, max: MAX_CHANNELS });
    }
    if order == 0 || order > n {
        return Err(SSError::InvalidOrder { order, n });
    }
    Ok(())
}

/// Number of natural parameters `D = Σ_{k=1..order} C(n, k)`.
///
/// No validation is performed; `order > n` contributes zero terms.
///
/// ```rust
/// # use ssasc::patterns::dimension;
/// assert_eq!(dimension(4, 1), 4);
/// assert_eq!(dimension(4, 2), 10);
/// assert_eq!(dimension(4, 3), 14);
/// ```
pub fn dimension(n: usize, order: usize) -> usize {
    (1..=order.min(n)).map(|k| binomial(n as u64, k as u64).round() as usize).sum()
}

/// All `2^n` binary patterns as a `2^n × n` matrix in increasing integer order.
pub fn enumerate(n: usize) -> Array2<u8> {
    let count = 1usize << n;
    Array2::from_shape_fn((count, n), |(i, channel)| ((i >> (n - 1 - channel)) & 1) as u8)
}

/// Integer value of a binary pattern (channel 0 is the most significant bit).
///
/// Entries other than 0 are treated as 1; callers validate binarity upstream.
pub fn pattern_index(pattern: ArrayView1<'_, u8>) -> usize {
    pattern.iter().fold(0usize, |acc, &bit| (acc << 1) | usize::from(bit != 0))
}

/// Ordered channel subsets of size `1..=order` over `n` channels.
pub fn interaction_subsets(n: usize, order: usize) -> Vec<Vec<usize>> {
    let mut subsets = Vec::with_capacity(dimension(n, order));
    for k in 1..=order.min(n) {
        let mut current = Vec::with_capacity(k);
        push_combinations(n, k, 0, &mut current, &mut subsets);
    }
    subsets
}

// ---- Helper Methods ----

fn push_combinations(
    n: usize, k: usize, start: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>,
) {
    if current.len() == k {
        out.push(current.clone());
        return;
    }
    let remaining = k - current.len();
    for channel in start..=(n - remaining) {
        current.push(channel);
        push_combinations(n, k, channel + 1, current, out);
        current.pop();
    }
}

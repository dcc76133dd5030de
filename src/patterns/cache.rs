//! Shared, lazily built pattern spaces keyed by `(N, O)`.
//!
//! Building a [`PatternSpace`] costs O(D · 2^N); repeated analyses with the
//! same channel count and order (trial sweeps, bootstrap replicates,
//! concurrent recordings) reuse one immutable instance through a
//! [`PatternSpaceCache`]. Readers take a shared lock; a miss upgrades to an
//! exclusive lock and re-checks before building, so two racing callers never
//! build twice.
use crate::{errors::SSResult, patterns::space::PatternSpace};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

/// PatternSpaceCache — thread-safe map `(N, O) → Arc<PatternSpace>`.
#[derive(Debug, Default)]
pub struct PatternSpaceCache {
    spaces: RwLock<HashMap<(usize, usize), Arc<PatternSpace>>>,
}

impl PatternSpaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached space for `(n, order)`, building it on first use.
    ///
    /// Errors
    /// ------
    /// - Propagates [`PatternSpace::build`] validation errors; nothing is
    ///   cached for an invalid shape.
    pub fn get_or_build(&self, n: usize, order: usize) -> SSResult<Arc<PatternSpace>> {
        if let Some(space) = self.spaces.read().get(&(n, order)) {
            return Ok(Arc::clone(space));
        }
        let mut spaces = self.spaces.write();
        if let Some(space) = spaces.get(&(n, order)) {
            return Ok(Arc::clone(space));
        }
        let space = Arc::new(PatternSpace::build(n, order)?);
        tracing::debug!(n, order, dim = space.dim(), "pattern space built");
        spaces.insert((n, order), Arc::clone(&space));
        Ok(space)
    }

    /// Cached space for `(n, order)` without building.
    pub fn get(&self, n: usize, order: usize) -> Option<Arc<PatternSpace>> {
        self.spaces.read().get(&(n, order)).cloned()
    }

    pub fn len(&self) -> usize {
        self.spaces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.read().is_empty()
    }
}

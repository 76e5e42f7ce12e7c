//! Stake-weighted validator sampling.
//!
//! Each draw picks a target in `[0, remaining_stake)` and walks the
//! stakeholders in address order until the running sum passes it, so an
//! address is chosen with probability proportional to its share of the
//! remaining stake. Chosen addresses leave the pool for the rest of the
//! round.
//!
//! The generator is created once per selector. Reseeding per call skews the
//! distribution when calls come faster than the clock resolution.

use std::sync::{Arc, Mutex};

use meridian_types::Address;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConsensusError;
use crate::stake::StakeRegistry;

/// A proposer chosen for one slot. Not persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedValidator {
    pub address: Address,
    /// Stake at selection time.
    pub stake: u64,
}

pub struct ValidatorSelector {
    registry: Arc<StakeRegistry>,
    rng: Mutex<StdRng>,
}

impl ValidatorSelector {
    /// Seeded from OS entropy.
    pub fn new(registry: Arc<StakeRegistry>) -> Self {
        Self {
            registry,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible selection for tests and simulations.
    pub fn with_seed(registry: Arc<StakeRegistry>, seed: u64) -> Self {
        Self {
            registry,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn registry(&self) -> &Arc<StakeRegistry> {
        &self.registry
    }

    /// Pick `k` distinct validators, weighted by stake.
    pub fn select_validators(&self, k: usize) -> Result<Vec<SelectedValidator>, ConsensusError> {
        let mut pool = self.registry.stakeholders();
        let insufficient = |available| ConsensusError::InsufficientValidators {
            requested: k,
            available,
        };
        if pool.len() < k {
            return Err(insufficient(pool.len()));
        }

        let mut remaining: u128 = pool.iter().map(|s| u128::from(s.amount)).sum();
        let mut rng = self.rng.lock().expect("selector rng lock poisoned");
        let mut chosen = Vec::with_capacity(k);

        for _ in 0..k {
            if remaining == 0 {
                // Only zero-stake holders left.
                return Err(insufficient(chosen.len()));
            }
            let target = rng.gen_range(0..remaining);
            let mut cumulative: u128 = 0;
            let idx = pool
                .iter()
                .position(|s| {
                    cumulative += u128::from(s.amount);
                    cumulative > target
                })
                .ok_or_else(|| insufficient(chosen.len()))?;

            let picked = pool.remove(idx);
            remaining -= u128::from(picked.amount);
            chosen.push(SelectedValidator {
                address: picked.address,
                stake: picked.amount,
            });
        }

        debug!(requested = k, selected = ?chosen, "selected validators");
        Ok(chosen)
    }
}

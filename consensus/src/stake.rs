//! Stake registry.
//!
//! Maps each address to its staked amount. Entries are kept in address
//! order so snapshots iterate the same way on every node.

use std::collections::BTreeMap;
use std::sync::RwLock;

use meridian_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::ConsensusError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    pub address: Address,
    pub amount: u64,
}

#[derive(Debug, Default)]
pub struct StakeRegistry {
    stakes: RwLock<BTreeMap<Address, u64>>,
}

impl StakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or top up a stake. Returns the new total for `address`.
    pub fn add_stake(&self, address: Address, amount: u64) -> u64 {
        let mut stakes = self.stakes.write().expect("stake registry lock poisoned");
        let entry = stakes.entry(address).or_insert(0);
        *entry = entry.saturating_add(amount);
        *entry
    }

    /// Withdraw part of a stake. A stake reduced to zero is removed.
    pub fn remove_stake(&self, address: &Address, amount: u64) -> Result<u64, ConsensusError> {
        let mut stakes = self.stakes.write().expect("stake registry lock poisoned");
        let staked = *stakes
            .get(address)
            .ok_or(ConsensusError::NotFound(*address))?;
        if amount > staked {
            return Err(ConsensusError::InsufficientStake {
                address: *address,
                staked,
                requested: amount,
            });
        }
        let left = staked - amount;
        if left == 0 {
            stakes.remove(address);
        } else {
            stakes.insert(*address, left);
        }
        Ok(left)
    }

    pub fn get_stake(&self, address: &Address) -> Result<u64, ConsensusError> {
        self.stakes
            .read()
            .expect("stake registry lock poisoned")
            .get(address)
            .copied()
            .ok_or(ConsensusError::NotFound(*address))
    }

    /// Snapshot of every stakeholder in address order.
    pub fn stakeholders(&self) -> Vec<Stakeholder> {
        self.stakes
            .read()
            .expect("stake registry lock poisoned")
            .iter()
            .map(|(address, amount)| Stakeholder {
                address: *address,
                amount: *amount,
            })
            .collect()
    }

    pub fn total_stake(&self) -> u128 {
        self.stakes
            .read()
            .expect("stake registry lock poisoned")
            .values()
            .map(|v| u128::from(*v))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.stakes.read().expect("stake registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

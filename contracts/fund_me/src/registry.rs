//! Funder registry.
//!
//! A dense, insertion-ordered list of active funders plus a side map from
//! identity to its slot in that list. Presence in the side map *is* the
//! active flag. Removal moves the last funder into the freed slot, so it is
//! O(1) but does not preserve order.

use std::collections::HashMap;

use crate::types::Address;
use crate::{FundMeError, Result};

#[derive(Debug, Default, Clone)]
pub struct FunderRegistry {
    funders: Vec<Address>,
    positions: HashMap<Address, usize>,
}

impl FunderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `who` unless already active. Returns `true` if it was added.
    pub fn register_if_absent(&mut self, who: Address) -> bool {
        if self.positions.contains_key(&who) {
            return false;
        }
        self.positions.insert(who, self.funders.len());
        self.funders.push(who);
        true
    }

    /// Swap-remove `who` if active. Returns `true` if it was removed.
    pub fn remove_if_present(&mut self, who: &Address) -> bool {
        let Some(idx) = self.positions.remove(who) else {
            return false;
        };
        let last = self.funders.len() - 1;
        if idx != last {
            let moved = self.funders[last];
            self.funders[idx] = moved;
            self.positions.insert(moved, idx);
        }
        self.funders.pop();
        true
    }

    pub fn clear_all(&mut self) {
        self.funders.clear();
        self.positions.clear();
    }

    pub fn contains(&self, who: &Address) -> bool {
        self.positions.contains_key(who)
    }

    pub fn count(&self) -> usize {
        self.funders.len()
    }

    pub fn identity_at(&self, index: usize) -> Result<Address> {
        self.funders
            .get(index)
            .copied()
            .ok_or(FundMeError::IndexOutOfRange {
                index,
                count: self.funders.len(),
            })
    }

    pub fn position_of(&self, who: &Address) -> Option<usize> {
        self.positions.get(who).copied()
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.funders
    }
}

//! Balance ledger: identity -> available balance (wei).
//!
//! Absent entries are zero and zero entries are never stored, so the map
//! length is the number of identities holding funds. The sum of all entries
//! is the aggregate value held by the system.

use std::collections::HashMap;

use crate::types::Address;
use crate::{FundMeError, Result};

#[derive(Debug, Default, Clone)]
pub struct BalanceLedger {
    balances: HashMap<Address, u128>,
    total: u128,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&mut self, who: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let total = self.total.checked_add(amount).ok_or(FundMeError::Overflow)?;
        let entry = self.balances.entry(who).or_insert(0);
        // `total` bounds every entry, so this cannot overflow once the line above passed.
        *entry += amount;
        self.total = total;
        Ok(())
    }

    pub fn debit(&mut self, who: Address, amount: u128) -> Result<()> {
        let available = self.balance_of(&who);
        if amount > available {
            return Err(FundMeError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        if amount == 0 {
            return Ok(());
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(&who);
        } else {
            self.balances.insert(who, remaining);
        }
        self.total -= amount;
        Ok(())
    }

    pub fn balance_of(&self, who: &Address) -> u128 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    /// Aggregate of every balance.
    pub fn total(&self) -> u128 {
        self.total
    }

    pub fn holders(&self) -> usize {
        self.balances.len()
    }

    pub fn reset_all(&mut self) {
        self.balances.clear();
        self.total = 0;
    }

    pub(crate) fn sum_of_entries(&self) -> u128 {
        self.balances.values().sum()
    }
}

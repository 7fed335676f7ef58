//! Withdrawal guard.
//!
//! A withdrawal-class operation holds an [`InFlight`] for its whole
//! duration. Acquiring it flips the shared token from `Idle` to
//! `InProgress`; dropping it flips it back and, unless the operation
//! committed, restores whatever the operation debited. Early returns,
//! `?` and panics in the value-transfer callback all go through `Drop`.

use std::cell::{RefCell, RefMut};

use tracing::{error, warn};

use crate::storage::FundState;
use crate::types::Address;
use crate::{FundMeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Idle,
    InProgress,
}

impl GuardState {
    pub fn ensure_idle(self) -> Result<()> {
        match self {
            Self::Idle => Ok(()),
            Self::InProgress => Err(FundMeError::Reentrancy),
        }
    }
}

pub(crate) struct InFlight<'a> {
    cell: &'a RefCell<FundState>,
    pending_debits: Vec<(Address, u128)>,
}

impl<'a> InFlight<'a> {
    pub fn begin(cell: &'a RefCell<FundState>) -> Result<Self> {
        let mut state = cell.borrow_mut();
        if let Err(err) = state.guard.ensure_idle() {
            warn!("withdrawal rejected: another withdrawal is in flight");
            return Err(err);
        }
        state.guard = GuardState::InProgress;
        Ok(Self {
            cell,
            pending_debits: Vec::new(),
        })
    }

    /// Borrow the state. Must not be held across the transfer callback.
    pub fn state(&self) -> RefMut<'a, FundState> {
        self.cell.borrow_mut()
    }

    /// Debit `who` and remember it so an aborted operation can restore it.
    pub fn debit(&mut self, who: Address, amount: u128) -> Result<()> {
        self.state().ledger.debit(who, amount)?;
        self.pending_debits.push((who, amount));
        Ok(())
    }

    /// Keep every debit; the guard is released when `self` drops.
    pub fn commit(mut self) {
        self.pending_debits.clear();
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let Ok(mut state) = self.cell.try_borrow_mut() else {
            error!("withdrawal guard dropped while state is borrowed; guard left engaged");
            return;
        };
        for (who, amount) in self.pending_debits.drain(..).rev() {
            if let Err(err) = state.ledger.credit(who, amount) {
                error!(funder = %who, amount, %err, "failed to restore debit");
            }
        }
        state.guard = GuardState::Idle;
    }
}

//! # FundMe Ledger
//!
//! The accounting core of a crowdfunding contract: depositors send value,
//! the ledger tracks per-identity balances, and either the depositor or the
//! owner takes it back out.
//!
//! | Phase        | Entry Point(s)                                          |
//! |--------------|---------------------------------------------------------|
//! | Bootstrap    | [`FundMe::new`], [`FundMe::with_minimum_usd`]           |
//! | Funding      | [`FundMe::deposit`]                                     |
//! | Withdrawal   | [`FundMe::withdraw_partial`], [`FundMe::withdraw_full`] |
//! | Identity     | [`FundMe::change_funder`]                               |
//! | Owner        | [`FundMe::owner_withdraw_all`], [`FundMe::set_minimum_usd`] |
//! | Queries      | `balance_of`, `is_active_funder`, `funder_at`, `funder_count`, `minimum_usd`, ... |
//! | Host         | [`FundMe::drain_events`]                                |
//!
//! ## Architecture
//!
//! Price conversion lives in [`price`], balances in [`ledger`], funder
//! membership in [`registry`], and the withdrawal guard in [`guard`]. This
//! file holds the entry points and the ordering rules between those parts:
//!
//! * deposits convert, check the minimum, credit, then register;
//! * withdrawals debit, transfer, then clean up the registry, all under a
//!   guard token that restores the debit if the transfer fails.
//!
//! All state sits behind one `parking_lot::ReentrantMutex`. Other threads
//! wait for the running operation; the thread that is inside a transfer
//! callback gets back in, sees the guard engaged and is rejected.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, info, warn};

pub mod events;
pub mod guard;
pub mod ledger;
pub mod price;
pub mod registry;
mod storage;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod test_events;
#[cfg(test)]
mod test_withdraw;

use guard::InFlight;
use storage::FundState;

pub use events::{FundMeEvent, LedgerEvent};
pub use guard::GuardState;
pub use price::PriceFeed;
pub use transfer::ValueTransfer;
pub use types::{Address, FunderStatus, PriceReading, DEFAULT_MINIMUM_USD, WAD};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FundMeError {
    #[error("price feed has no usable price")]
    InvalidPrice,
    #[error("deposit worth {usd_value} is below the minimum of {minimum}")]
    BelowThreshold { usd_value: u128, minimum: u128 },
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },
    #[error("{0} is not an active funder")]
    NotAnActiveFunder(Address),
    #[error("a withdrawal is already in progress")]
    Reentrancy,
    #[error("transfer of {amount} to {to} failed")]
    TransferFailed { to: Address, amount: u128 },
    #[error("new value equals the current value")]
    NoOpChange,
    #[error("{0} is not the owner")]
    Unauthorized(Address),
    #[error("index {index} out of range ({count} funders)")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("arithmetic overflow")]
    Overflow,
}

impl FundMeError {
    /// Stable numeric code, for hosts that only carry integers.
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidPrice => 1,
            Self::BelowThreshold { .. } => 2,
            Self::InsufficientBalance { .. } => 3,
            Self::NotAnActiveFunder(_) => 4,
            Self::Reentrancy => 5,
            Self::TransferFailed { .. } => 6,
            Self::NoOpChange => 7,
            Self::Unauthorized(_) => 8,
            Self::IndexOutOfRange { .. } => 9,
            Self::InvalidAmount => 10,
            Self::Overflow => 11,
        }
    }
}

pub type Result<T> = std::result::Result<T, FundMeError>;

pub struct FundMe {
    owner: Address,
    price_feed: Arc<dyn PriceFeed>,
    transfer: Arc<dyn ValueTransfer>,
    state: ReentrantMutex<RefCell<FundState>>,
}

impl FundMe {
    // ─────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────

    /// Create a ledger owned by `owner` with the default 5 USD minimum.
    pub fn new(
        owner: Address,
        price_feed: Arc<dyn PriceFeed>,
        transfer: Arc<dyn ValueTransfer>,
    ) -> Self {
        Self::with_minimum_usd(owner, DEFAULT_MINIMUM_USD, price_feed, transfer)
    }

    pub fn with_minimum_usd(
        owner: Address,
        minimum_usd: u128,
        price_feed: Arc<dyn PriceFeed>,
        transfer: Arc<dyn ValueTransfer>,
    ) -> Self {
        info!(%owner, minimum_usd, "fund ledger created");
        Self {
            owner,
            price_feed,
            transfer,
            state: ReentrantMutex::new(RefCell::new(FundState::new(minimum_usd))),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Funding
    // ─────────────────────────────────────────────────────────

    /// Credit `amount` wei to `caller` if it is worth at least the minimum.
    ///
    /// Returns the caller's balance after the deposit.
    pub fn deposit(&self, caller: Address, amount: u128) -> Result<u128> {
        if amount == 0 {
            return Err(FundMeError::InvalidAmount);
        }
        let lock = self.state.lock();
        lock.borrow().guard.ensure_idle()?;

        let reading = self
            .price_feed
            .latest_reading()
            .ok_or(FundMeError::InvalidPrice)?;
        let usd_value = price::conversion_rate(&reading, amount)?;

        let mut state = lock.borrow_mut();
        let minimum = state.minimum_usd;
        if usd_value < minimum {
            debug!(funder = %caller, amount, usd_value, minimum, "deposit below minimum");
            return Err(FundMeError::BelowThreshold { usd_value, minimum });
        }

        state.ledger.credit(caller, amount)?;
        let first_deposit = state.registry.register_if_absent(caller);
        state.publish(FundMeEvent::Funded {
            funder: caller,
            amount,
            usd_value,
        });

        let balance = state.ledger.balance_of(&caller);
        info!(funder = %caller, amount, usd_value, balance, first_deposit, "deposit accepted");
        Ok(balance)
    }

    // ─────────────────────────────────────────────────────────
    // Withdrawal
    // ─────────────────────────────────────────────────────────

    /// Withdraw part of the caller's balance. Returns what remains.
    ///
    /// A caller whose balance reaches zero leaves the funder registry.
    pub fn withdraw_partial(&self, caller: Address, amount: u128) -> Result<u128> {
        let lock = self.state.lock();
        let mut flight = InFlight::begin(&lock)?;

        if amount == 0 {
            return Err(FundMeError::InvalidAmount);
        }
        if !flight.state().registry.contains(&caller) {
            return Err(FundMeError::NotAnActiveFunder(caller));
        }

        flight.debit(caller, amount)?;
        self.send(caller, amount)?;

        let remaining = {
            let mut state = flight.state();
            let remaining = state.ledger.balance_of(&caller);
            state.publish(FundMeEvent::Withdrawn {
                funder: caller,
                amount,
                remaining,
            });
            state.retire_if_empty(&caller);
            remaining
        };
        flight.commit();

        info!(funder = %caller, amount, remaining, "partial withdrawal");
        Ok(remaining)
    }

    /// Withdraw the caller's entire balance. Returns the amount sent.
    pub fn withdraw_full(&self, caller: Address) -> Result<u128> {
        let lock = self.state.lock();
        let mut flight = InFlight::begin(&lock)?;

        let amount = flight.state().ledger.balance_of(&caller);
        if amount == 0 {
            return Err(FundMeError::InsufficientBalance {
                requested: 0,
                available: 0,
            });
        }

        flight.debit(caller, amount)?;
        self.send(caller, amount)?;

        {
            let mut state = flight.state();
            state.publish(FundMeEvent::Withdrawn {
                funder: caller,
                amount,
                remaining: 0,
            });
            state.retire_if_empty(&caller);
        }
        flight.commit();

        info!(funder = %caller, amount, "full withdrawal");
        Ok(amount)
    }

    // ─────────────────────────────────────────────────────────
    // Identity transfer
    // ─────────────────────────────────────────────────────────

    /// Move the caller's whole balance to `new_funder`.
    ///
    /// If `new_funder` is already active the balances merge and it keeps
    /// its registry slot. Returns the amount moved.
    pub fn change_funder(&self, caller: Address, new_funder: Address) -> Result<u128> {
        let lock = self.state.lock();
        let mut state = lock.borrow_mut();
        state.guard.ensure_idle()?;

        if !state.registry.contains(&caller) {
            return Err(FundMeError::NotAnActiveFunder(caller));
        }
        if new_funder == caller {
            return Err(FundMeError::NoOpChange);
        }

        let amount = state.ledger.balance_of(&caller);
        state.ledger.debit(caller, amount)?;
        // The total is back where it started, so this cannot overflow.
        state.ledger.credit(new_funder, amount)?;
        state.registry.remove_if_present(&caller);
        let merged = !state.registry.register_if_absent(new_funder);
        state.publish(FundMeEvent::FunderChanged {
            from: caller,
            to: new_funder,
            amount,
        });

        info!(from = %caller, to = %new_funder, amount, merged, "funder identity changed");
        Ok(amount)
    }

    // ─────────────────────────────────────────────────────────
    // Owner
    // ─────────────────────────────────────────────────────────

    /// Send everything held to the owner and forget every funder.
    pub fn owner_withdraw_all(&self, caller: Address) -> Result<u128> {
        self.require_owner(caller)?;
        let lock = self.state.lock();
        let flight = InFlight::begin(&lock)?;

        let amount = flight.state().ledger.total();
        if amount > 0 {
            self.send(self.owner, amount)?;
        }

        let funders_cleared = {
            let mut state = flight.state();
            let cleared = state.registry.count();
            state.ledger.reset_all();
            state.registry.clear_all();
            state.publish(FundMeEvent::OwnerSwept {
                owner: self.owner,
                amount,
                funders_cleared: cleared,
            });
            cleared
        };
        flight.commit();

        info!(owner = %self.owner, amount, funders_cleared, "owner swept the ledger");
        Ok(amount)
    }

    pub fn set_minimum_usd(&self, caller: Address, new_minimum: u128) -> Result<()> {
        self.require_owner(caller)?;
        let lock = self.state.lock();
        let mut state = lock.borrow_mut();
        state.guard.ensure_idle()?;

        let old = state.minimum_usd;
        if old == new_minimum {
            return Err(FundMeError::NoOpChange);
        }
        state.minimum_usd = new_minimum;
        state.publish(FundMeEvent::MinimumUsdChanged {
            old,
            new: new_minimum,
        });

        info!(old, new = new_minimum, "minimum funding value changed");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn balance_of(&self, who: &Address) -> u128 {
        self.state.lock().borrow().ledger.balance_of(who)
    }

    pub fn is_active_funder(&self, who: &Address) -> bool {
        self.state.lock().borrow().registry.contains(who)
    }

    pub fn status_of(&self, who: &Address) -> FunderStatus {
        self.state.lock().borrow().status_of(who)
    }

    pub fn funder_at(&self, index: usize) -> Result<Address> {
        self.state.lock().borrow().registry.identity_at(index)
    }

    pub fn funder_count(&self) -> usize {
        self.state.lock().borrow().registry.count()
    }

    /// Snapshot of the registry in its current order.
    pub fn funders(&self) -> Vec<Address> {
        self.state.lock().borrow().registry.as_slice().to_vec()
    }

    pub fn minimum_usd(&self) -> u128 {
        self.state.lock().borrow().minimum_usd
    }

    /// Aggregate value held on behalf of all funders.
    pub fn total_funds(&self) -> u128 {
        self.state.lock().borrow().ledger.total()
    }

    pub fn price_feed_version(&self) -> u64 {
        self.price_feed.version()
    }

    pub fn guard_state(&self) -> GuardState {
        self.state.lock().borrow().guard
    }

    // ─────────────────────────────────────────────────────────
    // Host
    // ─────────────────────────────────────────────────────────

    /// Take every event published since the last drain.
    pub fn drain_events(&self) -> Vec<LedgerEvent> {
        self.state.lock().borrow_mut().journal.drain()
    }

    pub fn pending_events(&self) -> usize {
        self.state.lock().borrow().journal.pending().len()
    }

    // ─────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────

    fn require_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            warn!(%caller, "owner-only call rejected");
            return Err(FundMeError::Unauthorized(caller));
        }
        Ok(())
    }

    fn send(&self, to: Address, amount: u128) -> Result<()> {
        if self.transfer.send(to, amount) {
            Ok(())
        } else {
            warn!(%to, amount, "value transfer failed; rolling back");
            Err(FundMeError::TransferFailed { to, amount })
        }
    }

    #[cfg(test)]
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&FundState) -> R) -> R {
        f(&self.state.lock().borrow())
    }
}

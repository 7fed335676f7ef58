//! # Storage
//!
//! The authoritative in-memory state of one FundMe instance:
//!
//! | Field         | Type             | Description                              |
//! |---------------|------------------|------------------------------------------|
//! | `ledger`      | `BalanceLedger`  | identity -> available balance            |
//! | `registry`    | `FunderRegistry` | ordered set of active funders            |
//! | `minimum_usd` | `u128`           | funding threshold, 18 decimals           |
//! | `guard`       | `GuardState`     | `Idle` / `InProgress` withdrawal token   |
//! | `journal`     | `EventJournal`   | events awaiting the host                 |
//!
//! The whole struct lives behind a single lock owned by [`crate::FundMe`];
//! there is no finer-grained locking.

use crate::events::{EventJournal, FundMeEvent};
use crate::guard::GuardState;
use crate::ledger::BalanceLedger;
use crate::registry::FunderRegistry;
use crate::types::{Address, FunderStatus};

#[derive(Debug)]
pub(crate) struct FundState {
    pub ledger: BalanceLedger,
    pub registry: FunderRegistry,
    pub minimum_usd: u128,
    pub guard: GuardState,
    pub journal: EventJournal,
}

impl FundState {
    pub fn new(minimum_usd: u128) -> Self {
        Self {
            ledger: BalanceLedger::new(),
            registry: FunderRegistry::new(),
            minimum_usd,
            guard: GuardState::Idle,
            journal: EventJournal::default(),
        }
    }

    pub fn status_of(&self, who: &Address) -> FunderStatus {
        if self.registry.contains(who) {
            FunderStatus::ActiveFunder {
                balance: self.ledger.balance_of(who),
            }
        } else {
            FunderStatus::NotFunder
        }
    }

    /// Drop `who` from the registry once its balance is gone.
    pub fn retire_if_empty(&mut self, who: &Address) {
        if self.ledger.balance_of(who) == 0 && self.registry.remove_if_present(who) {
            self.journal
                .publish(FundMeEvent::FunderRemoved { funder: *who });
        }
    }

    pub fn publish(&mut self, event: FundMeEvent) {
        self.journal.publish(event);
    }
}

//! Events published by committed ledger operations.
//!
//! Operations append to an in-memory journal only after they commit, so a
//! failed call never leaves an event behind. The host drains the journal
//! and indexes it; `seq` is strictly increasing across drains.

use serde::Serialize;

use crate::types::Address;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FundMeEvent {
    Funded {
        funder: Address,
        #[serde(with = "crate::types::decimal")]
        amount: u128,
        #[serde(with = "crate::types::decimal")]
        usd_value: u128,
    },
    Withdrawn {
        funder: Address,
        #[serde(with = "crate::types::decimal")]
        amount: u128,
        #[serde(with = "crate::types::decimal")]
        remaining: u128,
    },
    FunderRemoved {
        funder: Address,
    },
    FunderChanged {
        from: Address,
        to: Address,
        #[serde(with = "crate::types::decimal")]
        amount: u128,
    },
    OwnerSwept {
        owner: Address,
        #[serde(with = "crate::types::decimal")]
        amount: u128,
        funders_cleared: usize,
    },
    MinimumUsdChanged {
        #[serde(with = "crate::types::decimal")]
        old: u128,
        #[serde(with = "crate::types::decimal")]
        new: u128,
    },
}

impl FundMeEvent {
    /// Short identifier suitable for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Funded { .. } => "funded",
            Self::Withdrawn { .. } => "withdrawn",
            Self::FunderRemoved { .. } => "funder_removed",
            Self::FunderChanged { .. } => "funder_changed",
            Self::OwnerSwept { .. } => "owner_swept",
            Self::MinimumUsdChanged { .. } => "minimum_usd_changed",
        }
    }

    /// The identity the event is about, if any.
    pub fn actor(&self) -> Option<Address> {
        match self {
            Self::Funded { funder, .. }
            | Self::Withdrawn { funder, .. }
            | Self::FunderRemoved { funder } => Some(*funder),
            Self::FunderChanged { from, .. } => Some(*from),
            Self::OwnerSwept { owner, .. } => Some(*owner),
            Self::MinimumUsdChanged { .. } => None,
        }
    }

    /// The other identity an event credits, if any. Only an identity change
    /// involves two parties; the destination is recorded here.
    pub fn counterparty(&self) -> Option<Address> {
        match self {
            Self::FunderChanged { to, .. } => Some(*to),
            _ => None,
        }
    }

    /// The value moved or set by the event, if any.
    pub fn amount(&self) -> Option<u128> {
        match self {
            Self::Funded { amount, .. }
            | Self::Withdrawn { amount, .. }
            | Self::FunderChanged { amount, .. }
            | Self::OwnerSwept { amount, .. } => Some(*amount),
            Self::MinimumUsdChanged { new, .. } => Some(*new),
            Self::FunderRemoved { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub event: FundMeEvent,
}

#[derive(Debug, Default)]
pub(crate) struct EventJournal {
    pending: Vec<LedgerEvent>,
    next_seq: u64,
}

impl EventJournal {
    pub fn publish(&mut self, event: FundMeEvent) {
        self.pending.push(LedgerEvent {
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
    }

    pub fn drain(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[LedgerEvent] {
        &self.pending
    }
}

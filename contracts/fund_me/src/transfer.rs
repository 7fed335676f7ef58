//! Outbound value transfer.

use crate::types::Address;

/// Sends native currency out of the ledger.
///
/// The recipient may run arbitrary code before `send` returns, including
/// calling back into the same [`crate::FundMe`]. Those calls are rejected
/// with [`crate::FundMeError::Reentrancy`] while a withdrawal is in flight.
pub trait ValueTransfer: Send + Sync {
    /// Returns `false` if the transfer did not happen.
    fn send(&self, to: Address, amount: u128) -> bool;
}

//! Payout outbox.
//!
//! The ledger's value transfer is a non-blocking hand-off onto a bounded
//! channel. A full or closed outbox reports failure, which makes the ledger
//! roll the withdrawal back. A background task records every accepted
//! payout in SQLite for the settlement side to pick up.

use std::time::Duration;

use chrono::Utc;
use fund_me::{Address, ValueTransfer};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub recipient: Address,
    pub amount: u128,
    pub queued_at: i64,
}

pub struct OutboxTransfer {
    tx: mpsc::Sender<Payout>,
}

impl OutboxTransfer {
    pub fn channel(depth: usize) -> (Self, mpsc::Receiver<Payout>) {
        let (tx, rx) = mpsc::channel(depth);
        (Self { tx }, rx)
    }
}

impl ValueTransfer for OutboxTransfer {
    fn send(&self, to: Address, amount: u128) -> bool {
        let payout = Payout {
            recipient: to,
            amount,
            queued_at: Utc::now().timestamp(),
        };
        match self.tx.try_send(payout) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(recipient = %to, amount, "Payout outbox full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(recipient = %to, amount, "Payout outbox closed");
                false
            }
        }
    }
}

/// How long a payout that failed to persist waits before the next attempt.
const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Persist queued payouts until cancelled, then flush what is left.
///
/// Value behind a payout has already left the ledger, so a payout that
/// fails to persist stays in the backlog until a later write succeeds.
pub async fn run(pool: SqlitePool, mut rx: mpsc::Receiver<Payout>, cancel: CancellationToken) {
    info!("Payout writer starting");

    let mut backlog: Vec<Payout> = Vec::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(payout) => backlog.push(payout),
                None => break,
            },
            _ = tokio::time::sleep(RETRY_INTERVAL), if !backlog.is_empty() => {}
        }

        if let Err(e) = flush(&pool, &mut backlog).await {
            error!(retained = backlog.len(), "Failed to record payouts: {e}");
        }
    }

    rx.close();
    while let Some(payout) = rx.recv().await {
        backlog.push(payout);
    }
    if let Err(e) = flush(&pool, &mut backlog).await {
        error!("Final payout flush failed: {e}");
        for payout in &backlog {
            error!(
                recipient = %payout.recipient,
                amount = %payout.amount,
                queued_at = payout.queued_at,
                "Unrecorded payout"
            );
        }
    }
    info!("Payout writer stopped");
}

/// Write the backlog in order, keeping everything from the first failure on.
pub async fn flush(pool: &SqlitePool, backlog: &mut Vec<Payout>) -> Result<usize> {
    let mut written = 0;
    let outcome = loop {
        let Some(payout) = backlog.get(written) else {
            break Ok(written);
        };
        match db::insert_payout(pool, payout).await {
            Ok(()) => {
                info!(recipient = %payout.recipient, amount = %payout.amount, "Payout queued");
                written += 1;
            }
            Err(e) => break Err(e),
        }
    };
    backlog.drain(..written);
    outcome
}

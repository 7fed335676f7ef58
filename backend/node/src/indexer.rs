//! Long-running background task that drains committed ledger events and
//! writes them to the database.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fund_me::{FundMe, LedgerEvent};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::db;
use crate::errors::Result;
use crate::events::StoredEvent;

pub struct IndexerState {
    pub pool: SqlitePool,
    pub fund: Arc<FundMe>,
    /// Distinguishes this process's event sequence from earlier runs.
    pub session: i64,
    pub interval: Duration,
}

/// Run the indexer loop until cancelled, flushing once more on the way out.
pub async fn run(state: Arc<IndexerState>, cancel: CancellationToken) {
    info!(session = state.session, "Indexer starting");

    // Events drained from the ledger but not yet stored.
    let mut backlog: Vec<StoredEvent> = Vec::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(state.interval) => {}
        }

        if let Err(e) = index_once(&state, &mut backlog).await {
            error!(retained = backlog.len(), "Indexer write error: {e}");
        }
    }

    if let Err(e) = index_once(&state, &mut backlog).await {
        error!(lost = backlog.len(), "Final index flush failed: {e}");
    }
    info!("Indexer stopped");
}

/// Drain the ledger once and store everything pending.
///
/// The backlog is only cleared after the write commits, so a failed write
/// is retried on the next tick.
pub async fn index_once(state: &IndexerState, backlog: &mut Vec<StoredEvent>) -> Result<usize> {
    let now = Utc::now().timestamp();
    stage(state.fund.drain_events(), backlog, |event| {
        StoredEvent::from_ledger(state.session, event, now)
    });

    if backlog.is_empty() {
        return Ok(0);
    }

    let inserted = db::insert_events(&state.pool, backlog).await?;
    debug!(
        "Drained {} ledger events → {} new records stored",
        backlog.len(),
        inserted
    );
    backlog.clear();
    Ok(inserted)
}

/// Move drained events into the backlog. Drained events are already gone
/// from the ledger, so one that cannot be encoded is logged and skipped.
fn stage(
    drained: Vec<LedgerEvent>,
    backlog: &mut Vec<StoredEvent>,
    encode: impl Fn(&LedgerEvent) -> Result<StoredEvent>,
) {
    for event in drained {
        match encode(&event) {
            Ok(stored) => backlog.push(stored),
            Err(e) => error!(seq = event.seq, event = ?event.event, "Skipping unencodable ledger event: {e}"),
        }
    }
}

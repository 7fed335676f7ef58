//! Cached price feed handed to the ledger.
//!
//! The ledger asks for a price synchronously inside `deposit`, so the RPC
//! round trip happens here in a background task and the ledger only reads
//! the last good round. A round older than `max_age` is withheld; the
//! ledger then rejects deposits with `InvalidPrice` instead of pricing
//! them off a stale answer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fund_me::{PriceFeed, PriceReading};
use parking_lot::RwLock;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::rpc::{self, FeedRound};

pub struct CachedPriceFeed {
    latest: RwLock<Option<PriceReading>>,
    version: AtomicU64,
    max_age: Duration,
}

impl CachedPriceFeed {
    pub fn new(max_age: Duration) -> Self {
        Self {
            latest: RwLock::new(None),
            version: AtomicU64::new(0),
            max_age,
        }
    }

    pub fn update(&self, round: FeedRound) {
        let mut latest = self.latest.write();
        if let Some(previous) = *latest {
            if round.reading.round_id < previous.round_id {
                warn!(
                    previous = previous.round_id,
                    received = round.reading.round_id,
                    "Ignoring out-of-order price round"
                );
                return;
            }
        }
        *latest = Some(round.reading);
        self.version.store(round.version, Ordering::Relaxed);
    }

    fn reading_at(&self, now: i64) -> Option<PriceReading> {
        let reading = (*self.latest.read())?;
        let age = now.saturating_sub(reading.updated_at);
        if age < 0 || age as u64 > self.max_age.as_secs() {
            return None;
        }
        Some(reading)
    }
}

impl PriceFeed for CachedPriceFeed {
    fn latest_reading(&self) -> Option<PriceReading> {
        self.reading_at(Utc::now().timestamp())
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }
}

/// Refresh `feed` every `interval` until cancelled.
pub async fn run(
    feed: Arc<CachedPriceFeed>,
    client: Client,
    rpc_url: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!("Price poller starting — feed: {rpc_url}");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            fetched = rpc::fetch_latest_round(&client, &rpc_url) => match fetched {
                Ok(round) => feed.update(round),
                Err(e) => error!("Price poll error: {e}"),
            },
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Price poller stopped");
}

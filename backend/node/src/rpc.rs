//! Price feed RPC client — calls `latestRoundData` and decodes the round.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns an error or rate-limit
//!   response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Transient network errors (connection reset, timeout) are retried silently.

use std::time::Duration;

use fund_me::PriceReading;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{NodeError, Result};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<RoundData>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoundData {
    #[serde(rename = "roundId")]
    pub round_id: u64,
    /// Signed price; feeds send it either as a JSON number or a decimal string.
    pub answer: Value,
    pub decimals: u8,
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
    /// Aggregator interface version.
    #[serde(default)]
    pub version: u64,
}

/// A decoded round plus the feed's interface version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRound {
    pub reading: PriceReading,
    pub version: u64,
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

/// Fetch the latest round from the feed, retrying soft failures.
pub async fn fetch_latest_round(client: &Client, rpc_url: &str) -> Result<FeedRound> {
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        let response = client
            .post(rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "latestRoundData",
                "params": [],
            }))
            .send()
            .await;

        match response {
            Err(e) => {
                warn!("Price feed request failed (will retry in {backoff}s): {e}");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                continue;
            }
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    warn!("Rate-limited by price feed (will retry in {backoff}s)");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let body: RpcResponse = resp.json().await?;

                if let Some(err) = body.error {
                    // Code -32600 / -32601 are hard failures; everything else we retry
                    if err.code == -32600 || err.code == -32601 {
                        return Err(NodeError::Feed(format!(
                            "RPC hard error {}: {}",
                            err.code, err.message
                        )));
                    }
                    warn!(
                        "Price feed soft error (will retry in {backoff}s): {} {}",
                        err.code, err.message
                    );
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let round = body.result.ok_or_else(|| {
                    NodeError::Feed("Empty result from latestRoundData".to_string())
                })?;
                let decoded = decode_round(&round)?;

                debug!(
                    round_id = decoded.reading.round_id,
                    answer = %decoded.reading.answer,
                    "Fetched price round"
                );
                return Ok(decoded);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────

pub fn decode_round(round: &RoundData) -> Result<FeedRound> {
    let answer = match &round.answer {
        Value::String(s) => s
            .parse::<i128>()
            .map_err(|_| NodeError::Feed(format!("Unparseable answer: {s}")))?,
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .ok_or_else(|| NodeError::Feed(format!("Answer out of range: {n}")))?,
        other => return Err(NodeError::Feed(format!("Unexpected answer type: {other}"))),
    };

    Ok(FeedRound {
        reading: PriceReading {
            answer,
            decimals: round.decimals,
            round_id: round.round_id,
            updated_at: round.updated_at,
        },
        version: round.version,
    })
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

//! Application configuration loaded from environment variables.

use std::str::FromStr;

use fund_me::Address;

use crate::errors::{NodeError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Identity allowed to sweep the ledger and change the minimum.
    pub owner: Address,
    /// JSON-RPC endpoint answering `latestRoundData`
    pub price_feed_url: String,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) to refresh the cached price
    pub price_poll_interval_secs: u64,
    /// Readings older than this are not served to the ledger
    pub price_max_age_secs: u64,
    /// How often (in seconds) to drain ledger events into the database
    pub index_interval_secs: u64,
    /// Capacity of the payout outbox; a full outbox fails the transfer
    pub payout_queue_depth: usize,
    /// Overrides the ledger's default minimum (USD, 18 decimals)
    pub minimum_usd: Option<u128>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            owner: env_var("OWNER_ADDRESS")
                .map_err(|_| {
                    NodeError::Config("OWNER_ADDRESS environment variable is required".to_string())
                })?
                .parse()
                .map_err(|e| NodeError::Config(format!("Invalid OWNER_ADDRESS: {e}")))?,
            price_feed_url: env_var("PRICE_FEED_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./fund_me.db".to_string()),
            api_port: parse_or("API_PORT", 3001)?,
            price_poll_interval_secs: parse_or("PRICE_POLL_INTERVAL_SECS", 15)?,
            price_max_age_secs: parse_or("PRICE_MAX_AGE_SECS", 3600)?,
            index_interval_secs: parse_or("INDEX_INTERVAL_SECS", 2)?,
            payout_queue_depth: parse_or("PAYOUT_QUEUE_DEPTH", 1024)?,
            minimum_usd: match env_var("MINIMUM_USD") {
                Ok(raw) => Some(
                    raw.parse()
                        .map_err(|_| NodeError::Config("Invalid MINIMUM_USD".to_string()))?,
                ),
                Err(_) => None,
            },
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| NodeError::Config(format!("Missing env var: {key}")))
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env_var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| NodeError::Config(format!("Invalid {key}"))),
        Err(_) => Ok(default),
    }
}

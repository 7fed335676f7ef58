//! Storage shapes for ledger events and payouts.
//!
//! Ledger events arrive as [`LedgerEvent`]s drained from the in-memory
//! journal; [`StoredEvent`] flattens one into the columns of the `events`
//! table while keeping the full JSON in `payload`.

use fund_me::LedgerEvent;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// A drained ledger event, ready to be stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub session: i64,
    pub seq: i64,
    pub event_type: String,
    pub actor: Option<String>,
    pub counterparty: Option<String>,
    pub amount: Option<String>,
    pub payload: String,
    pub recorded_at: i64,
}

impl StoredEvent {
    pub fn from_ledger(session: i64, event: &LedgerEvent, recorded_at: i64) -> Result<Self> {
        Ok(Self {
            session,
            seq: event.seq as i64,
            event_type: event.event.as_str().to_string(),
            actor: event.event.actor().map(|a| a.to_string()),
            counterparty: event.event.counterparty().map(|a| a.to_string()),
            amount: event.event.amount().map(|a| a.to_string()),
            payload: serde_json::to_string(event)?,
            recorded_at,
        })
    }
}

/// An event row as read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub session: i64,
    pub seq: i64,
    pub event_type: String,
    pub actor: Option<String>,
    pub counterparty: Option<String>,
    pub amount: Option<String>,
    pub payload: String,
    pub recorded_at: i64,
    pub created_at: i64,
}

/// A payout row as read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PayoutRecord {
    pub id: i64,
    pub recipient: String,
    pub amount: String,
    pub queued_at: i64,
    pub created_at: i64,
}

//! # Types
//!
//! Shared data structures used across all modules of the FundMe ledger.
//!
//! ## Design decisions
//!
//! ### Identities are opaque
//!
//! A depositor is never stored as an object of its own. Everything that
//! refers to one (ledger balances, registry slots, events) keys on an
//! [`Address`], a 20-byte comparable token rendered as `0x`-prefixed hex.
//!
//! ### Funder status as a tagged state
//!
//! [`FunderStatus`] is the single answer to "does this identity hold
//! funds here":
//!
//! ```text
//! NotFunder ──deposit──► ActiveFunder { balance }
//!     ▲                        │
//!     └──balance reaches 0─────┘ (withdrawal, identity transfer, owner sweep)
//! ```
//!
//! An identity is never `ActiveFunder` with a zero balance once an
//! operation has committed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-point scale of normalized values: 18 decimals.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Default minimum funding value: five USD with 18 decimals.
pub const DEFAULT_MINIMUM_USD: u128 = 5 * WAD;

/// Opaque depositor / owner identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const LEN: usize = 20;

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// An address whose every byte is `byte`. Handy for fixtures.
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; 20])
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressParseError {
    #[error("address must be 40 hex characters, got {0}")]
    Length(usize),
    #[error("invalid hex in address: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != Self::LEN * 2 {
            return Err(AddressParseError::Length(digits.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Per-identity view combining registry membership and balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FunderStatus {
    /// Not present in the funder registry.
    NotFunder,
    /// Present in the registry, holding `balance` wei.
    ActiveFunder {
        #[serde(with = "decimal")]
        balance: u128,
    },
}

impl FunderStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::ActiveFunder { .. })
    }

    pub fn balance(&self) -> u128 {
        match self {
            Self::NotFunder => 0,
            Self::ActiveFunder { balance } => *balance,
        }
    }
}

/// One reading from the external price oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReading {
    /// Signed price as reported by the feed.
    pub answer: i128,
    /// Number of decimals `answer` is expressed in.
    pub decimals: u8,
    /// Oracle round that produced the answer.
    pub round_id: u64,
    /// Unix timestamp (seconds) of the round.
    pub updated_at: i64,
}

/// `u128` amounts travel as decimal strings in JSON.
pub mod decimal {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

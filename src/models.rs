// src/models.rs
use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::Serialize;

/// Decimals of the chain's native currency.
pub const NATIVE_DECIMALS: u32 = 18;

/// Placeholder the tipping UI submits when the message field is left
/// untouched; treated as "no custom message" for display.
pub const DEFAULT_TIP_MESSAGE: &str = "Thanks for the great stream!";

/// Which currency a tip was denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Native,
    Token,
}

/// One decoded tip event.
///
/// `block_number` (then `log_index`) is the canonical recency order.
/// `timestamp` is resolved lazily from the block header and is only used
/// for "time ago" display, never for ordering.
#[derive(Debug, Clone)]
pub struct TipEvent {
    pub from: Address,
    pub amount: U256, // raw units in the event's currency
    pub currency: Currency,
    pub message: String,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: String,
    pub timestamp: Option<u64>,
}

impl TipEvent {
    /// The tipper's message, if they actually wrote one.
    pub fn custom_message(&self) -> Option<&str> {
        if self.message.is_empty() || self.message == DEFAULT_TIP_MESSAGE {
            None
        } else {
            Some(self.message.as_str())
        }
    }
}

/// Per-address totals derived from one aggregation pass. Never persisted;
/// rebuilt from the event history on every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipperStats {
    pub address: Address,
    pub native_total: U256,
    pub token_total: U256,
    /// Composite sort key: native units + token units * conversion rate.
    /// A ranking heuristic, not a price.
    pub ranking_value: Decimal,
}

/// One leaderboard row as served by the API.
#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub address: String,
    pub display_address: String,
    pub native_total: String, // raw units as string (safe for JSON)
    pub token_total: String,
    pub native_display: String,
    pub token_display: String,
    pub ranking_value: String,
}

/// One recent-tip row as served by the API.
#[derive(Debug, Serialize)]
pub struct RecentTipEntry {
    pub from: String,
    pub display_from: String,
    pub amount: String, // raw units as string
    pub amount_display: String,
    pub currency: Currency,
    pub message: Option<String>,
    pub block_number: u64,
    pub tx_hash: String,
    pub timestamp: u64,
    pub time_ago: String,
}

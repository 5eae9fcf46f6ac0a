//! Execution endpoint abstraction and trade instruction types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::ExecutionError;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("buy"),
            Self::Sell => f.write_str("sell"),
        }
    }
}

/// Trade size: either a base-currency amount or a percentage of holdings.
///
/// Serializes as a JSON number (`0.01`) or a percentage string (`"50%"`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeAmount {
    /// Amount in base currency (SOL)
    Base(f64),
    /// Percentage of current holdings (1-100)
    Percent(u8),
}

impl TradeAmount {
    /// Whether the amount is denominated in base currency.
    pub fn is_base(&self) -> bool {
        matches!(self, Self::Base(_))
    }
}

impl fmt::Display for TradeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(amount) => write!(f, "{amount}"),
            Self::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

impl Serialize for TradeAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Base(amount) => serializer.serialize_f64(*amount),
            Self::Percent(_) => serializer.collect_str(self),
        }
    }
}

/// A single buy or sell instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOrder {
    pub action: TradeAction,
    pub mint: String,
    pub amount: TradeAmount,
}

impl TradeOrder {
    pub fn buy(mint: impl Into<String>, amount: f64) -> Self {
        Self {
            action: TradeAction::Buy,
            mint: mint.into(),
            amount: TradeAmount::Base(amount),
        }
    }

    pub fn sell(mint: impl Into<String>, pct: u8) -> Self {
        Self {
            action: TradeAction::Sell,
            mint: mint.into(),
            amount: TradeAmount::Percent(pct),
        }
    }
}

/// Result of a successful trade.
#[derive(Debug, Clone)]
pub struct TradeReceipt {
    /// Transaction signature
    pub signature: String,
    pub executed_at: DateTime<Utc>,
}

impl TradeReceipt {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            executed_at: Utc::now(),
        }
    }

    /// Explorer link for the transaction.
    pub fn explorer_url(&self) -> String {
        format!("https://solscan.io/tx/{}", self.signature)
    }
}

/// Accepts buy/sell instructions.
#[async_trait]
pub trait ExecutionEndpoint: Send + Sync {
    async fn execute(&self, order: &TradeOrder) -> Result<TradeReceipt, ExecutionError>;

    /// Whether instructions move real funds.
    fn is_live(&self) -> bool {
        true
    }
}

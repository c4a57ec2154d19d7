use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradesim_core::ValueObject;

use crate::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl core::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TradeAction::Buy => f.write_str("BUY"),
            TradeAction::Sell => f.write_str("SELL"),
        }
    }
}

/// One completed trade (immutable log entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    action: TradeAction,
    symbol: Symbol,
    quantity: u64,
    unit_price: f64,
    timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub(crate) fn new(
        action: TradeAction,
        symbol: Symbol,
        quantity: u64,
        unit_price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            symbol,
            quantity,
            unit_price,
            timestamp,
        }
    }

    pub fn action(&self) -> TradeAction {
        self.action
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Price per share at the time of the trade.
    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Cash moved by the trade (`unit_price * quantity`).
    pub fn total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

impl ValueObject for TransactionRecord {}

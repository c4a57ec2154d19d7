//! Configuration loading and representation.
//!
//! Read from environment variables:
//! - `TRADESIM_OWNER`: owner id of the default account (`demo_user`)
//! - `TRADESIM_OPENING_DEPOSIT`: opening cash of the default account (`1000.0`)
//! - `TRADESIM_PRICES`: JSON object of fixed share prices, e.g. `{"AAPL": 150.0}`

use std::collections::BTreeMap;

use thiserror::Error;

use tradesim_core::{DomainError, OwnerId};
use tradesim_ledger::FixedPriceTable;

pub const OWNER_VAR: &str = "TRADESIM_OWNER";
pub const OPENING_DEPOSIT_VAR: &str = "TRADESIM_OPENING_DEPOSIT";
pub const PRICES_VAR: &str = "TRADESIM_PRICES";

const DEFAULT_OWNER: &str = "demo_user";
const DEFAULT_OPENING_DEPOSIT: f64 = 1000.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: expected a finite number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var}: malformed JSON: {source}")]
    InvalidJson {
        var: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{var}: {source}")]
    InvalidValue {
        var: &'static str,
        #[source]
        source: DomainError,
    },
}

/// Simulator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub owner_id: OwnerId,
    pub opening_deposit: f64,
    pub prices: FixedPriceTable,
}

impl SimConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (unset or blank → default).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let owner_id = match read(OWNER_VAR) {
            Some(raw) => OwnerId::new(raw.trim()).map_err(|source| ConfigError::InvalidValue {
                var: OWNER_VAR,
                source,
            })?,
            None => OwnerId::new(DEFAULT_OWNER).map_err(|source| ConfigError::InvalidValue {
                var: OWNER_VAR,
                source,
            })?,
        };

        let opening_deposit = match read(OPENING_DEPOSIT_VAR) {
            Some(raw) => parse_amount(OPENING_DEPOSIT_VAR, &raw)?,
            None => DEFAULT_OPENING_DEPOSIT,
        };

        let prices = match read(PRICES_VAR) {
            Some(raw) => parse_prices(&raw)?,
            None => FixedPriceTable::default(),
        };

        Ok(Self {
            owner_id,
            opening_deposit,
            prices,
        })
    }
}

fn parse_amount(var: &'static str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        })
}

fn parse_prices(raw: &str) -> Result<FixedPriceTable, ConfigError> {
    let table: BTreeMap<String, f64> =
        serde_json::from_str(raw).map_err(|source| ConfigError::InvalidJson {
            var: PRICES_VAR,
            source,
        })?;
    FixedPriceTable::from_pairs(table.iter().map(|(symbol, price)| (symbol.as_str(), *price)))
        .map_err(|source| ConfigError::InvalidValue {
            var: PRICES_VAR,
            source,
        })
}

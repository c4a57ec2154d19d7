//! Share price lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use tradesim_core::{DomainError, DomainResult};

use crate::symbol::Symbol;

/// Price source consulted by the ledger for trades and valuation.
///
/// Returns `0.0` for symbols the source does not know. Callers treat a zero
/// price as "unpriced", not as a free asset.
pub trait PriceLookup: Send + Sync + core::fmt::Debug {
    fn price(&self, symbol: &Symbol) -> f64;
}

impl<P> PriceLookup for Arc<P>
where
    P: PriceLookup + ?Sized,
{
    fn price(&self, symbol: &Symbol) -> f64 {
        (**self).price(symbol)
    }
}

/// Closed, static price table.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedPriceTable {
    prices: BTreeMap<Symbol, f64>,
}

impl FixedPriceTable {
    /// Prices used when no table is configured.
    pub const DEFAULT_PRICES: [(&'static str, f64); 3] =
        [("AAPL", 150.0), ("TSLA", 700.0), ("GOOGL", 2800.0)];

    /// Build a table. Every price must be finite and non-negative.
    pub fn new(prices: impl IntoIterator<Item = (Symbol, f64)>) -> DomainResult<Self> {
        let mut table = BTreeMap::new();
        for (symbol, price) in prices {
            if !price.is_finite() || price < 0.0 {
                return Err(DomainError::validation(format!(
                    "price for {symbol} must be a finite, non-negative number (got {price})"
                )));
            }
            table.insert(symbol, price);
        }
        Ok(Self { prices: table })
    }

    /// Build a table from raw symbol strings (config, tests).
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> DomainResult<Self> {
        let parsed = pairs
            .into_iter()
            .map(|(raw, price)| Symbol::parse(raw).map(|symbol| (symbol, price)))
            .collect::<DomainResult<Vec<_>>>()?;
        Self::new(parsed)
    }

    pub fn is_priced(&self, symbol: &Symbol) -> bool {
        self.prices.contains_key(symbol)
    }

    /// Known symbols and their prices, in symbol order.
    pub fn entries(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.prices.iter().map(|(symbol, price)| (symbol, *price))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for FixedPriceTable {
    fn default() -> Self {
        let prices = Self::DEFAULT_PRICES
            .iter()
            .map(|(raw, price)| (Symbol(raw.to_string()), *price))
            .collect();
        Self { prices }
    }
}

impl PriceLookup for FixedPriceTable {
    fn price(&self, symbol: &Symbol) -> f64 {
        self.prices.get(symbol).copied().unwrap_or(0.0)
    }
}

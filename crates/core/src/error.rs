//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation,
/// insufficient funds or shares, conflicts). Infrastructure concerns belong
/// elsewhere.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A value failed validation (non-positive amount, zero quantity, empty symbol).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The cash balance does not cover the requested debit.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: f64, available: f64 },

    /// The account does not hold enough shares of a symbol.
    #[error("insufficient holdings of {symbol}: requested {requested}, held {held}")]
    InsufficientHoldings {
        symbol: String,
        requested: u64,
        held: u64,
    },

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn insufficient_funds(requested: f64, available: f64) -> Self {
        Self::InsufficientFunds {
            requested,
            available,
        }
    }

    pub fn insufficient_holdings(symbol: impl Into<String>, requested: u64, held: u64) -> Self {
        Self::InsufficientHoldings {
            symbol: symbol.into(),
            requested,
            held,
        }
    }
}

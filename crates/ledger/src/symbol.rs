use serde::{Deserialize, Serialize};

use tradesim_core::{DomainError, ValueObject};

/// Ticker symbol (e.g. `AAPL`).
///
/// Input is trimmed and upper-cased, so `" aapl "` and `"AAPL"` name the same
/// holding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(pub(crate) String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("symbol cannot be empty"));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(format!(
                "symbol cannot contain whitespace: {raw:?}"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Symbol {}

impl core::fmt::Display for Symbol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for Symbol {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

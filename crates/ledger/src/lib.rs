//! Trading ledger (single-account cash + share bookkeeping).
//!
//! Pure domain logic only: no IO, no persistence, no live market data.

pub mod ledger;
pub mod pricing;
pub mod symbol;
pub mod transaction;

pub use ledger::{
    AccountSummary, BuyShares, Deposit, FundsDeposited, FundsWithdrawn, Ledger, LedgerCommand,
    LedgerEvent, SellShares, SharesBought, SharesSold, Withdraw,
};
pub use pricing::{FixedPriceTable, PriceLookup};
pub use symbol::Symbol;
pub use transaction::{TradeAction, TransactionRecord};

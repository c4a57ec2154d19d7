use chrono::{DateTime, Utc};

/// A recorded change to an account.
///
/// The ledger emits one event per accepted operation: `ledger.funds_deposited`,
/// `ledger.funds_withdrawn`, `ledger.shares_bought` and `ledger.shares_sold`.
/// Replaying an account's events through `apply` in order rebuilds its cash
/// balance, holdings and transaction log. Rejected operations emit nothing.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted `<aggregate>.<past_tense_fact>` name, stable across releases.
    fn event_type(&self) -> &'static str;

    /// Payload schema version. Bumped when fields change meaning.
    fn version(&self) -> u32;

    /// Caller-supplied business time of the operation.
    fn occurred_at(&self) -> DateTime<Utc>;
}

//! Account registry (explicit session object instead of a process-wide account).
//!
//! Each ledger sits behind its own `Mutex`, so every operation on one account
//! is serialized while different accounts proceed independently. The outer
//! `RwLock` only guards the id → ledger map.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;

use tradesim_core::{AccountId, Aggregate, AggregateRoot, DomainError, ExpectedVersion, OwnerId};
use tradesim_events::Event;
use tradesim_ledger::{
    AccountSummary, Ledger, LedgerCommand, LedgerEvent, PriceLookup, Symbol, TransactionRecord,
};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown account: {0}")]
    UnknownAccount(AccountId),

    #[error("registry lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

type SharedLedger = Arc<Mutex<Ledger>>;

/// In-memory registry of open ledgers sharing one price source.
#[derive(Debug)]
pub struct AccountRegistry {
    accounts: RwLock<HashMap<AccountId, SharedLedger>>,
    prices: Arc<dyn PriceLookup>,
}

impl AccountRegistry {
    pub fn new(prices: Arc<dyn PriceLookup>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            prices,
        }
    }

    pub fn prices(&self) -> &Arc<dyn PriceLookup> {
        &self.prices
    }

    /// Open a new ledger and return its handle.
    pub fn open(&self, owner_id: OwnerId, initial_deposit: f64) -> Result<AccountId, RegistryError> {
        let ledger = Ledger::open(owner_id, initial_deposit, self.prices.clone())?;
        let id = ledger.id_typed();
        tracing::info!(account_id = %id, owner_id = %ledger.owner_id(), initial_deposit, "account opened");

        let mut accounts = self.accounts.write().map_err(|_| RegistryError::LockPoisoned)?;
        accounts.insert(id, Arc::new(Mutex::new(ledger)));
        Ok(id)
    }

    /// Remove a ledger. Returns its final summary.
    pub fn close(&self, id: AccountId) -> Result<AccountSummary, RegistryError> {
        let removed = {
            let mut accounts = self.accounts.write().map_err(|_| RegistryError::LockPoisoned)?;
            accounts.remove(&id).ok_or(RegistryError::UnknownAccount(id))?
        };
        let summary = removed
            .lock()
            .map_err(|_| RegistryError::LockPoisoned)?
            .summary();
        tracing::info!(account_id = %id, "account closed");
        Ok(summary)
    }

    pub fn contains(&self, id: AccountId) -> Result<bool, RegistryError> {
        let accounts = self.accounts.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(accounts.contains_key(&id))
    }

    pub fn len(&self) -> Result<usize, RegistryError> {
        let accounts = self.accounts.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(accounts.len())
    }

    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.len()? == 0)
    }

    /// Run `f` with exclusive access to one ledger.
    pub fn with_ledger<T>(
        &self,
        id: AccountId,
        f: impl FnOnce(&mut Ledger) -> T,
    ) -> Result<T, RegistryError> {
        let shared = self.lookup(id)?;
        let mut ledger = shared.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(f(&mut *ledger))
    }

    /// Execute a command with an optimistic concurrency expectation.
    pub fn dispatch(
        &self,
        id: AccountId,
        expected_version: ExpectedVersion,
        command: &LedgerCommand,
    ) -> Result<Vec<LedgerEvent>, RegistryError> {
        self.with_ledger(id, |ledger| -> Result<Vec<LedgerEvent>, RegistryError> {
            expected_version.check(ledger.version())?;
            let events = ledger.execute(command)?;
            for event in &events {
                tracing::debug!(
                    account_id = %id,
                    event_type = event.event_type(),
                    version = ledger.version(),
                    "ledger event applied"
                );
            }
            Ok(events)
        })?
    }

    pub fn deposit(&self, id: AccountId, amount: f64) -> Result<(), RegistryError> {
        self.with_ledger(id, |ledger| ledger.deposit(amount))?
            .map_err(RegistryError::from)
    }

    pub fn withdraw(&self, id: AccountId, amount: f64) -> Result<bool, RegistryError> {
        self.with_ledger(id, |ledger| ledger.withdraw(amount))
    }

    pub fn buy(&self, id: AccountId, symbol: &Symbol, quantity: u64) -> Result<bool, RegistryError> {
        self.with_ledger(id, |ledger| ledger.buy(symbol, quantity))
    }

    pub fn sell(&self, id: AccountId, symbol: &Symbol, quantity: u64) -> Result<bool, RegistryError> {
        self.with_ledger(id, |ledger| ledger.sell(symbol, quantity))
    }

    pub fn summary(&self, id: AccountId) -> Result<AccountSummary, RegistryError> {
        self.with_ledger(id, |ledger| ledger.summary())
    }

    pub fn holdings(&self, id: AccountId) -> Result<BTreeMap<Symbol, u64>, RegistryError> {
        self.with_ledger(id, |ledger| ledger.holdings_snapshot())
    }

    pub fn transactions(&self, id: AccountId) -> Result<Vec<TransactionRecord>, RegistryError> {
        self.with_ledger(id, |ledger| ledger.transactions_snapshot())
    }

    fn lookup(&self, id: AccountId) -> Result<SharedLedger, RegistryError> {
        let accounts = self.accounts.read().map_err(|_| RegistryError::LockPoisoned)?;
        accounts
            .get(&id)
            .cloned()
            .ok_or(RegistryError::UnknownAccount(id))
    }
}

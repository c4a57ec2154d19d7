use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradesim_core::{AccountId, Aggregate, AggregateRoot, DomainError, DomainResult, OwnerId};
use tradesim_events::Event;

use crate::pricing::PriceLookup;
use crate::symbol::Symbol;
use crate::transaction::{TradeAction, TransactionRecord};

/// Command: Deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Withdraw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdraw {
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: BuyShares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyShares {
    pub symbol: Symbol,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SellShares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellShares {
    pub symbol: Symbol,
    pub quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerCommand {
    Deposit(Deposit),
    Withdraw(Withdraw),
    Buy(BuyShares),
    Sell(SellShares),
}

/// Event: FundsDeposited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundsDeposited {
    pub account_id: AccountId,
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FundsWithdrawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundsWithdrawn {
    pub account_id: AccountId,
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SharesBought (carries the unit price decided at handle time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharesBought {
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub quantity: u64,
    pub unit_price: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SharesSold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharesSold {
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub quantity: u64,
    pub unit_price: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    FundsDeposited(FundsDeposited),
    FundsWithdrawn(FundsWithdrawn),
    SharesBought(SharesBought),
    SharesSold(SharesSold),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::FundsDeposited(_) => "ledger.funds_deposited",
            LedgerEvent::FundsWithdrawn(_) => "ledger.funds_withdrawn",
            LedgerEvent::SharesBought(_) => "ledger.shares_bought",
            LedgerEvent::SharesSold(_) => "ledger.shares_sold",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::FundsDeposited(e) => e.occurred_at,
            LedgerEvent::FundsWithdrawn(e) => e.occurred_at,
            LedgerEvent::SharesBought(e) => e.occurred_at,
            LedgerEvent::SharesSold(e) => e.occurred_at,
        }
    }
}

/// Read-only account report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub owner_id: OwnerId,
    pub balance: f64,
    pub holdings: BTreeMap<Symbol, u64>,
    pub portfolio_value: f64,
    pub profit_or_loss: f64,
}

/// Aggregate root: Ledger (cash + share holdings of one owner).
///
/// Invariants:
/// - every entry in `holdings` has quantity > 0
/// - `transactions` is append-only, in chronological order
/// - the cash balance never goes negative through an operation the ledger authorizes
#[derive(Debug, Clone)]
pub struct Ledger {
    id: AccountId,
    owner_id: OwnerId,
    cash_balance: f64,
    initial_deposit: f64,
    holdings: BTreeMap<Symbol, u64>,
    transactions: Vec<TransactionRecord>,
    prices: Arc<dyn PriceLookup>,
    version: u64,
}

impl Ledger {
    /// Open a ledger with a fresh identifier.
    pub fn open(
        owner_id: OwnerId,
        initial_deposit: f64,
        prices: Arc<dyn PriceLookup>,
    ) -> DomainResult<Self> {
        Self::open_with_id(AccountId::new(), owner_id, initial_deposit, prices)
    }

    /// Open a ledger under a caller-chosen identifier.
    ///
    /// The opening deposit is taken as-is; only non-finite values are rejected.
    pub fn open_with_id(
        id: AccountId,
        owner_id: OwnerId,
        initial_deposit: f64,
        prices: Arc<dyn PriceLookup>,
    ) -> DomainResult<Self> {
        if !initial_deposit.is_finite() {
            return Err(DomainError::validation("initial deposit must be a finite number"));
        }
        Ok(Self {
            id,
            owner_id,
            cash_balance: initial_deposit,
            initial_deposit,
            holdings: BTreeMap::new(),
            transactions: Vec::new(),
            prices,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> AccountId {
        self.id
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn balance(&self) -> f64 {
        self.cash_balance
    }

    pub fn initial_deposit(&self) -> f64 {
        self.initial_deposit
    }

    /// Quantity held of `symbol` (0 when absent).
    pub fn quantity_of(&self, symbol: &Symbol) -> u64 {
        self.holdings.get(symbol).copied().unwrap_or(0)
    }

    /// Current unit price of `symbol` according to the ledger's price source.
    pub fn price_of(&self, symbol: &Symbol) -> f64 {
        self.prices.price(symbol)
    }

    /// Add funds. Rejects non-positive (and non-finite) amounts.
    pub fn deposit(&mut self, amount: f64) -> DomainResult<()> {
        let command = LedgerCommand::Deposit(Deposit {
            amount,
            occurred_at: Utc::now(),
        });
        self.execute(&command).map(|_| ())
    }

    /// Debit funds; `true` iff `0 < amount <= balance`.
    pub fn withdraw(&mut self, amount: f64) -> bool {
        self.try_execute(LedgerCommand::Withdraw(Withdraw {
            amount,
            occurred_at: Utc::now(),
        }))
    }

    /// Buy at the current price; `true` iff `quantity > 0` and the cost is covered.
    pub fn buy(&mut self, symbol: &Symbol, quantity: u64) -> bool {
        self.try_execute(LedgerCommand::Buy(BuyShares {
            symbol: symbol.clone(),
            quantity,
            occurred_at: Utc::now(),
        }))
    }

    /// Sell at the current price; `true` iff `0 < quantity <= held`.
    pub fn sell(&mut self, symbol: &Symbol, quantity: u64) -> bool {
        self.try_execute(LedgerCommand::Sell(SellShares {
            symbol: symbol.clone(),
            quantity,
            occurred_at: Utc::now(),
        }))
    }

    /// Cash plus the current value of every holding.
    pub fn portfolio_value(&self) -> f64 {
        let holdings_value: f64 = self
            .holdings
            .iter()
            .map(|(symbol, quantity)| self.prices.price(symbol) * *quantity as f64)
            .sum();
        self.cash_balance + holdings_value
    }

    pub fn profit_or_loss(&self) -> f64 {
        self.portfolio_value() - self.initial_deposit
    }

    pub fn holdings_snapshot(&self) -> BTreeMap<Symbol, u64> {
        self.holdings.clone()
    }

    pub fn transactions_snapshot(&self) -> Vec<TransactionRecord> {
        self.transactions.clone()
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            owner_id: self.owner_id.clone(),
            balance: self.cash_balance,
            holdings: self.holdings_snapshot(),
            portfolio_value: self.portfolio_value(),
            profit_or_loss: self.profit_or_loss(),
        }
    }

    fn try_execute(&mut self, command: LedgerCommand) -> bool {
        match self.execute(&command) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(account_id = %self.id, error = %err, "ledger command rejected");
                false
            }
        }
    }
}

impl AggregateRoot for Ledger {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Ledger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::FundsDeposited(e) => {
                self.cash_balance += e.amount;
            }
            LedgerEvent::FundsWithdrawn(e) => {
                self.cash_balance -= e.amount;
            }
            LedgerEvent::SharesBought(e) => {
                self.cash_balance -= e.unit_price * e.quantity as f64;
                let held = self.holdings.entry(e.symbol.clone()).or_insert(0);
                *held = held.saturating_add(e.quantity);
                self.transactions.push(TransactionRecord::new(
                    TradeAction::Buy,
                    e.symbol.clone(),
                    e.quantity,
                    e.unit_price,
                    e.occurred_at,
                ));
            }
            LedgerEvent::SharesSold(e) => {
                self.cash_balance += e.unit_price * e.quantity as f64;
                if let Some(held) = self.holdings.get_mut(&e.symbol) {
                    *held = held.saturating_sub(e.quantity);
                    if *held == 0 {
                        self.holdings.remove(&e.symbol);
                    }
                }
                self.transactions.push(TransactionRecord::new(
                    TradeAction::Sell,
                    e.symbol.clone(),
                    e.quantity,
                    e.unit_price,
                    e.occurred_at,
                ));
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::Deposit(cmd) => self.handle_deposit(cmd),
            LedgerCommand::Withdraw(cmd) => self.handle_withdraw(cmd),
            LedgerCommand::Buy(cmd) => self.handle_buy(cmd),
            LedgerCommand::Sell(cmd) => self.handle_sell(cmd),
        }
    }
}

impl Ledger {
    fn ensure_positive_amount(amount: f64) -> Result<(), DomainError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(DomainError::validation("amount must be positive"));
        }
        Ok(())
    }

    fn ensure_positive_quantity(quantity: u64) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }

    fn ensure_balance_stays_finite(&self, credit: f64) -> Result<(), DomainError> {
        if !(self.cash_balance + credit).is_finite() {
            return Err(DomainError::validation("cash balance would overflow"));
        }
        Ok(())
    }

    fn quote(&self, symbol: &Symbol) -> Result<f64, DomainError> {
        let price = self.prices.price(symbol);
        if !price.is_finite() || price < 0.0 {
            return Err(DomainError::invariant(format!(
                "price source returned an invalid price for {symbol}: {price}"
            )));
        }
        if price == 0.0 {
            tracing::warn!(account_id = %self.id, %symbol, "trading unpriced symbol at zero");
        }
        Ok(price)
    }

    fn handle_deposit(&self, cmd: &Deposit) -> Result<Vec<LedgerEvent>, DomainError> {
        Self::ensure_positive_amount(cmd.amount)?;
        self.ensure_balance_stays_finite(cmd.amount)?;

        Ok(vec![LedgerEvent::FundsDeposited(FundsDeposited {
            account_id: self.id,
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &Withdraw) -> Result<Vec<LedgerEvent>, DomainError> {
        Self::ensure_positive_amount(cmd.amount)?;
        if cmd.amount > self.cash_balance {
            return Err(DomainError::insufficient_funds(cmd.amount, self.cash_balance));
        }

        Ok(vec![LedgerEvent::FundsWithdrawn(FundsWithdrawn {
            account_id: self.id,
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_buy(&self, cmd: &BuyShares) -> Result<Vec<LedgerEvent>, DomainError> {
        Self::ensure_positive_quantity(cmd.quantity)?;
        if self.quantity_of(&cmd.symbol).checked_add(cmd.quantity).is_none() {
            return Err(DomainError::validation(format!(
                "holding of {} would exceed {} shares",
                cmd.symbol,
                u64::MAX
            )));
        }

        let unit_price = self.quote(&cmd.symbol)?;
        let cost = unit_price * cmd.quantity as f64;
        if cost > self.cash_balance {
            return Err(DomainError::insufficient_funds(cost, self.cash_balance));
        }

        Ok(vec![LedgerEvent::SharesBought(SharesBought {
            account_id: self.id,
            symbol: cmd.symbol.clone(),
            quantity: cmd.quantity,
            unit_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_sell(&self, cmd: &SellShares) -> Result<Vec<LedgerEvent>, DomainError> {
        Self::ensure_positive_quantity(cmd.quantity)?;

        let held = self.quantity_of(&cmd.symbol);
        if held < cmd.quantity {
            return Err(DomainError::insufficient_holdings(
                cmd.symbol.as_str(),
                cmd.quantity,
                held,
            ));
        }
        let unit_price = self.quote(&cmd.symbol)?;
        self.ensure_balance_stays_finite(unit_price * cmd.quantity as f64)?;

        Ok(vec![LedgerEvent::SharesSold(SharesSold {
            account_id: self.id,
            symbol: cmd.symbol.clone(),
            quantity: cmd.quantity,
            unit_price,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::FixedPriceTable;
    use proptest::prelude::*;

    fn sym(raw: &str) -> Symbol {
        Symbol::parse(raw).unwrap()
    }

    fn test_prices() -> Arc<dyn PriceLookup> {
        Arc::new(FixedPriceTable::default())
    }

    fn test_ledger(initial_deposit: f64) -> Ledger {
        Ledger::open(OwnerId::new("test123").unwrap(), initial_deposit, test_prices()).unwrap()
    }

    #[test]
    fn opens_with_empty_holdings_and_log() {
        let ledger = test_ledger(1000.0);
        assert_eq!(ledger.owner_id().as_str(), "test123");
        assert_eq!(ledger.balance(), 1000.0);
        assert_eq!(ledger.initial_deposit(), 1000.0);
        assert!(ledger.holdings_snapshot().is_empty());
        assert!(ledger.transactions_snapshot().is_empty());
        assert_eq!(ledger.version(), 0);
    }

    #[test]
    fn non_finite_opening_deposit_is_rejected() {
        let err = Ledger::open(OwnerId::new("x").unwrap(), f64::INFINITY, test_prices()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn deposit_adds_funds_and_rejects_non_positive_amounts() {
        let mut ledger = test_ledger(1000.0);
        ledger.deposit(500.0).unwrap();
        assert_eq!(ledger.balance(), 1500.0);

        for bad in [0.0, -100.0, f64::NAN] {
            let err = ledger.deposit(bad).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
        assert_eq!(ledger.balance(), 1500.0);
        assert!(ledger.transactions_snapshot().is_empty());
    }

    #[test]
    fn deposit_that_overflows_the_balance_is_rejected() {
        let mut ledger = test_ledger(0.0);
        ledger.deposit(1e308).unwrap();
        let err = ledger.deposit(1e308).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(ledger.balance(), 1e308);
        assert_eq!(ledger.version(), 1);
        assert!(ledger.profit_or_loss().is_finite());
    }

    #[test]
    fn withdraw_requires_positive_amount_within_balance() {
        let mut ledger = test_ledger(1000.0);
        assert!(ledger.withdraw(200.0));
        assert_eq!(ledger.balance(), 800.0);

        assert!(!ledger.withdraw(2000.0));
        assert!(!ledger.withdraw(0.0));
        assert!(!ledger.withdraw(-50.0));
        assert_eq!(ledger.balance(), 800.0);

        assert!(ledger.withdraw(800.0));
        assert_eq!(ledger.balance(), 0.0);
    }

    #[test]
    fn buy_then_sell_scenario() {
        let mut ledger = test_ledger(1000.0);
        let aapl = sym("AAPL");

        assert!(ledger.buy(&aapl, 5));
        assert_eq!(ledger.balance(), 250.0);
        assert_eq!(ledger.holdings_snapshot(), BTreeMap::from([(aapl.clone(), 5)]));

        assert!(ledger.sell(&aapl, 2));
        assert_eq!(ledger.balance(), 550.0);
        assert_eq!(ledger.holdings_snapshot(), BTreeMap::from([(aapl.clone(), 3)]));

        let log = ledger.transactions_snapshot();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].action(), TradeAction::Buy);
        assert_eq!(log[0].quantity(), 5);
        assert_eq!(log[0].unit_price(), 150.0);
        assert_eq!(log[1].action(), TradeAction::Sell);
        assert_eq!(log[1].quantity(), 2);
        assert!(log[0].timestamp() <= log[1].timestamp());
    }

    #[test]
    fn unaffordable_buy_leaves_state_untouched() {
        let mut ledger = test_ledger(200.0);
        let aapl = sym("AAPL");

        assert!(!ledger.buy(&aapl, 5));
        assert_eq!(ledger.balance(), 200.0);
        assert_eq!(ledger.quantity_of(&aapl), 0);
        assert!(!ledger.holdings_snapshot().contains_key(&aapl));
        assert!(ledger.transactions_snapshot().is_empty());
        assert_eq!(ledger.version(), 0);
    }

    #[test]
    fn typed_path_reports_rejection_reason() {
        let mut ledger = test_ledger(200.0);
        let cmd = LedgerCommand::Buy(BuyShares {
            symbol: sym("AAPL"),
            quantity: 5,
            occurred_at: Utc::now(),
        });
        match ledger.execute(&cmd).unwrap_err() {
            DomainError::InsufficientFunds {
                requested,
                available,
            } => {
                assert_eq!(requested, 750.0);
                assert_eq!(available, 200.0);
            }
            other => panic!("expected insufficient funds, got {other:?}"),
        }

        let cmd = LedgerCommand::Sell(SellShares {
            symbol: sym("TSLA"),
            quantity: 1,
            occurred_at: Utc::now(),
        });
        assert_eq!(
            ledger.execute(&cmd).unwrap_err(),
            DomainError::insufficient_holdings("TSLA", 1, 0)
        );
    }

    #[test]
    fn buy_rejects_zero_quantity_and_unaffordable_orders() {
        let mut ledger = test_ledger(1000.0);
        assert!(ledger.buy(&sym("AAPL"), 2));
        assert_eq!(ledger.balance(), 700.0);
        assert!(!ledger.buy(&sym("TSLA"), 2));
        assert!(!ledger.buy(&sym("GOOGL"), 0));
        assert_eq!(ledger.transactions_snapshot().len(), 1);
    }

    #[test]
    fn sell_requires_enough_shares() {
        let mut ledger = test_ledger(1000.0);
        let aapl = sym("AAPL");
        assert!(ledger.buy(&aapl, 3));
        assert!(ledger.sell(&aapl, 2));
        assert_eq!(ledger.quantity_of(&aapl), 1);
        assert_eq!(ledger.balance(), 1000.0 - 3.0 * 150.0 + 2.0 * 150.0);

        assert!(!ledger.sell(&aapl, 2));
        assert!(!ledger.sell(&sym("TSLA"), 1));
        assert!(!ledger.sell(&aapl, 0));
        assert_eq!(ledger.transactions_snapshot().len(), 2);
    }

    #[test]
    fn selling_everything_removes_the_holding() {
        let mut ledger = test_ledger(1000.0);
        let tsla = sym("TSLA");
        assert!(ledger.buy(&tsla, 1));
        assert!(ledger.holdings_snapshot().contains_key(&tsla));
        assert!(ledger.sell(&tsla, 1));
        assert!(!ledger.holdings_snapshot().contains_key(&tsla));
        assert_eq!(ledger.balance(), 1000.0);
    }

    #[test]
    fn unknown_symbols_trade_at_zero() {
        let mut ledger = test_ledger(10.0);
        let unknown = sym("NOPE");
        assert!(ledger.buy(&unknown, 4));
        assert_eq!(ledger.balance(), 10.0);
        assert_eq!(ledger.quantity_of(&unknown), 4);
        assert_eq!(ledger.portfolio_value(), 10.0);
        assert!(ledger.sell(&unknown, 4));
        assert_eq!(ledger.transactions_snapshot()[1].unit_price(), 0.0);
    }

    #[test]
    fn buy_that_overflows_the_holding_is_rejected() {
        let mut ledger = test_ledger(10.0);
        let unknown = sym("ZZZZ");
        assert!(ledger.buy(&unknown, u64::MAX));
        assert!(!ledger.buy(&unknown, 1));
        assert_eq!(ledger.quantity_of(&unknown), u64::MAX);
        assert_eq!(ledger.transactions_snapshot().len(), 1);

        let err = ledger
            .execute(&LedgerCommand::Buy(BuyShares {
                symbol: unknown.clone(),
                quantity: 1,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        assert!(ledger.sell(&unknown, u64::MAX));
        assert!(ledger.holdings_snapshot().is_empty());
    }

    #[test]
    fn sale_that_overflows_the_balance_is_rejected() {
        let prices: Arc<dyn PriceLookup> =
            Arc::new(FixedPriceTable::from_pairs([("BIG", 1e308)]).unwrap());
        let mut ledger = Ledger::open(OwnerId::new("test123").unwrap(), 1e308, prices).unwrap();
        let big = sym("BIG");
        assert!(ledger.buy(&big, 1));
        ledger.deposit(1.7e308).unwrap();

        assert!(!ledger.sell(&big, 1));
        assert_eq!(ledger.quantity_of(&big), 1);
        assert_eq!(ledger.balance(), 1.7e308);
        assert_eq!(ledger.transactions_snapshot().len(), 1);
    }

    #[test]
    fn valuation_and_profit_or_loss() {
        let mut ledger = test_ledger(1000.0);
        assert!(ledger.buy(&sym("AAPL"), 2));
        assert_eq!(ledger.portfolio_value(), 700.0 + 2.0 * 150.0);
        assert_eq!(ledger.profit_or_loss(), 0.0);

        assert!(ledger.withdraw(100.0));
        assert_eq!(ledger.profit_or_loss(), -100.0);
    }

    #[test]
    fn snapshots_are_defensive_copies() {
        let mut ledger = test_ledger(1000.0);
        let aapl = sym("AAPL");
        assert!(ledger.buy(&aapl, 1));

        let mut holdings = ledger.holdings_snapshot();
        holdings.insert(aapl.clone(), 100);
        assert_eq!(ledger.quantity_of(&aapl), 1);

        let mut log = ledger.transactions_snapshot();
        log.clear();
        assert_eq!(ledger.transactions_snapshot().len(), 1);
    }

    #[test]
    fn summary_aggregates_the_account() {
        let mut ledger = test_ledger(1000.0);
        assert!(ledger.buy(&sym("AAPL"), 5));
        let summary = ledger.summary();
        assert_eq!(summary.owner_id.as_str(), "test123");
        assert_eq!(summary.balance, 250.0);
        assert_eq!(summary.holdings.get(&sym("AAPL")), Some(&5));
        assert_eq!(summary.portfolio_value, 1000.0);
        assert_eq!(summary.profit_or_loss, 0.0);
    }

    #[test]
    fn events_are_typed_and_versioned() {
        let mut ledger = test_ledger(1000.0);
        let at = Utc::now();
        let events = ledger
            .execute(&LedgerCommand::Deposit(Deposit {
                amount: 10.0,
                occurred_at: at,
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "ledger.funds_deposited");
        assert_eq!(events[0].occurred_at(), at);
        assert_eq!(ledger.version(), 1);
    }

    #[test]
    fn replaying_events_rebuilds_state() {
        let prices = test_prices();
        let id = AccountId::new();
        let owner = OwnerId::new("replay").unwrap();
        let mut live = Ledger::open_with_id(id, owner.clone(), 1000.0, prices.clone()).unwrap();

        let mut history = Vec::new();
        for cmd in [
            LedgerCommand::Buy(BuyShares {
                symbol: sym("AAPL"),
                quantity: 3,
                occurred_at: Utc::now(),
            }),
            LedgerCommand::Sell(SellShares {
                symbol: sym("AAPL"),
                quantity: 1,
                occurred_at: Utc::now(),
            }),
        ] {
            history.extend(live.execute(&cmd).unwrap());
        }

        let mut replayed = Ledger::open_with_id(id, owner, 1000.0, prices).unwrap();
        for event in &history {
            replayed.apply(event);
        }
        assert_eq!(replayed.summary(), live.summary());
        assert_eq!(replayed.transactions_snapshot(), live.transactions_snapshot());
        assert_eq!(replayed.version(), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Deposit(f64),
        Withdraw(f64),
        Buy(&'static str, u64),
        Sell(&'static str, u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let symbol = prop::sample::select(vec!["AAPL", "TSLA", "GOOGL", "ZZZZ"]);
        prop_oneof![
            (-100.0f64..5_000.0).prop_map(Op::Deposit),
            (-100.0f64..5_000.0).prop_map(Op::Withdraw),
            (symbol.clone(), 0u64..8).prop_map(|(s, q)| Op::Buy(s, q)),
            (symbol, 0u64..8).prop_map(|(s, q)| Op::Sell(s, q)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every guarded transition either fully applies or fully
        /// rejects, and valuation identities hold in every reachable state.
        #[test]
        fn ledger_invariants_hold_for_any_operation_sequence(
            initial in 0.0f64..20_000.0,
            ops in prop::collection::vec(op_strategy(), 1..40)
        ) {
            let prices = FixedPriceTable::default();
            let mut ledger = test_ledger(initial);

            for op in ops {
                let before = ledger.clone();
                let log_len = before.transactions_snapshot().len();

                match op {
                    Op::Deposit(amount) => {
                        let ok = ledger.deposit(amount).is_ok();
                        prop_assert_eq!(ok, amount > 0.0);
                        if ok {
                            prop_assert_eq!(ledger.balance(), before.balance() + amount);
                        } else {
                            prop_assert_eq!(ledger.balance(), before.balance());
                        }
                        prop_assert_eq!(ledger.transactions_snapshot().len(), log_len);
                    }
                    Op::Withdraw(amount) => {
                        let ok = ledger.withdraw(amount);
                        prop_assert_eq!(ok, amount > 0.0 && amount <= before.balance());
                        if ok {
                            prop_assert_eq!(ledger.balance(), before.balance() - amount);
                        } else {
                            prop_assert_eq!(ledger.balance(), before.balance());
                        }
                    }
                    Op::Buy(raw, quantity) => {
                        let symbol = sym(raw);
                        let price = prices.price(&symbol);
                        let cost = price * quantity as f64;
                        let ok = ledger.buy(&symbol, quantity);
                        prop_assert_eq!(ok, quantity > 0 && cost <= before.balance());
                        if ok {
                            prop_assert_eq!(
                                ledger.quantity_of(&symbol),
                                before.quantity_of(&symbol) + quantity
                            );
                            let log = ledger.transactions_snapshot();
                            prop_assert_eq!(log.len(), log_len + 1);
                            let last = log.last().unwrap();
                            prop_assert_eq!(last.action(), TradeAction::Buy);
                            prop_assert_eq!(last.unit_price(), price);
                        } else {
                            prop_assert_eq!(ledger.summary(), before.summary());
                            prop_assert_eq!(ledger.transactions_snapshot().len(), log_len);
                        }
                    }
                    Op::Sell(raw, quantity) => {
                        let symbol = sym(raw);
                        let held = before.quantity_of(&symbol);
                        let ok = ledger.sell(&symbol, quantity);
                        prop_assert_eq!(ok, quantity > 0 && quantity <= held);
                        if ok {
                            prop_assert_eq!(
                                ledger.balance(),
                                before.balance() + prices.price(&symbol) * quantity as f64
                            );
                            prop_assert_eq!(
                                ledger.holdings_snapshot().contains_key(&symbol),
                                held - quantity > 0
                            );
                            prop_assert_eq!(ledger.transactions_snapshot().len(), log_len + 1);
                        } else {
                            prop_assert_eq!(ledger.summary(), before.summary());
                            prop_assert_eq!(ledger.transactions_snapshot().len(), log_len);
                        }
                    }
                }

                prop_assert!(ledger.balance() >= 0.0);
                prop_assert!(ledger.holdings_snapshot().values().all(|q| *q > 0));

                let holdings_value: f64 = ledger
                    .holdings_snapshot()
                    .iter()
                    .map(|(symbol, quantity)| prices.price(symbol) * *quantity as f64)
                    .sum();
                prop_assert_eq!(ledger.portfolio_value(), ledger.balance() + holdings_value);
                prop_assert_eq!(
                    ledger.profit_or_loss(),
                    ledger.portfolio_value() - ledger.initial_deposit()
                );
            }
        }
    }
}

use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;

use tradesim_core::{AccountId, DomainError, OwnerId};
use tradesim_infra::{AccountRegistry, RegistryError};
use tradesim_ledger::{FixedPriceTable, PriceLookup, Symbol};

use crate::command::{SessionCommand, USAGE};

const NO_ACCOUNT: &str = "Please create an account first.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to render summary: {0}")]
    Render(#[from] serde_json::Error),
}

/// One interactive user working against a registry.
///
/// Holds only the handle of the current account; all state lives in the
/// registry.
#[derive(Debug)]
pub struct Session {
    registry: Arc<AccountRegistry>,
    prices: FixedPriceTable,
    default_owner: OwnerId,
    current: Option<AccountId>,
}

impl Session {
    pub fn new(registry: Arc<AccountRegistry>, prices: FixedPriceTable, default_owner: OwnerId) -> Self {
        Self {
            registry,
            prices,
            default_owner,
            current: None,
        }
    }

    pub fn current_account(&self) -> Option<AccountId> {
        self.current
    }

    /// Execute a command and return the reply text.
    ///
    /// Business rejections are replies, not errors; errors are reserved for
    /// registry failures.
    pub fn execute(&mut self, command: SessionCommand) -> Result<String, SessionError> {
        match command {
            SessionCommand::Open {
                initial_deposit,
                owner,
            } => self.open(initial_deposit, owner),
            SessionCommand::Deposit(amount) => self.on_account(|s, id| s.deposit(id, amount)),
            SessionCommand::Withdraw(amount) => self.on_account(|s, id| s.withdraw(id, amount)),
            SessionCommand::Buy { symbol, quantity } => {
                self.on_account(|s, id| s.buy(id, &symbol, quantity))
            }
            SessionCommand::Sell { symbol, quantity } => {
                self.on_account(|s, id| s.sell(id, &symbol, quantity))
            }
            SessionCommand::Holdings => self.on_account(Self::render_holdings),
            SessionCommand::Transactions => self.on_account(Self::render_transactions),
            SessionCommand::Summary { json: true } => self.on_account(|s, id| {
                Ok(serde_json::to_string_pretty(&s.registry.summary(id)?)?)
            }),
            SessionCommand::Summary { json: false } => self.on_account(Self::render_summary),
            SessionCommand::Prices => Ok(self.render_prices()),
            SessionCommand::Help => Ok(USAGE.to_string()),
            SessionCommand::Quit => Ok("Goodbye.".to_string()),
        }
    }

    fn on_account(
        &self,
        f: impl FnOnce(&Self, AccountId) -> Result<String, SessionError>,
    ) -> Result<String, SessionError> {
        match self.current {
            Some(id) => f(self, id),
            None => Ok(NO_ACCOUNT.to_string()),
        }
    }

    fn open(&mut self, initial_deposit: f64, owner: Option<String>) -> Result<String, SessionError> {
        if initial_deposit <= 0.0 {
            return Ok("Initial deposit must be greater than zero.".to_string());
        }
        let owner_id = match owner {
            Some(raw) => match OwnerId::new(raw) {
                Ok(owner_id) => owner_id,
                Err(err) => return Ok(format!("Invalid owner: {err}")),
            },
            None => self.default_owner.clone(),
        };

        let id = self.registry.open(owner_id.clone(), initial_deposit)?;
        if let Some(previous) = self.current.replace(id) {
            self.registry.close(previous)?;
        }
        Ok(format!(
            "Account created for {owner_id} with initial deposit {}.",
            money(initial_deposit)
        ))
    }

    fn deposit(&self, id: AccountId, amount: f64) -> Result<String, SessionError> {
        match self.registry.deposit(id, amount) {
            Ok(()) => Ok(format!(
                "Deposited {}. New balance: {}.",
                money(amount),
                money(self.registry.summary(id)?.balance)
            )),
            Err(RegistryError::Domain(DomainError::Validation(_))) => {
                Ok("Deposit amount must be positive.".to_string())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn withdraw(&self, id: AccountId, amount: f64) -> Result<String, SessionError> {
        if amount <= 0.0 {
            return Ok("Withdrawal amount must be positive.".to_string());
        }
        if !self.registry.withdraw(id, amount)? {
            return Ok("Insufficient funds for withdrawal.".to_string());
        }
        Ok(format!(
            "Withdrew {}. New balance: {}.",
            money(amount),
            money(self.registry.summary(id)?.balance)
        ))
    }

    fn buy(&self, id: AccountId, symbol: &Symbol, quantity: i64) -> Result<String, SessionError> {
        let Some(quantity) = positive_quantity(quantity) else {
            return Ok("Quantity must be greater than zero.".to_string());
        };
        if !self.prices.is_priced(symbol) {
            return Ok(self.invalid_symbol_reply());
        }
        if !self.registry.buy(id, symbol, quantity)? {
            return Ok("Insufficient funds to buy shares.".to_string());
        }
        self.trade_reply("Bought", id, symbol, quantity)
    }

    fn sell(&self, id: AccountId, symbol: &Symbol, quantity: i64) -> Result<String, SessionError> {
        let Some(quantity) = positive_quantity(quantity) else {
            return Ok("Quantity must be greater than zero.".to_string());
        };
        if !self.prices.is_priced(symbol) {
            return Ok(self.invalid_symbol_reply());
        }
        if !self.registry.sell(id, symbol, quantity)? {
            return Ok("Not enough shares to sell.".to_string());
        }
        self.trade_reply("Sold", id, symbol, quantity)
    }

    fn trade_reply(
        &self,
        verb: &str,
        id: AccountId,
        symbol: &Symbol,
        quantity: u64,
    ) -> Result<String, SessionError> {
        // The ledger record holds the executed price.
        let unit_price = match self.registry.transactions(id)?.last() {
            Some(record) => record.unit_price(),
            None => self.registry.prices().price(symbol),
        };
        let balance = self.registry.summary(id)?.balance;
        Ok(format!(
            "{verb} {quantity} shares of {symbol} at {} each. New balance: {}.",
            money(unit_price),
            money(balance)
        ))
    }

    fn invalid_symbol_reply(&self) -> String {
        let symbols: Vec<String> = self
            .prices
            .entries()
            .map(|(symbol, _)| symbol.to_string())
            .collect();
        match symbols.as_slice() {
            [] => "Invalid symbol. No prices configured.".to_string(),
            [only] => format!("Invalid symbol. Choose {only}."),
            [init @ .., last] => format!("Invalid symbol. Choose {}, or {last}.", init.join(", ")),
        }
    }

    fn render_holdings(&self, id: AccountId) -> Result<String, SessionError> {
        let holdings = self.registry.holdings(id)?;
        if holdings.is_empty() {
            return Ok("No holdings.".to_string());
        }
        let prices = self.registry.prices();
        let lines: Vec<String> = holdings
            .iter()
            .map(|(symbol, quantity)| {
                let price = prices.price(symbol);
                format!(
                    "{symbol}: {quantity} shares @ {} = {}",
                    money(price),
                    money(price * *quantity as f64)
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn render_transactions(&self, id: AccountId) -> Result<String, SessionError> {
        let transactions = self.registry.transactions(id)?;
        if transactions.is_empty() {
            return Ok("No transactions.".to_string());
        }
        let lines: Vec<String> = transactions
            .iter()
            .map(|t| {
                format!(
                    "{} {} {} {} @ {}",
                    t.timestamp().format("%Y-%m-%d %H:%M:%S"),
                    t.action(),
                    t.quantity(),
                    t.symbol(),
                    money(t.unit_price())
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn render_summary(&self, id: AccountId) -> Result<String, SessionError> {
        let summary = self.registry.summary(id)?;
        let mut out = String::new();
        let _ = writeln!(out, "Owner: {}", summary.owner_id);
        let _ = writeln!(out, "Cash balance: {}", money(summary.balance));
        let _ = writeln!(out, "Portfolio value: {}", money(summary.portfolio_value));
        let _ = writeln!(out, "Profit/Loss: {}", money(summary.profit_or_loss));
        if summary.holdings.is_empty() {
            out.push_str("Holdings: none");
        } else {
            let held: Vec<String> = summary
                .holdings
                .iter()
                .map(|(symbol, quantity)| format!("{symbol} x{quantity}"))
                .collect();
            let _ = write!(out, "Holdings: {}", held.join(", "));
        }
        Ok(out)
    }

    fn render_prices(&self) -> String {
        let lines: Vec<String> = self
            .prices
            .entries()
            .map(|(symbol, price)| format!("{symbol}: {}", money(price)))
            .collect();
        if lines.is_empty() {
            return "No prices configured.".to_string();
        }
        lines.join("\n")
    }
}

fn positive_quantity(quantity: i64) -> Option<u64> {
    u64::try_from(quantity).ok().filter(|q| *q > 0)
}

fn money(value: f64) -> String {
    if value < 0.0 {
        format!("-${:.2}", -value)
    } else {
        format!("${value:.2}")
    }
}

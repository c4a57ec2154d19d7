use core::str::FromStr;

use thiserror::Error;

use tradesim_core::DomainError;
use tradesim_ledger::Symbol;

pub const USAGE: &str = "\
commands:
  open <amount> [owner]     open a new account (replaces the current one)
  deposit <amount>          add funds
  withdraw <amount>         remove funds
  buy <symbol> <quantity>   buy shares at the fixed price
  sell <symbol> <quantity>  sell shares at the fixed price
  holdings                  list current holdings
  transactions              list completed trades
  summary [json]            account summary
  prices                    list known share prices
  help                      show this text
  quit                      leave the session";

/// One parsed input line.
///
/// Amounts and quantities are kept as typed by the user (including
/// non-positive values) so the session can answer with the matching message.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Open {
        initial_deposit: f64,
        owner: Option<String>,
    },
    Deposit(f64),
    Withdraw(f64),
    Buy {
        symbol: Symbol,
        quantity: i64,
    },
    Sell {
        symbol: Symbol,
        quantity: i64,
    },
    Holdings,
    Transactions,
    Summary {
        json: bool,
    },
    Prices,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?} (type `help` for a list)")]
    UnknownCommand(String),

    #[error("{command}: missing {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("{command}: unexpected argument {extra:?}")]
    UnexpectedArgument { command: &'static str, extra: String },

    #[error("{argument} must be a number, got {value:?}")]
    InvalidNumber {
        argument: &'static str,
        value: String,
    },

    #[error("invalid symbol: {0}")]
    InvalidSymbol(#[source] DomainError),
}

struct Args<'a> {
    command: &'static str,
    rest: core::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn required(&mut self, argument: &'static str) -> Result<&'a str, ParseCommandError> {
        self.rest.next().ok_or(ParseCommandError::MissingArgument {
            command: self.command,
            argument,
        })
    }

    fn amount(&mut self, argument: &'static str) -> Result<f64, ParseCommandError> {
        let raw = self.required(argument)?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseCommandError::InvalidNumber {
                argument,
                value: raw.to_string(),
            })
    }

    fn quantity(&mut self) -> Result<i64, ParseCommandError> {
        let raw = self.required("quantity")?;
        raw.parse::<i64>()
            .map_err(|_| ParseCommandError::InvalidNumber {
                argument: "quantity",
                value: raw.to_string(),
            })
    }

    fn symbol(&mut self) -> Result<Symbol, ParseCommandError> {
        let raw = self.required("symbol")?;
        Symbol::parse(raw).map_err(ParseCommandError::InvalidSymbol)
    }

    fn finish(mut self) -> Result<(), ParseCommandError> {
        match self.rest.next() {
            Some(extra) => Err(ParseCommandError::UnexpectedArgument {
                command: self.command,
                extra: extra.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl FromStr for SessionCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ParseCommandError::Empty)?.to_ascii_lowercase();

        let command: &'static str = match verb.as_str() {
            "open" => "open",
            "deposit" => "deposit",
            "withdraw" => "withdraw",
            "buy" => "buy",
            "sell" => "sell",
            "holdings" => "holdings",
            "transactions" | "history" => "transactions",
            "summary" => "summary",
            "prices" => "prices",
            "help" | "?" => "help",
            "quit" | "exit" => "quit",
            _ => return Err(ParseCommandError::UnknownCommand(verb)),
        };
        let mut args = Args {
            command,
            rest: words,
        };

        let parsed = match command {
            "open" => {
                let initial_deposit = args.amount("amount")?;
                let owner = args.rest.next().map(str::to_string);
                SessionCommand::Open {
                    initial_deposit,
                    owner,
                }
            }
            "deposit" => SessionCommand::Deposit(args.amount("amount")?),
            "withdraw" => SessionCommand::Withdraw(args.amount("amount")?),
            "buy" => SessionCommand::Buy {
                symbol: args.symbol()?,
                quantity: args.quantity()?,
            },
            "sell" => SessionCommand::Sell {
                symbol: args.symbol()?,
                quantity: args.quantity()?,
            },
            "summary" => {
                let json = match args.rest.next() {
                    None => false,
                    Some(flag) if flag.eq_ignore_ascii_case("json") => true,
                    Some(other) => {
                        return Err(ParseCommandError::UnexpectedArgument {
                            command,
                            extra: other.to_string(),
                        });
                    }
                };
                SessionCommand::Summary { json }
            }
            "holdings" => SessionCommand::Holdings,
            "transactions" => SessionCommand::Transactions,
            "prices" => SessionCommand::Prices,
            "help" => SessionCommand::Help,
            _ => SessionCommand::Quit,
        };

        args.finish()?;
        Ok(parsed)
    }
}

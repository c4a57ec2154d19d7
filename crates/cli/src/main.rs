use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;

use tradesim_cli::{Session, SessionCommand};
use tradesim_infra::{AccountRegistry, SimConfig};

fn main() -> anyhow::Result<()> {
    tradesim_observability::init();

    let config = SimConfig::from_env().context("failed to load configuration")?;
    tracing::info!(
        owner_id = %config.owner_id,
        opening_deposit = config.opening_deposit,
        priced_symbols = config.prices.len(),
        "starting trading session"
    );

    let registry = Arc::new(AccountRegistry::new(Arc::new(config.prices.clone())));
    let mut session = Session::new(registry, config.prices, config.owner_id);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let greeting = session.execute(SessionCommand::Open {
        initial_deposit: config.opening_deposit,
        owner: None,
    })?;
    writeln!(out, "{greeting}")?;
    writeln!(out, "Type `help` for commands.")?;
    out.flush()?;

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<SessionCommand>() {
            Ok(SessionCommand::Quit) => break,
            Ok(command) => {
                let reply = session.execute(command)?;
                writeln!(out, "{reply}")?;
            }
            Err(err) => writeln!(out, "{err}")?,
        }
        out.flush()?;
    }

    tracing::info!("session ended");
    Ok(())
}

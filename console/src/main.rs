mod commands;
mod render;

use commands::Command;
use fund_core::{Config, FundOrchestrator, WalletRegistry};
use ledger_client::{
    Address, Crowdsale, FundToken, HttpLedgerClient, InMemoryLedger, LedgerClient,
    PrivateKeySigner, Signer,
};
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    dotenv::dotenv().ok();

    info!("Fund console starting...");

    // Load configuration
    let config = match std::env::var("FUND_CONSOLE_CONFIG") {
        Ok(path) => Config::from_file(&path)?,
        Err(_) => Config::from_env()?,
    };

    info!(
        "Configuration loaded - in-memory ledger: {}, confirmation timeout: {}s",
        config.ledger.in_memory, config.fund.confirmation_timeout_secs
    );

    let (client, fund_token, crowdsale, signer) = build_stack(&config)?;

    // Explicit role addresses win; the positional dev-chain binding is the
    // fallback
    let registry = if config.wallets.has_role_addresses() {
        config.wallets.role_registry()?
    } else {
        let accounts = client.accounts().await?;
        WalletRegistry::from_accounts(&accounts)?
    };
    let token = FundToken::new(client.clone(), fund_token);
    let crowdsale = Crowdsale::new(client.clone(), crowdsale);
    let orchestrator = FundOrchestrator::new(client, registry, token, crowdsale, signer, &config)?;

    let roles = orchestrator.registry();
    info!(
        "Wallet roles bound - AUM wallet: {}, burn wallet: {}, investors: {}",
        roles.aum_wallet(),
        roles.burn_wallet(),
        roles.investors().len()
    );
    info!("Fund console initialized successfully");

    render::banner();
    render::snapshot(&orchestrator.snapshot().await?);

    repl(&orchestrator).await
}

/// Build the ledger client, contract addresses and AUM signer per the
/// configured mode
fn build_stack(
    config: &Config,
) -> anyhow::Result<(Arc<dyn LedgerClient>, Address, Address, Arc<dyn Signer>)> {
    if config.ledger.in_memory {
        let ledger = Arc::new(InMemoryLedger::dev());
        let fund_token = ledger.fund_token_address().clone();
        let crowdsale = ledger.crowdsale_address().clone();

        // The dev chain derives its accounts from well-known seeds, so an
        // explicit key is optional here
        let signer: Arc<dyn Signer> = if config.wallets.aum_wallet_key.is_empty() {
            Arc::new(PrivateKeySigner::from_seed(InMemoryLedger::dev_seed(3)))
        } else {
            Arc::new(PrivateKeySigner::from_hex(&config.wallets.aum_wallet_key)?)
        };

        let client: Arc<dyn LedgerClient> = ledger;
        return Ok((client, fund_token, crowdsale, signer));
    }

    let client: Arc<dyn LedgerClient> = Arc::new(HttpLedgerClient::new(
        config.ledger.endpoint.clone(),
        Duration::from_secs(config.ledger.request_timeout_secs),
        Duration::from_millis(config.ledger.poll_interval_ms),
    )?);
    let fund_token = Address::parse(config.contracts.fund_token.clone())?;
    let crowdsale = Address::parse(config.contracts.crowdsale.clone())?;

    if config.wallets.aum_wallet_key.is_empty() {
        anyhow::bail!("FUND_AUM_WALLET_KEY is required when connecting to a remote ledger");
    }
    let signer: Arc<dyn Signer> =
        Arc::new(PrivateKeySigner::from_hex(&config.wallets.aum_wallet_key)?);

    Ok((client, fund_token, crowdsale, signer))
}

async fn repl(orchestrator: &FundOrchestrator) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("fund> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match commands::parse(line) {
            Ok(Command::Burn { amount }) => {
                dispatch(orchestrator.burn(&amount).await);
            }
            Ok(Command::Buy { investor, value }) => {
                dispatch(orchestrator.buy(investor, &value).await);
            }
            Ok(Command::Sell { investor, tokens }) => {
                dispatch(orchestrator.sell(investor, &tokens).await);
            }
            Ok(Command::Investor { index }) => {
                show_investor(orchestrator, index).await;
            }
            Ok(Command::Refresh) => match orchestrator.snapshot().await {
                Ok(snapshot) => render::snapshot(&snapshot),
                Err(e) => println!("❌ {}", e),
            },
            Ok(Command::Help) => render::help(),
            Ok(Command::Quit) => break,
            Err(message) => println!("{}", message),
        }
    }

    println!("bye");
    Ok(())
}

fn dispatch(outcome: fund_core::Result<fund_core::OperationReport>) {
    match outcome {
        Ok(report) => render::report(&report),
        Err(e) => println!("❌ {}", e),
    }
}

async fn show_investor(orchestrator: &FundOrchestrator, index: usize) {
    let snapshot = match orchestrator.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            println!("❌ {}", e);
            return;
        }
    };

    match snapshot.investors.get(index) {
        Some(investor) => {
            println!(
                "[{}] {}  tokens: {}  native base units: {}",
                investor.index, investor.address, investor.token_balance, investor.native_balance
            );
        }
        None => println!(
            "investor index {} out of range (pool holds {})",
            index,
            snapshot.investors.len()
        ),
    }
}

//! Fund Core
//!
//! Accounting and settlement layer for an operator-driven tokenized
//! fund. Binds fund roles to ledger wallets, computes assets under
//! management, and drives burn, buy and sell operations through a
//! validate / submit / confirm / snapshot pipeline.
//!
//! Redemptions settle in two legs that are not atomic: the token leg
//! moves tokens from the investor to the burn wallet, the native leg
//! pays the investor from the AUM wallet. A native leg that fails after
//! the token leg has settled is reported for manual reconciliation.
//!
//! # Example
//!
//! ```no_run
//! use fund_core::{Config, FundOrchestrator, WalletRegistry};
//! use ledger_client::{Crowdsale, FundToken, InMemoryLedger, LedgerClient, PrivateKeySigner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> fund_core::Result<()> {
//!     let ledger = Arc::new(InMemoryLedger::dev());
//!     let registry = WalletRegistry::from_accounts(&ledger.accounts().await?)?;
//!     let token = FundToken::new(ledger.clone(), ledger.fund_token_address().clone());
//!     let crowdsale = Crowdsale::new(ledger.clone(), ledger.crowdsale_address().clone());
//!     let signer = Arc::new(PrivateKeySigner::from_seed(InMemoryLedger::dev_seed(3)));
//!
//!     let orchestrator = FundOrchestrator::new(
//!         ledger,
//!         registry,
//!         token,
//!         crowdsale,
//!         signer,
//!         &Config::default(),
//!     )?;
//!
//!     let report = orchestrator.sell(0, "500").await?;
//!     println!("sell finished: {}", report.outcome.as_str());
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod aum;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod types;

// Re-exports
pub use aum::{compute_aum, DEFAULT_RESERVE_OFFSET};
pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::FundOrchestrator;
pub use registry::{WalletRegistry, WalletRole};
pub use types::*;

//! Ledger gateway
//!
//! Thin client for the external token ledger and its two fund contracts:
//!
//! 1. **Boundary trait**: `LedgerClient` (accounts, balances, calls,
//!    submissions, gas estimation, raw broadcast, receipt waits)
//! 2. **Transports**: `HttpLedgerClient` (JSON-RPC node) and
//!    `InMemoryLedger` (dev/test chain with real token semantics)
//! 3. **Signing**: `Signer` capability + software Ed25519 implementation
//! 4. **Bindings**: `FundToken` and `Crowdsale` typed contract clients

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod client;
pub mod contracts;
pub mod error;
pub mod http;
pub mod memory;
pub mod signer;
pub mod types;

// Re-exports
pub use client::LedgerClient;
pub use contracts::{Crowdsale, FundToken};
pub use error::{Error, Result};
pub use http::HttpLedgerClient;
pub use memory::{Genesis, InMemoryLedger};
pub use signer::{derive_address, PrivateKeySigner, Signer};
pub use types::*;

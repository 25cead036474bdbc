//! Error types for fund operations

use ledger_client::{TxHash, TxReceipt};
use thiserror::Error;

/// Result type for fund operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fund operation errors
#[derive(Error, Debug)]
pub enum Error {
    /// Startup-fatal misconfiguration (missing accounts, duplicate roles, bad values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operator input rejected before any ledger call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A submitted transaction was mined but reverted
    #[error("Ledger rejected transaction {}: {}", .receipt.tx_hash, .receipt.revert_reason.as_deref().unwrap_or("no reason given"))]
    LedgerRejected {
        /// Receipt of the reverted transaction
        receipt: TxReceipt,
    },

    /// Confirmation wait expired; the transaction may still mine
    #[error("Confirmation timeout after {waited_secs} seconds for transaction {tx_hash} (outcome unknown)")]
    ConfirmationTimeout {
        /// Hash of the unresolved transaction
        tx_hash: TxHash,
        /// Seconds waited before giving up
        waited_secs: u64,
    },

    /// Illegal settlement state transition
    #[error("Invalid settlement state: {0}")]
    InvalidState(String),

    /// Ledger gateway error
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_client::Error),
}

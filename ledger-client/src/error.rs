//! Error types for the ledger gateway

use crate::types::Address;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Node unreachable (transport failure)
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Node rejected the RPC request
    #[error("Ledger rejected request ({code}): {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// Address failed validation
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Transaction hash failed validation
    #[error("Invalid transaction hash: {0}")]
    InvalidTxHash(String),

    /// Wire encoding/decoding failure
    #[error("Codec error: {0}")]
    Codec(String),

    /// Signing failure
    #[error("Signing error: {0}")]
    Signing(String),

    /// Signature verification failure on a raw submission
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Account not managed by the node
    #[error("Unknown account: {0}")]
    UnknownAccount(Address),

    /// No contract deployed at the target address
    #[error("Unknown contract: {0}")]
    UnknownContract(Address),

    /// Contract does not expose the requested method
    #[error("Unknown contract method: {0}")]
    UnknownMethod(String),

    /// Raw submission carried a stale or future nonce
    #[error("Invalid nonce: expected {expected}, got {got}")]
    InvalidNonce {
        /// Next nonce the ledger will accept
        expected: u64,
        /// Nonce carried by the submission
        got: u64,
    },

    /// Sender cannot cover the transferred value
    #[error("Insufficient funds: account {account} holds {available}, needs {required}")]
    InsufficientFunds {
        /// Paying account
        account: Address,
        /// Value the transaction moves
        required: u128,
        /// Native balance actually held
        available: u128,
    },
}

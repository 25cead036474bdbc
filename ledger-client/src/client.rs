//! Ledger client boundary
//!
//! Everything above this crate talks to the ledger through `LedgerClient`.
//! Two implementations ship: `HttpLedgerClient` (JSON-RPC node) and
//! `InMemoryLedger` (dev/test chain).

use crate::types::{
    Address, CallRequest, SignedTransaction, TransactionRequest, TxHash, TxReceipt,
};
use crate::Result;
use async_trait::async_trait;

/// Gateway to the external token ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Ordered list of node-managed accounts
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Native balance of an account, in smallest units
    async fn native_balance(&self, address: &Address) -> Result<u128>;

    /// Number of transactions sent from an account (next nonce)
    async fn transaction_count(&self, address: &Address) -> Result<u64>;

    /// Invoke a read-only contract method
    async fn call(&self, request: &CallRequest) -> Result<u128>;

    /// Submit a transaction from a node-managed account
    async fn transact(&self, request: &TransactionRequest) -> Result<TxHash>;

    /// Gas estimate for a transaction
    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64>;

    /// Broadcast a signed transaction
    async fn send_raw(&self, signed: &SignedTransaction) -> Result<TxHash>;

    /// Resolve once the transaction is mined
    ///
    /// Polls without an internal deadline; callers bound the wait.
    async fn wait_for_receipt(&self, hash: &TxHash) -> Result<TxReceipt>;
}

//! JSON-RPC gateway to a ledger node
//!
//! Quantities travel as `0x`-prefixed hex strings; raw transactions as
//! hex-encoded canonical bytes. Receipt lookups return null until mined,
//! so `wait_for_receipt` polls at a fixed interval without an internal
//! deadline (callers bound the wait).

use crate::client::LedgerClient;
use crate::types::{
    decode_quantity, encode_quantity, Address, CallArg, CallRequest, ContractCall,
    SignedTransaction, TransactionRequest, TxHash, TxReceipt, TxStatus,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::error;

/// JSON-RPC 2.0 client for a ledger node
pub struct HttpLedgerClient {
    endpoint: String,
    client: reqwest::Client,
    poll_interval: Duration,
    next_id: AtomicU64,
}

impl HttpLedgerClient {
    /// Connect to a node endpoint
    pub fn new(
        endpoint: impl Into<String>,
        request_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Unavailable(format!("client setup failed: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
            poll_interval,
            next_id: AtomicU64::new(1),
        })
    }

    async fn rpc_opt<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<T>> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Ledger request {} failed: {}", method, e);
                Error::Unavailable(format!("{}: {}", method, e))
            })?;

        if !response.status().is_success() {
            return Err(Error::Unavailable(format!(
                "{} failed with status {}",
                method,
                response.status()
            )));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Codec(format!("bad response for {}: {}", method, e)))?;

        if let Some(err) = body.error {
            return Err(Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(body.result)
    }

    async fn rpc<P: Serialize, T: DeserializeOwned>(&self, method: &str, params: P) -> Result<T> {
        self.rpc_opt(method, params)
            .await?
            .ok_or_else(|| Error::Codec(format!("{}: response missing result", method)))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn accounts(&self) -> Result<Vec<Address>> {
        let raw: Vec<String> = self.rpc("ledger_accounts", [(); 0]).await?;
        raw.into_iter().map(Address::parse).collect()
    }

    async fn native_balance(&self, address: &Address) -> Result<u128> {
        let raw: String = self
            .rpc("ledger_getNativeBalance", [address.as_str()])
            .await?;
        decode_quantity(&raw)
    }

    async fn transaction_count(&self, address: &Address) -> Result<u64> {
        let raw: String = self
            .rpc("ledger_getTransactionCount", [address.as_str()])
            .await?;
        let count = decode_quantity(&raw)?;
        u64::try_from(count).map_err(|_| Error::Codec(format!("transaction count {}", raw)))
    }

    async fn call(&self, request: &CallRequest) -> Result<u128> {
        let raw: String = self
            .rpc("ledger_call", [CallRequestDto::from(request)])
            .await?;
        decode_quantity(&raw)
    }

    async fn transact(&self, request: &TransactionRequest) -> Result<TxHash> {
        let raw: String = self
            .rpc("ledger_sendTransaction", [TransactionDto::from(request)])
            .await?;
        TxHash::parse(raw)
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64> {
        let raw: String = self
            .rpc("ledger_estimateGas", [TransactionDto::from(request)])
            .await?;
        let gas = decode_quantity(&raw)?;
        u64::try_from(gas).map_err(|_| Error::Codec(format!("gas estimate {}", raw)))
    }

    async fn send_raw(&self, signed: &SignedTransaction) -> Result<TxHash> {
        let encoded = format!("0x{}", hex::encode(signed.canonical_bytes()));
        let raw: String = self.rpc("ledger_sendRawTransaction", [encoded]).await?;
        TxHash::parse(raw)
    }

    async fn wait_for_receipt(&self, hash: &TxHash) -> Result<TxReceipt> {
        loop {
            let found: Option<ReceiptDto> = self
                .rpc_opt("ledger_getTransactionReceipt", [hash.as_str()])
                .await?;
            if let Some(dto) = found {
                return dto.into_receipt();
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    // No serde(default) here: on a generic field it would demand
    // T: Default, and a missing `result` already decodes as None
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionDto {
    from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    call: Option<CallDto>,
}

impl From<&TransactionRequest> for TransactionDto {
    fn from(request: &TransactionRequest) -> Self {
        Self {
            from: request.from.to_string(),
            to: request.to.as_ref().map(Address::to_string),
            value: encode_quantity(request.value),
            gas: request.gas.map(|g| encode_quantity(g as u128)),
            gas_price: request.gas_price.map(encode_quantity),
            nonce: request.nonce.map(|n| encode_quantity(n as u128)),
            call: request.call.as_ref().map(CallDto::from),
        }
    }
}

#[derive(Debug, Serialize)]
struct CallDto {
    method: String,
    args: Vec<CallArgDto>,
}

impl From<&ContractCall> for CallDto {
    fn from(call: &ContractCall) -> Self {
        Self {
            method: call.method.clone(),
            args: call.args.iter().map(CallArgDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
enum CallArgDto {
    Address(String),
    Uint(String),
}

impl From<&CallArg> for CallArgDto {
    fn from(arg: &CallArg) -> Self {
        match arg {
            CallArg::Address(address) => CallArgDto::Address(address.to_string()),
            CallArg::Uint(value) => CallArgDto::Uint(encode_quantity(*value)),
        }
    }
}

#[derive(Debug, Serialize)]
struct CallRequestDto {
    to: String,
    method: String,
    args: Vec<CallArgDto>,
}

impl From<&CallRequest> for CallRequestDto {
    fn from(request: &CallRequest) -> Self {
        Self {
            to: request.to.to_string(),
            method: request.call.method.clone(),
            args: request.call.args.iter().map(CallArgDto::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptDto {
    transaction_hash: String,
    status: String,
    block_number: String,
    gas_used: String,
    from: String,
    to: Option<String>,
    #[serde(default)]
    revert_reason: Option<String>,
    timestamp: String,
}

impl ReceiptDto {
    fn into_receipt(self) -> Result<TxReceipt> {
        let status = match self.status.as_str() {
            "0x1" => TxStatus::Success,
            "0x0" => TxStatus::Reverted,
            other => return Err(Error::Codec(format!("unknown receipt status {}", other))),
        };
        let seconds = decode_quantity(&self.timestamp)?;
        let mined_at = i64::try_from(seconds)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .ok_or_else(|| Error::Codec(format!("bad receipt timestamp {}", self.timestamp)))?;
        let gas_used = decode_quantity(&self.gas_used)?;

        Ok(TxReceipt {
            tx_hash: TxHash::parse(self.transaction_hash)?,
            status,
            block_number: u64::try_from(decode_quantity(&self.block_number)?)
                .map_err(|_| Error::Codec("block number out of range".to_string()))?,
            gas_used: u64::try_from(gas_used)
                .map_err(|_| Error::Codec("gas used out of range".to_string()))?,
            from: Address::parse(self.from)?,
            to: self.to.map(Address::parse).transpose()?,
            revert_reason: self.revert_reason,
            mined_at,
        })
    }
}

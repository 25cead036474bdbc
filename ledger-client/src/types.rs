//! Wire types for the ledger gateway
//!
//! All types are designed for:
//! - Deterministic serialization (bincode) for signing and hashing
//! - Exact integer arithmetic (u128 smallest units, no floats)

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest native units per whole unit (18 decimals)
pub const NATIVE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Ledger address (`0x` + 40 hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Parse and validate an address
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| Error::InvalidAddress(format!("missing 0x prefix: {}", s)))?;
        if hex_part.len() != 40 {
            return Err(Error::InvalidAddress(format!(
                "expected 40 hex chars, got {}: {}",
                hex_part.len(),
                s
            )));
        }
        if !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidAddress(format!("non-hex character in {}", s)));
        }
        Ok(Self(s.to_lowercase()))
    }

    /// Build from raw 20 bytes
    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction hash (`0x` + 64 hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(String);

impl TxHash {
    /// Parse and validate a transaction hash
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| Error::InvalidTxHash(format!("missing 0x prefix: {}", s)))?;
        if hex_part.len() != 64 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidTxHash(s));
        }
        Ok(Self(s.to_lowercase()))
    }

    /// Build from raw 32 bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encode a quantity as a `0x`-prefixed hex string (wire form)
pub fn encode_quantity(value: u128) -> String {
    format!("{:#x}", value)
}

/// Decode a `0x`-prefixed hex quantity
pub fn decode_quantity(s: &str) -> Result<u128> {
    let hex_part = s
        .strip_prefix("0x")
        .ok_or_else(|| Error::Codec(format!("quantity missing 0x prefix: {}", s)))?;
    if hex_part.is_empty() {
        return Err(Error::Codec("empty quantity".to_string()));
    }
    u128::from_str_radix(hex_part, 16)
        .map_err(|e| Error::Codec(format!("bad quantity {}: {}", s, e)))
}

/// Argument to a contract method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArg {
    /// Address-typed argument
    Address(Address),
    /// Unsigned integer argument (smallest units)
    Uint(u128),
}

/// Contract method invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    /// Method name as exposed by the contract
    pub method: String,
    /// Positional arguments
    pub args: Vec<CallArg>,
}

impl ContractCall {
    /// Create a call
    pub fn new(method: impl Into<String>, args: Vec<CallArg>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// Read-only contract query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    /// Contract address
    pub to: Address,
    /// Method and arguments
    pub call: ContractCall,
}

/// Transaction submission request
///
/// `gas`, `gas_price` and `nonce` are optional; node-managed submissions
/// leave them to the node, raw signed submissions must fill all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Paying account
    pub from: Address,
    /// Destination account or contract
    pub to: Option<Address>,
    /// Native value moved, in smallest units
    pub value: u128,
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price, in smallest units
    pub gas_price: Option<u128>,
    /// Account nonce
    pub nonce: Option<u64>,
    /// Contract invocation, if any
    pub call: Option<ContractCall>,
}

impl TransactionRequest {
    /// Plain native-value transfer
    pub fn native_transfer(from: Address, to: Address, value: u128) -> Self {
        Self {
            from,
            to: Some(to),
            value,
            gas: None,
            gas_price: None,
            nonce: None,
            call: None,
        }
    }

    /// Contract method transaction
    pub fn contract_call(from: Address, contract: Address, call: ContractCall) -> Self {
        Self {
            from,
            to: Some(contract),
            value: 0,
            gas: None,
            gas_price: None,
            nonce: None,
            call: Some(call),
        }
    }

    /// Attach native value (payable calls)
    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    /// Create canonical bytes for signing
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Deterministic serialization for signature verification
        bincode::serialize(self).expect("serialization cannot fail")
    }
}

/// Signed transaction ready for broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Signed payload
    pub payload: TransactionRequest,
    /// Declared sender (must match the signing key)
    pub sender: Address,
    /// Ed25519 public key (32 bytes)
    pub public_key: Vec<u8>,
    /// Ed25519 signature over the payload's canonical bytes (64 bytes)
    pub signature: Vec<u8>,
}

impl SignedTransaction {
    /// Create canonical bytes (hashing, broadcast encoding)
    pub fn canonical_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("serialization cannot fail")
    }

    /// Transaction hash (sha-256 of the canonical bytes)
    pub fn tx_hash(&self) -> TxHash {
        use sha2::{Digest, Sha256};
        let digest: [u8; 32] = Sha256::digest(self.canonical_bytes()).into();
        TxHash::from_bytes(&digest)
    }

    /// Verify the signature against the embedded public key
    pub fn verify(&self) -> bool {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let pk_bytes: [u8; 32] = match self.public_key.as_slice().try_into() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let verifying_key = match VerifyingKey::from_bytes(&pk_bytes) {
            Ok(key) => key,
            Err(_) => return false,
        };
        let sig_bytes: [u8; 64] = match self.signature.as_slice().try_into() {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let signature = Signature::from_bytes(&sig_bytes);

        verifying_key
            .verify(&self.payload.canonical_bytes(), &signature)
            .is_ok()
    }
}

/// Mined transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Executed and state applied
    Success,
    /// Mined but reverted; no state applied
    Reverted,
}

impl TxStatus {
    /// Status label
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Success => "SUCCESS",
            TxStatus::Reverted => "REVERTED",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Confirmation record for a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Hash of the mined transaction
    pub tx_hash: TxHash,
    /// Execution status
    pub status: TxStatus,
    /// Block the transaction was mined in
    pub block_number: u64,
    /// Gas consumed
    pub gas_used: u64,
    /// Paying account
    pub from: Address,
    /// Destination account or contract
    pub to: Option<Address>,
    /// Revert reason, when the ledger reports one
    pub revert_reason: Option<String>,
    /// Mining timestamp
    pub mined_at: DateTime<Utc>,
}

impl TxReceipt {
    /// True when the transaction executed successfully
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }
}

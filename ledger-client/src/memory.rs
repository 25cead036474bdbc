//! In-memory dev ledger
//!
//! A self-contained chain double for development and tests: ten funded
//! dev accounts, the fund token and crowdsale contracts pre-deployed, and
//! auto-mining (every submission lands in its own block). Semantic failures
//! (burning or transferring more than a balance holds) mine `Reverted`
//! receipts; malformed submissions are rejected before mining. Gas is
//! metered in receipts but never charged.

use crate::client::LedgerClient;
use crate::signer::{derive_address, PrivateKeySigner, Signer};
use crate::types::{
    Address, CallArg, CallRequest, ContractCall, SignedTransaction, TransactionRequest, TxHash,
    TxReceipt, TxStatus, NATIVE_UNIT,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Gas charged to plain native transfers
const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Gas charged to contract transactions
const CONTRACT_CALL_GAS: u64 = 50_000;

/// Receipt poll interval
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Initial chain state
#[derive(Debug, Clone)]
pub struct Genesis {
    /// Number of node-managed accounts
    pub accounts: usize,
    /// Native balance per account, in smallest units
    pub native_balance: u128,
    /// Initial token supply, minted to the deploy account (index 2)
    pub token_supply: u128,
    /// Crowdsale rate: tokens minted per smallest native unit paid
    pub tokens_per_native_unit: u128,
}

impl Default for Genesis {
    fn default() -> Self {
        Self {
            accounts: 10,
            native_balance: 1_000 * NATIVE_UNIT,
            token_supply: 1_000_000,
            tokens_per_native_unit: 1,
        }
    }
}

struct ChainState {
    accounts: Vec<Address>,
    native: HashMap<Address, u128>,
    nonces: HashMap<Address, u64>,
    token_supply: u128,
    token_balances: HashMap<Address, u128>,
    sale_wallet: Address,
    rate: u128,
    receipts: HashMap<TxHash, TxReceipt>,
    raw_submissions: HashMap<TxHash, SignedTransaction>,
    block_number: u64,
    hold_receipts: bool,
    mined: usize,
}

enum Execution {
    Applied,
    Reverted(&'static str),
}

/// In-memory ledger (dev/test chain)
pub struct InMemoryLedger {
    state: RwLock<ChainState>,
    fund_token: Address,
    crowdsale: Address,
}

impl InMemoryLedger {
    /// Create a chain from genesis state
    pub fn new(genesis: Genesis) -> Self {
        let count = genesis.accounts.max(1);
        let accounts: Vec<Address> = (0..count)
            .map(|i| PrivateKeySigner::from_seed(Self::dev_seed(i)).address().clone())
            .collect();

        let mut native = HashMap::new();
        for account in &accounts {
            native.insert(account.clone(), genesis.native_balance);
        }

        // Supply mints to the deploy account; purchase value forwards to
        // the account behind the sale (index 3 on the standard layout).
        let deployer = accounts.get(2).unwrap_or(&accounts[0]).clone();
        let sale_wallet = accounts.get(3).unwrap_or(&accounts[0]).clone();
        let mut token_balances = HashMap::new();
        token_balances.insert(deployer, genesis.token_supply);

        Self {
            state: RwLock::new(ChainState {
                accounts,
                native,
                nonces: HashMap::new(),
                token_supply: genesis.token_supply,
                token_balances,
                sale_wallet,
                rate: genesis.tokens_per_native_unit,
                receipts: HashMap::new(),
                raw_submissions: HashMap::new(),
                block_number: 0,
                hold_receipts: false,
                mined: 0,
            }),
            fund_token: contract_address("contract:fund-token"),
            crowdsale: contract_address("contract:crowdsale"),
        }
    }

    /// Standard dev chain (ten accounts, default genesis)
    pub fn dev() -> Self {
        Self::new(Genesis::default())
    }

    /// Deterministic seed behind dev account `index`
    ///
    /// `PrivateKeySigner::from_seed(InMemoryLedger::dev_seed(i))` signs for
    /// the account at position `i` of `accounts()`.
    pub fn dev_seed(index: usize) -> [u8; 32] {
        let mut seed = [0u8; 32];
        seed[0] = 0xda;
        seed[30..32].copy_from_slice(&(index as u16).to_be_bytes());
        seed
    }

    /// Address of the pre-deployed fund token contract
    pub fn fund_token_address(&self) -> &Address {
        &self.fund_token
    }

    /// Address of the pre-deployed crowdsale contract
    pub fn crowdsale_address(&self) -> &Address {
        &self.crowdsale
    }

    /// Overwrite an account's native balance (test/dev arrangement)
    pub async fn set_native_balance(&self, address: &Address, balance: u128) {
        let mut state = self.state.write().await;
        state.native.insert(address.clone(), balance);
    }

    /// Withhold receipts from `wait_for_receipt` (timeout testing)
    ///
    /// Submissions still mine; only confirmation visibility is held.
    pub async fn hold_receipts(&self, hold: bool) {
        self.state.write().await.hold_receipts = hold;
    }

    /// Number of transactions mined so far
    pub async fn mined_count(&self) -> usize {
        self.state.read().await.mined
    }

    /// The raw submission mined under `hash`, if any (test/dev inspection)
    pub async fn raw_submission(&self, hash: &TxHash) -> Option<SignedTransaction> {
        self.state.read().await.raw_submissions.get(hash).cloned()
    }

    fn mine(
        &self,
        state: &mut ChainState,
        request: &TransactionRequest,
        hash: TxHash,
    ) -> Result<TxHash> {
        let execution = self.apply(state, request)?;

        *state.nonces.entry(request.from.clone()).or_insert(0) += 1;
        state.block_number += 1;
        state.mined += 1;

        let (status, revert_reason) = match execution {
            Execution::Applied => (TxStatus::Success, None),
            Execution::Reverted(reason) => (TxStatus::Reverted, Some(reason.to_string())),
        };

        let receipt = TxReceipt {
            tx_hash: hash.clone(),
            status,
            block_number: state.block_number,
            gas_used: gas_for(request),
            from: request.from.clone(),
            to: request.to.clone(),
            revert_reason,
            mined_at: Utc::now(),
        };

        match status {
            TxStatus::Success => info!("Mined {} in block {}", hash, state.block_number),
            TxStatus::Reverted => warn!(
                "Transaction {} reverted: {}",
                hash,
                receipt.revert_reason.as_deref().unwrap_or("unknown")
            ),
        }

        state.receipts.insert(hash.clone(), receipt);
        Ok(hash)
    }

    fn apply(&self, state: &mut ChainState, request: &TransactionRequest) -> Result<Execution> {
        let from_balance = *state
            .native
            .get(&request.from)
            .ok_or_else(|| Error::UnknownAccount(request.from.clone()))?;
        if from_balance < request.value {
            return Err(Error::InsufficientFunds {
                account: request.from.clone(),
                required: request.value,
                available: from_balance,
            });
        }

        let to = request.to.as_ref().ok_or_else(|| Error::Rpc {
            code: -32602,
            message: "transaction without destination".to_string(),
        })?;

        match &request.call {
            None => {
                let payer = state
                    .native
                    .get_mut(&request.from)
                    .ok_or_else(|| Error::UnknownAccount(request.from.clone()))?;
                *payer -= request.value;
                *state.native.entry(to.clone()).or_insert(0) += request.value;
                Ok(Execution::Applied)
            }
            Some(call) if *to == self.fund_token => apply_token_call(state, &request.from, call),
            Some(call) if *to == self.crowdsale => apply_crowdsale_call(state, request, call),
            Some(_) => Err(Error::UnknownContract(to.clone())),
        }
    }
}

fn apply_token_call(
    state: &mut ChainState,
    from: &Address,
    call: &ContractCall,
) -> Result<Execution> {
    match call.method.as_str() {
        "burn" => {
            let amount = uint_arg(call, 0)?;
            let balance = state.token_balances.get(from).copied().unwrap_or(0);
            if balance < amount {
                return Ok(Execution::Reverted("burn amount exceeds balance"));
            }
            state.token_balances.insert(from.clone(), balance - amount);
            state.token_supply -= amount;
            Ok(Execution::Applied)
        }
        "transfer" => {
            let to = address_arg(call, 0)?;
            let amount = uint_arg(call, 1)?;
            let balance = state.token_balances.get(from).copied().unwrap_or(0);
            if balance < amount {
                return Ok(Execution::Reverted("transfer amount exceeds balance"));
            }
            state.token_balances.insert(from.clone(), balance - amount);
            *state.token_balances.entry(to).or_insert(0) += amount;
            Ok(Execution::Applied)
        }
        other => Err(Error::UnknownMethod(other.to_string())),
    }
}

fn apply_crowdsale_call(
    state: &mut ChainState,
    request: &TransactionRequest,
    call: &ContractCall,
) -> Result<Execution> {
    match call.method.as_str() {
        "buyTokens" => {
            let beneficiary = address_arg(call, 0)?;
            let minted = match request.value.checked_mul(state.rate) {
                Some(minted) if state.token_supply.checked_add(minted).is_some() => minted,
                _ => return Ok(Execution::Reverted("purchase overflows token supply")),
            };
            let payer = state
                .native
                .get_mut(&request.from)
                .ok_or_else(|| Error::UnknownAccount(request.from.clone()))?;
            *payer -= request.value;
            let sale_wallet = state.sale_wallet.clone();
            *state.native.entry(sale_wallet).or_insert(0) += request.value;
            *state.token_balances.entry(beneficiary).or_insert(0) += minted;
            state.token_supply += minted;
            Ok(Execution::Applied)
        }
        other => Err(Error::UnknownMethod(other.to_string())),
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.state.read().await.accounts.clone())
    }

    async fn native_balance(&self, address: &Address) -> Result<u128> {
        // Unfunded addresses read as zero, like any chain
        Ok(self
            .state
            .read()
            .await
            .native
            .get(address)
            .copied()
            .unwrap_or(0))
    }

    async fn transaction_count(&self, address: &Address) -> Result<u64> {
        Ok(self
            .state
            .read()
            .await
            .nonces
            .get(address)
            .copied()
            .unwrap_or(0))
    }

    async fn call(&self, request: &CallRequest) -> Result<u128> {
        let state = self.state.read().await;
        if request.to != self.fund_token {
            return Err(Error::UnknownContract(request.to.clone()));
        }
        match request.call.method.as_str() {
            "totalSupply" => Ok(state.token_supply),
            "balanceOf" => {
                let owner = address_arg(&request.call, 0)?;
                Ok(state.token_balances.get(&owner).copied().unwrap_or(0))
            }
            other => Err(Error::UnknownMethod(other.to_string())),
        }
    }

    async fn transact(&self, request: &TransactionRequest) -> Result<TxHash> {
        let mut state = self.state.write().await;
        if !state.accounts.contains(&request.from) {
            return Err(Error::UnknownAccount(request.from.clone()));
        }
        let nonce = state.nonces.get(&request.from).copied().unwrap_or(0);
        let hash = node_tx_hash(request, nonce);
        self.mine(&mut state, request, hash)
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64> {
        Ok(gas_for(request))
    }

    async fn send_raw(&self, signed: &SignedTransaction) -> Result<TxHash> {
        let mut state = self.state.write().await;

        if !signed.verify() {
            return Err(Error::SignatureInvalid(
                "signature does not verify".to_string(),
            ));
        }
        let pk: [u8; 32] = signed
            .public_key
            .as_slice()
            .try_into()
            .map_err(|_| Error::SignatureInvalid("bad public key length".to_string()))?;
        let derived = derive_address(&pk);
        if derived != signed.sender || signed.sender != signed.payload.from {
            return Err(Error::SignatureInvalid(format!(
                "sender {} does not match signing key account {}",
                signed.payload.from, derived
            )));
        }

        let expected = state.nonces.get(&signed.payload.from).copied().unwrap_or(0);
        match signed.payload.nonce {
            Some(nonce) if nonce == expected => {}
            Some(nonce) => {
                return Err(Error::InvalidNonce {
                    expected,
                    got: nonce,
                })
            }
            None => {
                return Err(Error::Rpc {
                    code: -32602,
                    message: "raw transaction without nonce".to_string(),
                })
            }
        }

        let hash = self.mine(&mut state, &signed.payload, signed.tx_hash())?;
        state.raw_submissions.insert(hash.clone(), signed.clone());
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: &TxHash) -> Result<TxReceipt> {
        loop {
            {
                let state = self.state.read().await;
                if !state.hold_receipts {
                    if let Some(receipt) = state.receipts.get(hash) {
                        return Ok(receipt.clone());
                    }
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn contract_address(label: &str) -> Address {
    let digest = Sha256::digest(label.as_bytes());
    let mut raw = [0u8; 20];
    raw.copy_from_slice(&digest[..20]);
    Address::from_bytes(&raw)
}

fn node_tx_hash(request: &TransactionRequest, nonce: u64) -> TxHash {
    let mut hasher = Sha256::new();
    hasher.update(request.canonical_bytes());
    hasher.update(nonce.to_be_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    TxHash::from_bytes(&digest)
}

fn gas_for(request: &TransactionRequest) -> u64 {
    if request.call.is_some() {
        CONTRACT_CALL_GAS
    } else {
        NATIVE_TRANSFER_GAS
    }
}

fn uint_arg(call: &ContractCall, index: usize) -> Result<u128> {
    match call.args.get(index) {
        Some(CallArg::Uint(value)) => Ok(*value),
        other => Err(Error::Codec(format!(
            "{} argument {}: expected uint, got {:?}",
            call.method, index, other
        ))),
    }
}

fn address_arg(call: &ContractCall, index: usize) -> Result<Address> {
    match call.args.get(index) {
        Some(CallArg::Address(address)) => Ok(address.clone()),
        other => Err(Error::Codec(format!(
            "{} argument {}: expected address, got {:?}",
            call.method, index, other
        ))),
    }
}

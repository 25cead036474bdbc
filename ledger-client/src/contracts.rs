//! Typed bindings for the fund's on-chain contracts
//!
//! The token and crowdsale contracts are external and already deployed;
//! these bindings only encode method calls, they carry no contract logic.

use crate::client::LedgerClient;
use crate::types::{Address, CallArg, CallRequest, ContractCall, TransactionRequest, TxHash};
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Fund token contract (supply, balances, burn, transfer)
#[derive(Clone)]
pub struct FundToken {
    address: Address,
    client: Arc<dyn LedgerClient>,
}

impl FundToken {
    /// Bind to a deployed token contract
    pub fn new(client: Arc<dyn LedgerClient>, address: Address) -> Self {
        Self { address, client }
    }

    /// Contract address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Total token supply
    pub async fn total_supply(&self) -> Result<u128> {
        let request = CallRequest {
            to: self.address.clone(),
            call: ContractCall::new("totalSupply", vec![]),
        };
        self.client.call(&request).await
    }

    /// Token balance of an account
    pub async fn balance_of(&self, owner: &Address) -> Result<u128> {
        let request = CallRequest {
            to: self.address.clone(),
            call: ContractCall::new("balanceOf", vec![CallArg::Address(owner.clone())]),
        };
        self.client.call(&request).await
    }

    /// Burn tokens held by `from`
    pub async fn burn(&self, from: &Address, amount: u128) -> Result<TxHash> {
        let call = ContractCall::new("burn", vec![CallArg::Uint(amount)]);
        let request =
            TransactionRequest::contract_call(from.clone(), self.address.clone(), call);
        let hash = self.client.transact(&request).await?;
        info!("Submitted burn of {} tokens from {}: {}", amount, from, hash);
        Ok(hash)
    }

    /// Transfer tokens from `from` to `to`
    pub async fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<TxHash> {
        let call = ContractCall::new(
            "transfer",
            vec![CallArg::Address(to.clone()), CallArg::Uint(amount)],
        );
        let request =
            TransactionRequest::contract_call(from.clone(), self.address.clone(), call);
        let hash = self.client.transact(&request).await?;
        info!(
            "Submitted transfer of {} tokens {} -> {}: {}",
            amount, from, to, hash
        );
        Ok(hash)
    }
}

/// Crowdsale contract (token purchases for native value)
#[derive(Clone)]
pub struct Crowdsale {
    address: Address,
    client: Arc<dyn LedgerClient>,
}

impl Crowdsale {
    /// Bind to a deployed crowdsale contract
    pub fn new(client: Arc<dyn LedgerClient>, address: Address) -> Self {
        Self { address, client }
    }

    /// Contract address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Buy tokens for `beneficiary`, paying `value` native units from `from`
    pub async fn buy_tokens(
        &self,
        from: &Address,
        beneficiary: &Address,
        value: u128,
    ) -> Result<TxHash> {
        let call = ContractCall::new("buyTokens", vec![CallArg::Address(beneficiary.clone())]);
        let request =
            TransactionRequest::contract_call(from.clone(), self.address.clone(), call)
                .with_value(value);
        let hash = self.client.transact(&request).await?;
        info!(
            "Submitted token purchase of {} native units for {}: {}",
            value, beneficiary, hash
        );
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Genesis, InMemoryLedger};
    use crate::types::NATIVE_UNIT;

    async fn setup() -> (Arc<InMemoryLedger>, FundToken, Crowdsale, Vec<Address>) {
        let ledger = Arc::new(InMemoryLedger::new(Genesis::default()));
        let accounts = ledger.accounts().await.unwrap();
        let token = FundToken::new(ledger.clone(), ledger.fund_token_address().clone());
        let crowdsale = Crowdsale::new(ledger.clone(), ledger.crowdsale_address().clone());
        (ledger, token, crowdsale, accounts)
    }

    #[tokio::test]
    async fn test_supply_and_balances() {
        let (_ledger, token, _crowdsale, accounts) = setup().await;
        let deployer = &accounts[2];

        assert_eq!(token.total_supply().await.unwrap(), 1_000_000);
        assert_eq!(token.balance_of(deployer).await.unwrap(), 1_000_000);
        assert_eq!(token.balance_of(&accounts[5]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transfer_and_burn() {
        let (ledger, token, _crowdsale, accounts) = setup().await;
        let deployer = accounts[2].clone();
        let holder = accounts[4].clone();

        let hash = token.transfer(&deployer, &holder, 1_000).await.unwrap();
        assert!(ledger.wait_for_receipt(&hash).await.unwrap().is_success());
        assert_eq!(token.balance_of(&holder).await.unwrap(), 1_000);

        let hash = token.burn(&holder, 400).await.unwrap();
        assert!(ledger.wait_for_receipt(&hash).await.unwrap().is_success());
        assert_eq!(token.balance_of(&holder).await.unwrap(), 600);
        assert_eq!(token.total_supply().await.unwrap(), 999_600);
    }

    #[tokio::test]
    async fn test_buy_tokens_mints_and_forwards_value() {
        let (ledger, token, crowdsale, accounts) = setup().await;
        let investor = accounts[5].clone();
        let sale_wallet = accounts[3].clone();
        let wallet_before = ledger.native_balance(&sale_wallet).await.unwrap();

        let hash = crowdsale
            .buy_tokens(&investor, &investor, 2 * NATIVE_UNIT)
            .await
            .unwrap();
        assert!(ledger.wait_for_receipt(&hash).await.unwrap().is_success());

        // Unit rate: tokens minted equal native units paid
        assert_eq!(token.balance_of(&investor).await.unwrap(), 2 * NATIVE_UNIT);
        assert_eq!(
            ledger.native_balance(&sale_wallet).await.unwrap(),
            wallet_before + 2 * NATIVE_UNIT
        );
    }
}

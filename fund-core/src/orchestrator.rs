//! Settlement orchestrator
//!
//! Drives the three fund operations end to end: validate operator
//! input, submit to the ledger, wait for confirmation within a bound,
//! and recompute the fund snapshot. Redemptions settle in two
//! non-atomic legs; a native leg that fails after the token leg has
//! settled is reported for manual reconciliation, never retried or
//! compensated automatically.

use crate::aum::compute_aum;
use crate::config::Config;
use crate::registry::WalletRegistry;
use crate::types::{
    parse_amount, FundSnapshot, InvestorAccount, Operation, OperationOutcome, OperationReport,
    SellSettlement,
};
use crate::{Error, Result};
use chrono::Utc;
use ledger_client::{
    Address, Crowdsale, FundToken, LedgerClient, Signer, TransactionRequest, TxHash, TxReceipt,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Executes fund operations against the ledger
pub struct FundOrchestrator {
    client: Arc<dyn LedgerClient>,
    registry: WalletRegistry,
    token: FundToken,
    crowdsale: Crowdsale,
    aum_signer: Arc<dyn Signer>,
    reserve_offset: u128,
    gas_price: u128,
    confirmation_timeout: Duration,
    /// Serializes operations that spend from fund wallets, so nonce
    /// queries cannot interleave with an in-flight submission
    system_wallets: Mutex<()>,
}

impl FundOrchestrator {
    /// Wire up the orchestrator, checking that the signer controls the
    /// registry's AUM wallet
    pub fn new(
        client: Arc<dyn LedgerClient>,
        registry: WalletRegistry,
        token: FundToken,
        crowdsale: Crowdsale,
        aum_signer: Arc<dyn Signer>,
        config: &Config,
    ) -> Result<Self> {
        if aum_signer.address() != registry.aum_wallet() {
            return Err(Error::Configuration(format!(
                "signer controls {}, registry binds the AUM wallet to {}",
                aum_signer.address(),
                registry.aum_wallet()
            )));
        }

        Ok(Self {
            client,
            registry,
            token,
            crowdsale,
            aum_signer,
            reserve_offset: config.reserve_offset()?,
            gas_price: u128::from(config.fund.gas_price),
            confirmation_timeout: config.confirmation_timeout(),
            system_wallets: Mutex::new(()),
        })
    }

    /// Wallet roles this orchestrator operates with
    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    /// Burn tokens held by the burn wallet
    pub async fn burn(&self, amount: &str) -> Result<OperationReport> {
        // Step 1: Validate operator input
        let amount = parse_amount(amount)?;
        let operation = Operation::Burn { amount };
        let operation_id = Uuid::new_v4();
        info!("Executing {} ({})", operation, operation_id);

        let _guard = self.system_wallets.lock().await;

        // Step 2: Submit the burn from the burn wallet
        let tx_hash = self.token.burn(self.registry.burn_wallet(), amount).await?;

        // Step 3: Await confirmation
        let receipt = self.await_receipt(&tx_hash).await?;

        // Step 4: Recompute the fund snapshot and report
        self.finish(operation_id, operation, None, single_leg_outcome(receipt))
            .await
    }

    /// Buy tokens for an investor through the crowdsale
    pub async fn buy(&self, investor: usize, value: &str) -> Result<OperationReport> {
        // Step 1: Validate operator input
        let value = parse_amount(value)?;
        let beneficiary = self.registry.investor(investor)?.clone();
        let operation = Operation::Buy { investor, value };
        let operation_id = Uuid::new_v4();
        info!("Executing {} ({})", operation, operation_id);

        // Purchases spend only from the investor's own account; no
        // fund-wallet lock is needed

        // Step 2: Submit the purchase, investor wallet paying the crowdsale
        let tx_hash = self
            .crowdsale
            .buy_tokens(&beneficiary, &beneficiary, value)
            .await?;

        // Step 3: Await confirmation
        let receipt = self.await_receipt(&tx_hash).await?;

        // Step 4: Recompute the fund snapshot and report
        self.finish(operation_id, operation, None, single_leg_outcome(receipt))
            .await
    }

    /// Redeem an investor's tokens for native currency
    ///
    /// Two legs, not atomic. Leg A transfers tokens from the investor to
    /// the burn wallet; if it reverts nothing has changed and the native
    /// leg never runs. Leg B pays the investor from the AUM wallet; if it
    /// fails the tokens are already gone and the report says so.
    pub async fn sell(&self, investor: usize, tokens: &str) -> Result<OperationReport> {
        // Step 1: Validate operator input
        let tokens = parse_amount(tokens)?;
        let investor_address = self.registry.investor(investor)?.clone();
        let operation = Operation::Sell { investor, tokens };
        let operation_id = Uuid::new_v4();
        info!("Executing {} ({})", operation, operation_id);

        let mut settlement = SellSettlement::new();

        // Step 2: Token leg, investor to burn wallet, on the investor's
        // own credential
        info!("Submitting token leg for operation {}", operation_id);
        let tx_hash = self
            .token
            .transfer(&investor_address, self.registry.burn_wallet(), tokens)
            .await?;
        let token_receipt = self.await_receipt(&tx_hash).await?;

        if !token_receipt.is_success() {
            warn!(
                "Token leg of operation {} reverted, redemption aborted",
                operation_id
            );
            return self
                .finish(
                    operation_id,
                    operation,
                    Some(settlement),
                    OperationOutcome::Rejected {
                        receipt: token_receipt,
                    },
                )
                .await;
        }
        settlement.confirm_token_leg(token_receipt.clone())?;

        // Step 3: Native leg, AUM wallet to investor
        info!("Submitting native leg for operation {}", operation_id);
        let _guard = self.system_wallets.lock().await;
        match self.execute_native_leg(&investor_address, tokens).await {
            Ok(native_receipt) => {
                settlement.confirm_native_leg(native_receipt.clone())?;
                self.finish(
                    operation_id,
                    operation,
                    Some(settlement),
                    OperationOutcome::Confirmed {
                        receipts: vec![token_receipt, native_receipt],
                    },
                )
                .await
            }
            Err(e) => {
                error!(
                    "Native leg of operation {} failed after the token leg settled: {}",
                    operation_id, e
                );
                let native_receipt = match &e {
                    Error::LedgerRejected { receipt } => Some(receipt.clone()),
                    _ => None,
                };
                settlement.fail_native_leg(native_receipt)?;
                self.finish(
                    operation_id,
                    operation,
                    Some(settlement),
                    OperationOutcome::RedemptionIncomplete {
                        token_leg: token_receipt,
                        error: e.to_string(),
                    },
                )
                .await
            }
        }
    }

    /// Read the current fund state without submitting anything
    pub async fn snapshot(&self) -> Result<FundSnapshot> {
        let total_supply = self.token.total_supply().await?;
        let aum_wallet_native = self.client.native_balance(self.registry.aum_wallet()).await?;
        let burn_wallet_tokens = self.token.balance_of(self.registry.burn_wallet()).await?;

        let aum = compute_aum(aum_wallet_native, self.reserve_offset);
        if aum < 0 {
            warn!(
                "AUM is negative: the AUM wallet holds {} against a reserve offset of {}",
                aum_wallet_native, self.reserve_offset
            );
        }

        let mut investors = Vec::with_capacity(self.registry.investors().len());
        for (index, address) in self.registry.investors().iter().enumerate() {
            investors.push(InvestorAccount {
                index,
                address: address.clone(),
                native_balance: self.client.native_balance(address).await?,
                token_balance: self.token.balance_of(address).await?,
            });
        }

        Ok(FundSnapshot {
            total_supply,
            aum,
            aum_wallet_native,
            burn_wallet_tokens,
            investors,
            taken_at: Utc::now(),
        })
    }

    /// Sign and broadcast the native payout from the AUM wallet
    ///
    /// The gas limit comes from the ledger's estimate and the gas price
    /// from configuration (zero on the dev chain). A mined-but-reverted
    /// payout surfaces as `Error::LedgerRejected`.
    async fn execute_native_leg(&self, investor: &Address, value: u128) -> Result<TxReceipt> {
        let aum_wallet = self.registry.aum_wallet();
        let nonce = self.client.transaction_count(aum_wallet).await?;

        let mut request =
            TransactionRequest::native_transfer(aum_wallet.clone(), investor.clone(), value);
        request.nonce = Some(nonce);
        request.gas_price = Some(self.gas_price);
        request.gas = Some(self.client.estimate_gas(&request).await?);

        let signed = self.aum_signer.sign(&request)?;
        let tx_hash = self.client.send_raw(&signed).await?;
        info!("Native leg broadcast as {}", tx_hash);

        let receipt = self.await_receipt(&tx_hash).await?;
        if !receipt.is_success() {
            return Err(Error::LedgerRejected { receipt });
        }
        Ok(receipt)
    }

    /// Wait for a receipt within the configured confirmation bound
    async fn await_receipt(&self, tx_hash: &TxHash) -> Result<TxReceipt> {
        match tokio::time::timeout(
            self.confirmation_timeout,
            self.client.wait_for_receipt(tx_hash),
        )
        .await
        {
            Ok(receipt) => Ok(receipt?),
            Err(_) => Err(Error::ConfirmationTimeout {
                tx_hash: tx_hash.clone(),
                waited_secs: self.confirmation_timeout.as_secs(),
            }),
        }
    }

    async fn finish(
        &self,
        operation_id: Uuid,
        operation: Operation,
        settlement: Option<SellSettlement>,
        outcome: OperationOutcome,
    ) -> Result<OperationReport> {
        let snapshot = self.snapshot().await?;

        match &outcome {
            OperationOutcome::Confirmed { .. } => {
                info!("Operation {} confirmed", operation_id);
            }
            OperationOutcome::Rejected { receipt } => {
                warn!(
                    "Operation {} rejected by the ledger: {}",
                    operation_id,
                    receipt.revert_reason.as_deref().unwrap_or("no reason given")
                );
            }
            OperationOutcome::RedemptionIncomplete { error, .. } => {
                error!(
                    "Operation {} left incomplete, manual reconciliation needed: {}",
                    operation_id, error
                );
            }
        }

        Ok(OperationReport {
            operation_id,
            operation,
            outcome,
            settlement,
            snapshot,
            completed_at: Utc::now(),
        })
    }
}

fn single_leg_outcome(receipt: TxReceipt) -> OperationOutcome {
    if receipt.is_success() {
        OperationOutcome::Confirmed {
            receipts: vec![receipt],
        }
    } else {
        OperationOutcome::Rejected { receipt }
    }
}

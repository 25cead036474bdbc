//! End-to-end tests for the settlement orchestrator
//!
//! Every test runs against the in-memory dev ledger: ten funded
//! accounts, the full token supply held by the contract deployer, and
//! instant mining. Balances are arranged through real transactions so
//! supply accounting stays honest.

use async_trait::async_trait;
use fund_core::{
    Config, Error, FundOrchestrator, OperationOutcome, SellState, WalletRegistry,
};
use ledger_client::{
    Address, CallRequest, Crowdsale, FundToken, InMemoryLedger, LedgerClient, PrivateKeySigner,
    SignedTransaction, TransactionRequest, TxHash, TxReceipt, TxStatus, NATIVE_UNIT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const GENESIS_NATIVE: u128 = 1_000 * NATIVE_UNIT;
const GENESIS_SUPPLY: u128 = 1_000_000;

struct Harness {
    ledger: Arc<InMemoryLedger>,
    accounts: Vec<Address>,
    token: FundToken,
    orchestrator: FundOrchestrator,
}

async fn harness() -> Harness {
    harness_with(Config::default()).await
}

async fn harness_with(config: Config) -> Harness {
    let ledger = Arc::new(InMemoryLedger::dev());
    let accounts = ledger.accounts().await.unwrap();
    let registry = WalletRegistry::from_accounts(&accounts).unwrap();
    let token = FundToken::new(ledger.clone(), ledger.fund_token_address().clone());
    let crowdsale = Crowdsale::new(ledger.clone(), ledger.crowdsale_address().clone());
    let signer = Arc::new(PrivateKeySigner::from_seed(InMemoryLedger::dev_seed(3)));

    let orchestrator = FundOrchestrator::new(
        ledger.clone(),
        registry,
        token.clone(),
        crowdsale,
        signer,
        &config,
    )
    .unwrap();

    Harness {
        ledger,
        accounts,
        token,
        orchestrator,
    }
}

impl Harness {
    /// Move tokens from the deployer to `to` through a real transfer,
    /// leaving total supply untouched
    async fn seed_tokens(&self, to: &Address, amount: u128) {
        let hash = self.token.transfer(&self.accounts[2], to, amount).await.unwrap();
        let receipt = self.ledger.wait_for_receipt(&hash).await.unwrap();
        assert!(receipt.is_success(), "token seeding must not revert");
    }

    fn aum_wallet(&self) -> &Address {
        &self.accounts[3]
    }

    fn burn_wallet(&self) -> &Address {
        &self.accounts[4]
    }

    fn investor(&self, index: usize) -> &Address {
        &self.accounts[5 + index]
    }
}

/// Forwards everything to the dev ledger, but only the first receipt
/// lookup resolves; later lookups hang until the caller's wait expires
struct StallingLedger {
    inner: Arc<InMemoryLedger>,
    lookups: AtomicUsize,
}

impl StallingLedger {
    fn new(inner: Arc<InMemoryLedger>) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LedgerClient for StallingLedger {
    async fn accounts(&self) -> ledger_client::Result<Vec<Address>> {
        self.inner.accounts().await
    }

    async fn native_balance(&self, address: &Address) -> ledger_client::Result<u128> {
        self.inner.native_balance(address).await
    }

    async fn transaction_count(&self, address: &Address) -> ledger_client::Result<u64> {
        self.inner.transaction_count(address).await
    }

    async fn call(&self, request: &CallRequest) -> ledger_client::Result<u128> {
        self.inner.call(request).await
    }

    async fn transact(&self, request: &TransactionRequest) -> ledger_client::Result<TxHash> {
        self.inner.transact(request).await
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> ledger_client::Result<u64> {
        self.inner.estimate_gas(request).await
    }

    async fn send_raw(&self, signed: &SignedTransaction) -> ledger_client::Result<TxHash> {
        self.inner.send_raw(signed).await
    }

    async fn wait_for_receipt(&self, hash: &TxHash) -> ledger_client::Result<TxReceipt> {
        if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            return self.inner.wait_for_receipt(hash).await;
        }
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_burn_reduces_total_supply() {
    let h = harness().await;
    h.seed_tokens(h.burn_wallet(), 1_000).await;

    let report = h.orchestrator.burn("100").await.unwrap();

    assert!(report.success());
    match &report.outcome {
        OperationOutcome::Confirmed { receipts } => {
            assert_eq!(receipts.len(), 1);
            assert_eq!(receipts[0].status, TxStatus::Success);
        }
        other => panic!("expected confirmation, got {:?}", other),
    }
    assert_eq!(report.snapshot.total_supply, GENESIS_SUPPLY - 100);
    assert_eq!(report.snapshot.burn_wallet_tokens, 900);
    assert!(report.settlement.is_none());
}

#[tokio::test]
async fn test_over_burn_is_rejected_not_underflowed() {
    let h = harness().await;

    // Burn wallet holds nothing at genesis
    let report = h.orchestrator.burn("100").await.unwrap();

    assert!(!report.success());
    match &report.outcome {
        OperationOutcome::Rejected { receipt } => {
            assert_eq!(receipt.status, TxStatus::Reverted);
            assert_eq!(
                receipt.revert_reason.as_deref(),
                Some("burn amount exceeds balance")
            );
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(report.snapshot.total_supply, GENESIS_SUPPLY);
    assert_eq!(report.snapshot.burn_wallet_tokens, 0);
}

#[tokio::test]
async fn test_buy_mints_tokens_and_debits_investor() {
    let h = harness().await;

    let report = h.orchestrator.buy(0, "500").await.unwrap();

    assert!(report.success());
    assert_eq!(report.snapshot.total_supply, GENESIS_SUPPLY + 500);

    let investor = &report.snapshot.investors[0];
    assert_eq!(investor.token_balance, 500);
    // Gas is metered but never charged, so the debit is the value alone
    assert_eq!(investor.native_balance, GENESIS_NATIVE - 500);

    // The crowdsale forwards the payment to the AUM wallet
    assert_eq!(report.snapshot.aum_wallet_native, GENESIS_NATIVE + 500);
}

#[tokio::test]
async fn test_buy_zero_is_a_confirmed_noop() {
    let h = harness().await;

    let report = h.orchestrator.buy(0, "0").await.unwrap();

    assert!(report.success());
    assert_eq!(h.ledger.mined_count().await, 1);
    assert_eq!(report.snapshot.total_supply, GENESIS_SUPPLY);
    assert_eq!(report.snapshot.investors[0].token_balance, 0);
    assert_eq!(report.snapshot.investors[0].native_balance, GENESIS_NATIVE);
    assert_eq!(report.snapshot.aum_wallet_native, GENESIS_NATIVE);
}

#[tokio::test]
async fn test_sell_settles_both_legs() {
    let h = harness().await;
    h.seed_tokens(h.investor(0), 500).await;

    let report = h.orchestrator.sell(0, "500").await.unwrap();

    assert!(report.success());
    match &report.outcome {
        OperationOutcome::Confirmed { receipts } => {
            assert_eq!(receipts.len(), 2);
            assert!(receipts.iter().all(|r| r.is_success()));
        }
        other => panic!("expected confirmation, got {:?}", other),
    }

    let settlement = report.settlement.as_ref().unwrap();
    assert_eq!(settlement.state(), SellState::LegBConfirmed);
    assert!(settlement.is_complete());
    assert!(settlement.token_leg().is_some());
    assert!(settlement.native_leg().is_some());

    // Tokens moved to the burn wallet, supply untouched
    assert_eq!(report.snapshot.total_supply, GENESIS_SUPPLY);
    assert_eq!(report.snapshot.burn_wallet_tokens, 500);
    assert_eq!(report.snapshot.investors[0].token_balance, 0);

    // Native payout moved from the AUM wallet to the investor
    assert_eq!(
        report.snapshot.investors[0].native_balance,
        GENESIS_NATIVE + 500
    );
    assert_eq!(report.snapshot.aum_wallet_native, GENESIS_NATIVE - 500);
}

#[tokio::test]
async fn test_native_leg_payload_follows_the_gas_policy() {
    let h = harness().await;
    h.seed_tokens(h.investor(0), 500).await;
    h.ledger.set_native_balance(h.investor(0), 0).await;

    let report = h.orchestrator.sell(0, "500").await.unwrap();
    assert!(report.success());

    // The investor started from zero native, so the payout is visible
    // as an absolute balance
    assert_eq!(report.snapshot.investors[0].native_balance, 500);
    assert_eq!(report.snapshot.aum_wallet_native, GENESIS_NATIVE - 500);

    let settlement = report.settlement.as_ref().unwrap();
    let native_leg = settlement.native_leg().unwrap();
    let signed = h.ledger.raw_submission(&native_leg.tx_hash).await.unwrap();

    assert_eq!(&signed.payload.from, h.aum_wallet());
    assert_eq!(signed.payload.to.as_ref(), Some(h.investor(0)));
    assert_eq!(signed.payload.value, 500);
    assert_eq!(signed.payload.gas_price, Some(0));
    assert_eq!(signed.payload.gas, Some(21_000));
    assert_eq!(signed.payload.nonce, Some(0));
    assert!(signed.payload.call.is_none());
}

#[tokio::test]
async fn test_sell_token_leg_revert_changes_nothing() {
    let h = harness().await;

    // Investor 0 holds no tokens, so the token leg reverts
    let report = h.orchestrator.sell(0, "500").await.unwrap();

    assert!(!report.success());
    match &report.outcome {
        OperationOutcome::Rejected { receipt } => {
            assert_eq!(receipt.status, TxStatus::Reverted);
            assert_eq!(
                receipt.revert_reason.as_deref(),
                Some("transfer amount exceeds balance")
            );
        }
        other => panic!("expected rejection, got {:?}", other),
    }

    let settlement = report.settlement.as_ref().unwrap();
    assert_eq!(settlement.state(), SellState::NotStarted);

    // Only the reverted token leg was mined; the native leg never ran
    assert_eq!(h.ledger.mined_count().await, 1);
    assert_eq!(report.snapshot.total_supply, GENESIS_SUPPLY);
    assert_eq!(report.snapshot.burn_wallet_tokens, 0);
    assert_eq!(report.snapshot.investors[0].token_balance, 0);
    assert_eq!(report.snapshot.investors[0].native_balance, GENESIS_NATIVE);
    assert_eq!(report.snapshot.aum_wallet_native, GENESIS_NATIVE);
}

#[tokio::test]
async fn test_sell_native_leg_failure_reports_incomplete() {
    let h = harness().await;
    h.seed_tokens(h.investor(0), 500).await;

    // Drain the AUM wallet so the payout cannot be funded
    h.ledger.set_native_balance(h.aum_wallet(), 0).await;

    let report = h.orchestrator.sell(0, "500").await.unwrap();

    assert!(!report.success());
    match &report.outcome {
        OperationOutcome::RedemptionIncomplete { token_leg, error } => {
            assert!(token_leg.is_success());
            assert!(error.contains("Insufficient funds"), "got: {}", error);
        }
        other => panic!("expected incomplete redemption, got {:?}", other),
    }

    let settlement = report.settlement.as_ref().unwrap();
    assert_eq!(settlement.state(), SellState::LegAConfirmedLegBFailed);
    assert!(settlement.requires_reconciliation());
    assert!(settlement.native_leg().is_none());

    // The token leg settled: investor tokens are gone, native unchanged
    assert_eq!(report.snapshot.burn_wallet_tokens, 500);
    assert_eq!(report.snapshot.investors[0].token_balance, 0);
    assert_eq!(report.snapshot.investors[0].native_balance, GENESIS_NATIVE);
    assert_eq!(report.snapshot.aum_wallet_native, 0);
}

#[tokio::test]
async fn test_sell_native_leg_timeout_reports_incomplete() {
    let mut config = Config::default();
    config.fund.confirmation_timeout_secs = 1;

    let ledger = Arc::new(InMemoryLedger::dev());
    let accounts = ledger.accounts().await.unwrap();
    let registry = WalletRegistry::from_accounts(&accounts).unwrap();
    let client: Arc<dyn LedgerClient> = Arc::new(StallingLedger::new(ledger.clone()));
    let token = FundToken::new(client.clone(), ledger.fund_token_address().clone());
    let crowdsale = Crowdsale::new(client.clone(), ledger.crowdsale_address().clone());
    let signer = Arc::new(PrivateKeySigner::from_seed(InMemoryLedger::dev_seed(3)));
    let orchestrator =
        FundOrchestrator::new(client, registry, token.clone(), crowdsale, signer, &config)
            .unwrap();

    let hash = token.transfer(&accounts[2], &accounts[5], 500).await.unwrap();
    let seeded = ledger.wait_for_receipt(&hash).await.unwrap();
    assert!(seeded.is_success(), "token seeding must not revert");

    // The token leg's receipt resolves; the native leg's wait expires
    let report = orchestrator.sell(0, "500").await.unwrap();

    assert!(!report.success());
    match &report.outcome {
        OperationOutcome::RedemptionIncomplete { token_leg, error } => {
            assert!(token_leg.is_success());
            assert!(error.contains("Confirmation timeout"), "got: {}", error);
        }
        other => panic!("expected incomplete redemption, got {:?}", other),
    }

    // An expired wait carries no receipt for the native leg
    let settlement = report.settlement.as_ref().unwrap();
    assert_eq!(settlement.state(), SellState::LegAConfirmedLegBFailed);
    assert!(settlement.requires_reconciliation());
    assert!(settlement.token_leg().is_some());
    assert!(settlement.native_leg().is_none());

    // The token leg is final regardless of the payout's fate
    assert_eq!(report.snapshot.burn_wallet_tokens, 500);
    assert_eq!(report.snapshot.investors[0].token_balance, 0);

    // The payout was broadcast and mined; only its confirmation expired
    assert_eq!(ledger.mined_count().await, 3);
}

#[tokio::test]
async fn test_snapshot_is_read_only() {
    let h = harness().await;

    let first = h.orchestrator.snapshot().await.unwrap();
    let second = h.orchestrator.snapshot().await.unwrap();

    assert_eq!(h.ledger.mined_count().await, 0);
    assert_eq!(first.total_supply, second.total_supply);
    assert_eq!(first.aum, second.aum);
    assert_eq!(first.aum_wallet_native, second.aum_wallet_native);
    assert_eq!(first.burn_wallet_tokens, second.burn_wallet_tokens);
    assert_eq!(first.investors, second.investors);
}

#[tokio::test]
async fn test_aum_subtracts_reserve_offset() {
    let h = harness().await;
    h.ledger
        .set_native_balance(h.aum_wallet(), 150 * NATIVE_UNIT)
        .await;

    let snapshot = h.orchestrator.snapshot().await.unwrap();

    assert_eq!(snapshot.aum_wallet_native, 150 * NATIVE_UNIT);
    assert_eq!(snapshot.aum, (50 * NATIVE_UNIT) as i128);
}

#[tokio::test]
async fn test_aum_goes_negative_below_reserve() {
    let h = harness().await;
    h.ledger
        .set_native_balance(h.aum_wallet(), 40 * NATIVE_UNIT)
        .await;

    let snapshot = h.orchestrator.snapshot().await.unwrap();

    assert_eq!(snapshot.aum, -((60 * NATIVE_UNIT) as i128));
}

#[tokio::test]
async fn test_malformed_amounts_never_reach_the_ledger() {
    let h = harness().await;

    for input in ["", "   ", "-5", "abc", "1.5", "+7"] {
        assert!(
            matches!(h.orchestrator.burn(input).await, Err(Error::InvalidInput(_))),
            "burn accepted {:?}",
            input
        );
        assert!(
            matches!(h.orchestrator.buy(0, input).await, Err(Error::InvalidInput(_))),
            "buy accepted {:?}",
            input
        );
        assert!(
            matches!(h.orchestrator.sell(0, input).await, Err(Error::InvalidInput(_))),
            "sell accepted {:?}",
            input
        );
    }

    assert_eq!(h.ledger.mined_count().await, 0);
}

#[tokio::test]
async fn test_whitespace_padded_amount_is_accepted() {
    let h = harness().await;

    let report = h.orchestrator.buy(0, " 42 ").await.unwrap();

    assert!(report.success());
    assert_eq!(report.snapshot.investors[0].token_balance, 42);
}

#[tokio::test]
async fn test_investor_index_out_of_range() {
    let h = harness().await;

    assert!(matches!(
        h.orchestrator.buy(5, "10").await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        h.orchestrator.sell(9, "10").await,
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(h.ledger.mined_count().await, 0);
}

#[tokio::test]
async fn test_confirmation_timeout_is_distinct_from_rejection() {
    let mut config = Config::default();
    config.fund.confirmation_timeout_secs = 1;
    let h = harness_with(config).await;
    h.seed_tokens(h.burn_wallet(), 1_000).await;

    h.ledger.hold_receipts(true).await;
    let err = h.orchestrator.burn("100").await.unwrap_err();

    match err {
        Error::ConfirmationTimeout { waited_secs, .. } => assert_eq!(waited_secs, 1),
        other => panic!("expected confirmation timeout, got {:?}", other),
    }

    // The transaction was mined; only its visibility was withheld
    assert_eq!(h.ledger.mined_count().await, 2);
}

#[tokio::test]
async fn test_signer_must_control_the_aum_wallet() {
    let ledger = Arc::new(InMemoryLedger::dev());
    let accounts = ledger.accounts().await.unwrap();
    let registry = WalletRegistry::from_accounts(&accounts).unwrap();
    let token = FundToken::new(ledger.clone(), ledger.fund_token_address().clone());
    let crowdsale = Crowdsale::new(ledger.clone(), ledger.crowdsale_address().clone());

    // Key for account 5, not the AUM wallet at account 3
    let signer = Arc::new(PrivateKeySigner::from_seed(InMemoryLedger::dev_seed(5)));

    let result = FundOrchestrator::new(
        ledger,
        registry,
        token,
        crowdsale,
        signer,
        &Config::default(),
    );
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn test_buy_then_sell_round_trip() {
    let h = harness().await;

    let bought = h.orchestrator.buy(2, "300").await.unwrap();
    assert!(bought.success());
    assert_eq!(bought.snapshot.total_supply, GENESIS_SUPPLY + 300);

    let sold = h.orchestrator.sell(2, "300").await.unwrap();
    assert!(sold.success());

    // Purchase minted, redemption parked the tokens with the burn wallet
    assert_eq!(sold.snapshot.total_supply, GENESIS_SUPPLY + 300);
    assert_eq!(sold.snapshot.burn_wallet_tokens, 300);
    assert_eq!(sold.snapshot.investors[2].token_balance, 0);

    // The investor paid the crowdsale and was repaid by the AUM wallet
    assert_eq!(
        sold.snapshot.investors[2].native_balance,
        GENESIS_NATIVE
    );
    assert_eq!(sold.snapshot.aum_wallet_native, GENESIS_NATIVE);
}

//! Domain types for fund operations
//!
//! Covers operator input validation, the operation vocabulary, the
//! two-leg redemption settlement record, and the per-operation report
//! handed back to the console.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use ledger_client::{Address, TxReceipt};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Parse an operator-supplied quantity in base units
///
/// Accepts a non-negative integer in decimal notation, with surrounding
/// whitespace tolerated. Signs, decimal points, exponents and anything
/// else are rejected before the ledger is touched.
pub fn parse_amount(input: &str) -> Result<u128> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "amount is empty, expected a non-negative integer".to_string(),
        ));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "amount '{}' is not a non-negative integer",
            trimmed
        )));
    }
    trimmed.parse::<u128>().map_err(|_| {
        Error::InvalidInput(format!("amount '{}' exceeds the supported range", trimmed))
    })
}

/// Fund operation requested by the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Burn tokens held by the burn wallet
    Burn {
        /// Token amount in base units
        amount: u128,
    },
    /// Investor purchase through the crowdsale
    Buy {
        /// Investor pool index
        investor: usize,
        /// Native value in base units
        value: u128,
    },
    /// Investor redemption, settled in two legs
    Sell {
        /// Investor pool index
        investor: usize,
        /// Token amount in base units
        tokens: u128,
    },
}

impl Operation {
    /// Short operation name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Burn { .. } => "burn",
            Operation::Buy { .. } => "buy",
            Operation::Sell { .. } => "sell",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Burn { amount } => write!(f, "burn {} tokens", amount),
            Operation::Buy { investor, value } => {
                write!(f, "buy for investor {} with {} native units", investor, value)
            }
            Operation::Sell { investor, tokens } => {
                write!(f, "sell {} tokens for investor {}", tokens, investor)
            }
        }
    }
}

/// Progress of a two-leg redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellState {
    /// Neither leg submitted
    NotStarted,
    /// Token leg mined successfully, native leg pending
    LegAConfirmed,
    /// Both legs mined successfully
    LegBConfirmed,
    /// Token leg mined, native leg failed; manual reconciliation needed
    LegAConfirmedLegBFailed,
}

impl SellState {
    /// Stable string form for logs and rendering
    pub fn as_str(&self) -> &'static str {
        match self {
            SellState::NotStarted => "NOT_STARTED",
            SellState::LegAConfirmed => "LEG_A_CONFIRMED",
            SellState::LegBConfirmed => "LEG_B_CONFIRMED",
            SellState::LegAConfirmedLegBFailed => "LEG_A_CONFIRMED_LEG_B_FAILED",
        }
    }
}

impl fmt::Display for SellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settlement record for one redemption
///
/// Transitions only move forward: the token leg confirms first, then the
/// native leg either confirms or fails. There is no rollback state; a
/// failed native leg after a confirmed token leg is a terminal condition
/// the operator resolves off-system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellSettlement {
    state: SellState,
    token_leg: Option<TxReceipt>,
    native_leg: Option<TxReceipt>,
}

impl Default for SellSettlement {
    fn default() -> Self {
        Self::new()
    }
}

impl SellSettlement {
    /// Fresh settlement with neither leg submitted
    pub fn new() -> Self {
        Self {
            state: SellState::NotStarted,
            token_leg: None,
            native_leg: None,
        }
    }

    /// Current settlement state
    pub fn state(&self) -> SellState {
        self.state
    }

    /// Receipt of the token leg, once mined
    pub fn token_leg(&self) -> Option<&TxReceipt> {
        self.token_leg.as_ref()
    }

    /// Receipt of the native leg, once mined
    pub fn native_leg(&self) -> Option<&TxReceipt> {
        self.native_leg.as_ref()
    }

    /// Record a successful token leg
    pub fn confirm_token_leg(&mut self, receipt: TxReceipt) -> Result<()> {
        if self.state != SellState::NotStarted {
            return Err(Error::InvalidState(format!(
                "token leg cannot confirm from {}",
                self.state
            )));
        }
        self.token_leg = Some(receipt);
        self.state = SellState::LegAConfirmed;
        Ok(())
    }

    /// Record a successful native leg
    pub fn confirm_native_leg(&mut self, receipt: TxReceipt) -> Result<()> {
        if self.state != SellState::LegAConfirmed {
            return Err(Error::InvalidState(format!(
                "native leg cannot confirm from {}",
                self.state
            )));
        }
        self.native_leg = Some(receipt);
        self.state = SellState::LegBConfirmed;
        Ok(())
    }

    /// Record a failed native leg, with its receipt when one was mined
    pub fn fail_native_leg(&mut self, receipt: Option<TxReceipt>) -> Result<()> {
        if self.state != SellState::LegAConfirmed {
            return Err(Error::InvalidState(format!(
                "native leg cannot fail from {}",
                self.state
            )));
        }
        self.native_leg = receipt;
        self.state = SellState::LegAConfirmedLegBFailed;
        Ok(())
    }

    /// True when the token leg settled but the native leg did not
    pub fn requires_reconciliation(&self) -> bool {
        self.state == SellState::LegAConfirmedLegBFailed
    }

    /// True when both legs settled
    pub fn is_complete(&self) -> bool {
        self.state == SellState::LegBConfirmed
    }
}

/// Definite result of one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationOutcome {
    /// Every leg mined successfully
    Confirmed {
        /// Receipts in submission order
        receipts: Vec<TxReceipt>,
    },
    /// The ledger mined the transaction and reverted it; no state changed
    Rejected {
        /// Receipt of the reverted transaction
        receipt: TxReceipt,
    },
    /// Token leg settled, native payout did not
    RedemptionIncomplete {
        /// Receipt of the confirmed token leg
        token_leg: TxReceipt,
        /// What went wrong on the native leg
        error: String,
    },
}

impl OperationOutcome {
    /// Short outcome name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationOutcome::Confirmed { .. } => "CONFIRMED",
            OperationOutcome::Rejected { .. } => "REJECTED",
            OperationOutcome::RedemptionIncomplete { .. } => "REDEMPTION_INCOMPLETE",
        }
    }
}

/// One investor row in the fund snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorAccount {
    /// Investor pool index
    pub index: usize,
    /// Ledger address
    pub address: Address,
    /// Native balance in base units
    pub native_balance: u128,
    /// Token balance in base units
    pub token_balance: u128,
}

/// Point-in-time view of the fund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundSnapshot {
    /// Total token supply in base units
    pub total_supply: u128,
    /// Assets under management, signed
    pub aum: i128,
    /// Raw native balance of the AUM wallet
    pub aum_wallet_native: u128,
    /// Token balance of the burn wallet
    pub burn_wallet_tokens: u128,
    /// Investor pool rows, in position order
    pub investors: Vec<InvestorAccount>,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}

/// Everything the console needs to render one finished operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReport {
    /// Unique id for correlating logs
    pub operation_id: Uuid,
    /// What was requested
    pub operation: Operation,
    /// How it ended
    pub outcome: OperationOutcome,
    /// Settlement record, present for redemptions
    pub settlement: Option<SellSettlement>,
    /// Fund state recomputed after the operation
    pub snapshot: FundSnapshot,
    /// When the operation finished
    pub completed_at: DateTime<Utc>,
}

impl OperationReport {
    /// True when every leg confirmed
    pub fn success(&self) -> bool {
        matches!(self.outcome, OperationOutcome::Confirmed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_client::{TxHash, TxStatus};

    fn receipt(status: TxStatus) -> TxReceipt {
        TxReceipt {
            tx_hash: TxHash::from_bytes(&[7u8; 32]),
            status,
            block_number: 1,
            gas_used: 21_000,
            from: Address::from_bytes(&[1u8; 20]),
            to: Some(Address::from_bytes(&[2u8; 20])),
            revert_reason: None,
            mined_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_amount_accepts_integers() {
        assert_eq!(parse_amount("0").unwrap(), 0);
        assert_eq!(parse_amount("500").unwrap(), 500);
        assert_eq!(parse_amount(" 42 ").unwrap(), 42);
        assert_eq!(parse_amount(&u128::MAX.to_string()).unwrap(), u128::MAX);
    }

    #[test]
    fn test_parse_amount_rejects_junk() {
        for input in ["", "   ", "-5", "abc", "1.5", "+7", "1e3", "0x10"] {
            assert!(
                matches!(parse_amount(input), Err(Error::InvalidInput(_))),
                "expected rejection for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_parse_amount_rejects_overflow() {
        let too_big = format!("{}0", u128::MAX);
        assert!(matches!(
            parse_amount(&too_big),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_settlement_happy_path() {
        let mut settlement = SellSettlement::new();
        assert_eq!(settlement.state(), SellState::NotStarted);

        settlement.confirm_token_leg(receipt(TxStatus::Success)).unwrap();
        assert_eq!(settlement.state(), SellState::LegAConfirmed);
        assert!(settlement.token_leg().is_some());
        assert!(!settlement.is_complete());

        settlement.confirm_native_leg(receipt(TxStatus::Success)).unwrap();
        assert_eq!(settlement.state(), SellState::LegBConfirmed);
        assert!(settlement.is_complete());
        assert!(!settlement.requires_reconciliation());
    }

    #[test]
    fn test_settlement_native_leg_failure() {
        let mut settlement = SellSettlement::new();
        settlement.confirm_token_leg(receipt(TxStatus::Success)).unwrap();
        settlement.fail_native_leg(Some(receipt(TxStatus::Reverted))).unwrap();

        assert_eq!(settlement.state(), SellState::LegAConfirmedLegBFailed);
        assert!(settlement.requires_reconciliation());
        assert!(!settlement.is_complete());
        assert!(settlement.token_leg().is_some());
        assert!(settlement.native_leg().is_some());
    }

    #[test]
    fn test_settlement_rejects_out_of_order_transitions() {
        let mut settlement = SellSettlement::new();
        assert!(matches!(
            settlement.confirm_native_leg(receipt(TxStatus::Success)),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            settlement.fail_native_leg(None),
            Err(Error::InvalidState(_))
        ));

        settlement.confirm_token_leg(receipt(TxStatus::Success)).unwrap();
        assert!(matches!(
            settlement.confirm_token_leg(receipt(TxStatus::Success)),
            Err(Error::InvalidState(_))
        ));

        settlement.confirm_native_leg(receipt(TxStatus::Success)).unwrap();
        assert!(matches!(
            settlement.fail_native_leg(None),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_operation_display() {
        let op = Operation::Sell {
            investor: 2,
            tokens: 500,
        };
        assert_eq!(op.kind(), "sell");
        assert_eq!(op.to_string(), "sell 500 tokens for investor 2");
    }
}

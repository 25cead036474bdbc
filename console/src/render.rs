//! Console rendering for snapshots and operation reports

use fund_core::{FundSnapshot, OperationOutcome, OperationReport};
use ledger_client::TxReceipt;
use rust_decimal::Decimal;

/// Native currency decimals used for display
const NATIVE_DECIMALS: u32 = 18;

pub fn banner() {
    println!();
    println!("🏦 =====================================================");
    println!("🏦 Tokenized Fund Console");
    println!("🏦 burn | buy | sell | investor | refresh | help | quit");
    println!("🏦 =====================================================");
}

pub fn help() {
    println!();
    println!("Commands:");
    println!("  burn <amount>            burn tokens held by the burn wallet");
    println!("  buy <investor> <value>   buy tokens, paying <value> native base units");
    println!("  sell <investor> <tokens> redeem tokens for native currency");
    println!("  investor <index>         show one investor's balances");
    println!("  refresh                  re-read the fund snapshot");
    println!("  help                     show this message");
    println!("  quit                     leave the console");
    println!();
    println!("Amounts are non-negative integers in base units.");
}

pub fn snapshot(snapshot: &FundSnapshot) {
    println!();
    println!(
        "📊 Fund state at {}",
        snapshot.taken_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("   Total token supply:  {}", snapshot.total_supply);
    println!("   Burn wallet tokens:  {}", snapshot.burn_wallet_tokens);
    println!(
        "   AUM wallet balance:  {} native",
        format_native(snapshot.aum_wallet_native)
    );
    println!(
        "   Assets under mgmt:   {} native",
        format_signed_native(snapshot.aum)
    );
    if snapshot.aum < 0 {
        println!("   ⚠️  AUM is negative, the wallet sits below its reserve");
    }
    println!("   Investors:");
    for investor in &snapshot.investors {
        println!(
            "     [{}] {}  tokens: {}  native: {}",
            investor.index,
            investor.address,
            investor.token_balance,
            format_native(investor.native_balance)
        );
    }
    println!();
}

pub fn report(report: &OperationReport) {
    println!();
    println!("Operation {} ({})", report.operation, report.operation_id);

    match &report.outcome {
        OperationOutcome::Confirmed { receipts } => {
            println!("✅ Confirmed in {} transaction(s)", receipts.len());
            for receipt in receipts {
                print_receipt(receipt);
            }
        }
        OperationOutcome::Rejected { receipt } => {
            println!(
                "❌ Rejected by the ledger: {}",
                receipt.revert_reason.as_deref().unwrap_or("no reason given")
            );
            print_receipt(receipt);
        }
        OperationOutcome::RedemptionIncomplete { token_leg, error } => {
            println!("⚠️  Redemption incomplete: tokens moved, native payout did not");
            println!("⚠️  Native leg error: {}", error);
            println!("⚠️  Manual reconciliation required");
            print_receipt(token_leg);
        }
    }

    if let Some(settlement) = &report.settlement {
        println!("   Settlement state: {}", settlement.state());
    }

    snapshot(&report.snapshot);
}

fn print_receipt(receipt: &TxReceipt) {
    match serde_json::to_string_pretty(receipt) {
        Ok(json) => {
            for line in json.lines() {
                println!("   {}", line);
            }
        }
        Err(_) => println!("   {:?}", receipt),
    }
}

/// Render base units as whole native units where they fit in a decimal
fn format_native(value: u128) -> String {
    i128::try_from(value)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, NATIVE_DECIMALS).ok())
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| format!("{} base units", value))
}

fn format_signed_native(value: i128) -> String {
    Decimal::try_from_i128_with_scale(value, NATIVE_DECIMALS)
        .ok()
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| format!("{} base units", value))
}

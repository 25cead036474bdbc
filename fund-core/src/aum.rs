//! Assets-under-management arithmetic
//!
//! AUM is the native balance of the AUM wallet minus a configured
//! reserve offset. The result is signed and never clamped: a negative
//! figure means the wallet has been drawn below its reserve, and the
//! operator needs to see that.

/// Reserve offset subtracted from the AUM wallet balance, in base units
/// (100 native units at 18 decimals)
pub const DEFAULT_RESERVE_OFFSET: u128 = 100_000_000_000_000_000_000;

/// Assets under management: wallet balance minus the reserve offset
///
/// Saturates at the `i128` boundaries, which sit far beyond any balance
/// a ledger can represent in practice.
pub fn compute_aum(balance: u128, reserve_offset: u128) -> i128 {
    if balance >= reserve_offset {
        i128::try_from(balance - reserve_offset).unwrap_or(i128::MAX)
    } else {
        i128::try_from(reserve_offset - balance)
            .map(|excess| -excess)
            .unwrap_or(i128::MIN)
    }
}

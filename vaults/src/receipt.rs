//! Receipts returned by completed vault operations.
//!
//! A receipt is the caller's copy of what the audit record says; it
//! carries everything needed to reconcile against an external system
//! without re-reading vault state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cairn_engine::asset::AssetId;

/// Returned by a completed deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// The asset that was deposited.
    pub asset: AssetId,

    /// The deposited amount in raw asset units.
    pub raw_amount: u128,

    /// The credited value in the vault's accounting unit.
    pub normalized_amount: u128,

    /// The caller's balance after the credit, in the unit the balance
    /// is kept in (raw units for the two-level generation, normalized
    /// units otherwise).
    pub new_balance: u128,

    /// When the deposit completed (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Returned by a completed withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    /// The released amount, in the vault's withdrawal unit.
    pub amount: u128,

    /// The caller's balance after the debit.
    pub remaining_balance: u128,

    /// When the withdrawal completed (UTC).
    pub timestamp: DateTime<Utc>,
}

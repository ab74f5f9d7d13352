//! The vault error taxonomy.
//!
//! Engine-layer errors are flattened or wrapped into one enum so that
//! integrating clients and tests assert on a single type with full
//! diagnostic fields. Every variant aborts its call with zero partial
//! state change.

use thiserror::Error;

use cairn_engine::asset::AssetId;
use cairn_engine::balance::BalanceError;
use cairn_engine::external::{AccessError, TransferError};
use cairn_engine::ledger::LedgerError;
use cairn_engine::valuation::ValuationError;

use crate::guard::ReentrantEntry;

/// Every way a vault call can fail.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The input amount was zero, or converted to zero normalized value.
    #[error("amount must convert to a non-zero value")]
    InvalidAmount,

    /// The withdrawal exceeds the fixed per-call ceiling.
    #[error("withdrawal of {requested} exceeds the per-call ceiling of {allowed}")]
    LimitExceeded {
        /// The requested withdrawal amount.
        requested: u128,
        /// The per-call ceiling.
        allowed: u128,
    },

    /// The caller's balance does not cover the withdrawal.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The caller's balance at the time of the call.
        available: u128,
        /// The requested withdrawal amount.
        requested: u128,
    },

    /// Admitting the deposit would exceed the capacity ceiling.
    #[error("capacity exceeded: {remaining} remaining")]
    CapacityExceeded {
        /// Normalized headroom left under the ceiling.
        remaining: u128,
    },

    /// The asset is not registered with this vault.
    #[error("asset {0} is not supported")]
    UnsupportedAsset(AssetId),

    /// The asset mover failed the custody transfer.
    #[error("transfer failed: {0}")]
    TransferFailed(#[source] TransferError),

    /// The valuation strategy could not convert the amount.
    #[error(transparent)]
    Valuation(#[from] ValuationError),

    /// A reserved zero identifier was passed where a real account or
    /// asset is required.
    #[error("the zero address is not a valid account or asset")]
    ZeroAddress,

    /// The caller is not authorized for a privileged operation.
    #[error(transparent)]
    Unauthorized(#[from] AccessError),

    /// A mutation section was entered re-entrantly.
    #[error("re-entrant call rejected")]
    ReentrantCall,

    /// Balance arithmetic overflowed.
    #[error("balance arithmetic overflow")]
    Overflow,
}

impl From<BalanceError> for VaultError {
    fn from(error: BalanceError) -> Self {
        match error {
            BalanceError::InsufficientBalance {
                available,
                requested,
            } => Self::InsufficientBalance {
                available,
                requested,
            },
            BalanceError::Overflow { .. } => Self::Overflow,
        }
    }
}

impl From<LedgerError> for VaultError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::CapacityExceeded { remaining } => Self::CapacityExceeded { remaining },
        }
    }
}

impl From<TransferError> for VaultError {
    fn from(error: TransferError) -> Self {
        Self::TransferFailed(error)
    }
}

impl From<ReentrantEntry> for VaultError {
    fn from(_: ReentrantEntry) -> Self {
        Self::ReentrantCall
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_errors_flatten_with_fields() {
        let error: VaultError = BalanceError::InsufficientBalance {
            available: 5,
            requested: 9,
        }
        .into();
        assert!(matches!(
            error,
            VaultError::InsufficientBalance {
                available: 5,
                requested: 9,
            }
        ));
    }

    #[test]
    fn ledger_errors_flatten_with_remaining() {
        let error: VaultError = LedgerError::CapacityExceeded { remaining: 42 }.into();
        assert!(matches!(
            error,
            VaultError::CapacityExceeded { remaining: 42 }
        ));
    }

    #[test]
    fn valuation_errors_pass_through() {
        let error: VaultError = ValuationError::OracleCompromised.into();
        assert!(matches!(
            error,
            VaultError::Valuation(ValuationError::OracleCompromised)
        ));
    }
}

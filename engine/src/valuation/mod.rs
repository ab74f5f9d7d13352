//! # Valuation Strategies
//!
//! Converts a foreign-denominated deposit into the ledger's normalized
//! accounting unit. Two strategies, selected at vault construction:
//!
//! - [`OracleValuation`] -- prices the native currency through a
//!   staleness-checked external sample; registered assets that already
//!   carry the normalized denomination convert by decimal scaling alone.
//! - [`SwapValuation`] -- actually exchanges the deposit for the
//!   canonical asset through a fixed conversion path, bounded by a
//!   relative slippage tolerance and a validity window.
//!
//! A strategy is an interface, not a hierarchy: vaults hold a concrete
//! strategy and the trait exists for the seam, per the rest of the
//! engine's collaborator style.

use thiserror::Error;

use crate::asset::AssetId;

mod oracle;
mod swap;

pub use oracle::OracleValuation;
pub use swap::SwapValuation;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while valuing a deposit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValuationError {
    /// The price feed reported a non-positive value.
    #[error("price feed reported a non-positive value")]
    OracleCompromised,

    /// The price sample is older than the tolerated heartbeat.
    #[error("price sample is {age_secs}s old, exceeding the {heartbeat_secs}s heartbeat")]
    StalePrice {
        /// Age of the sample at the time of the call.
        age_secs: i64,
        /// The configured maximum tolerated age.
        heartbeat_secs: i64,
    },

    /// The exchange failed the conversion, or nominally succeeded while
    /// producing no output.
    #[error("swap failed: {reason}")]
    SwapFailed {
        /// Human-readable cause.
        reason: String,
    },

    /// The swap did not settle within its validity window.
    #[error("swap deadline expired")]
    DeadlineExpired,

    /// The strategy has no denomination on file for the asset.
    #[error("no denomination registered for asset {0}")]
    UnknownDenomination(AssetId),

    /// Fixed-point arithmetic overflowed.
    #[error("conversion arithmetic overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// ValuationProvider
// ---------------------------------------------------------------------------

/// Converts a raw asset amount into the normalized accounting unit.
///
/// Implementations must be pure with respect to vault state: they may
/// call external collaborators (feed, router) but never touch balances.
pub trait ValuationProvider {
    /// Returns the normalized value of `amount` raw units of `asset`.
    fn convert(&self, asset: &AssetId, amount: u128) -> Result<u128, ValuationError>;
}

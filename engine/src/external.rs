//! # Collaborator Seams
//!
//! Everything the engine talks to but does not own: the asset-transfer
//! primitive, the access-check capability, the price feed, and the swap
//! router. Each is a trait so that vaults are assembled from injected
//! collaborators rather than reaching for process-wide globals.
//!
//! Collaborators are assumed adversarial. Any of them may fail, and any
//! of them may re-invoke the vault before its own call returns; the
//! vault's checks-effects-interactions discipline is what makes that
//! safe, not anything these traits promise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::asset::{AccountId, AssetId};

// ---------------------------------------------------------------------------
// AssetMover
// ---------------------------------------------------------------------------

/// Errors signalled by an [`AssetMover`].
///
/// The engine does not interpret the reason; it only distinguishes
/// success from failure and surfaces the cause in `TransferFailed`.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferError {
    /// The mover rejected or could not complete the transfer.
    #[error("transfer rejected: {reason}")]
    Rejected {
        /// Human-readable cause, verbatim from the mover.
        reason: String,
    },
}

/// The low-level custody transfer primitive.
///
/// Assumed to either fully succeed or signal failure; the engine is
/// defensively tolerant of non-conforming implementations in that it
/// draws no conclusion from anything but the returned `Result`. Partial
/// transfers are the mover's bug to not have.
pub trait AssetMover: Send + Sync {
    /// Pulls `amount` of `asset` from `from` into vault custody.
    fn pull(&self, from: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError>;

    /// Releases `amount` of `asset` from vault custody to `to`.
    fn release(&self, to: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError>;

    /// Grants the exchange a spending allowance over `amount` of `asset`
    /// held in vault custody. Only the swap generation's token path uses
    /// this.
    fn grant_allowance(&self, asset: &AssetId, amount: u128) -> Result<(), TransferError>;
}

// ---------------------------------------------------------------------------
// AccessControl
// ---------------------------------------------------------------------------

/// A privileged configuration operation, named for authorization checks
/// and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivilegedAction {
    /// Replace the capacity ceiling.
    SetCapacity,
    /// Replace the price feed reference.
    SetPriceFeed,
    /// Register an accepted asset.
    AddAsset,
}

impl fmt::Display for PrivilegedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetCapacity => write!(f, "SetCapacity"),
            Self::SetPriceFeed => write!(f, "SetPriceFeed"),
            Self::AddAsset => write!(f, "AddAsset"),
        }
    }
}

/// Errors signalled by an [`AccessControl`] check.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessError {
    /// The caller is not authorized for the action.
    #[error("account {caller} is not authorized for {action}")]
    Denied {
        /// The caller that was rejected.
        caller: AccountId,
        /// The action that was attempted.
        action: PrivilegedAction,
    },
}

/// The injected authorization capability for privileged configuration.
pub trait AccessControl: Send + Sync {
    /// Checks that `caller` may perform `action`.
    fn ensure(&self, caller: &AccountId, action: PrivilegedAction) -> Result<(), AccessError>;
}

// ---------------------------------------------------------------------------
// PriceFeed
// ---------------------------------------------------------------------------

/// One price observation from an external feed.
///
/// `value` carries [`PRICE_DECIMALS`](crate::config::PRICE_DECIMALS)
/// fractional digits and is signed because compromised feeds have been
/// observed reporting zero and negative values; the valuation layer
/// rejects both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSample {
    /// The reported price of one whole native unit, in the reference
    /// currency.
    pub value: i128,
    /// When the feed last updated this sample.
    pub updated_at: DateTime<Utc>,
}

/// An external price-sample source for the oracle generation.
///
/// Reading the latest sample is infallible by contract: a feed always
/// has *some* most-recent observation. Whether that observation is
/// usable (fresh, positive) is the valuation layer's judgment.
pub trait PriceFeed: Send + Sync {
    /// Returns the most recent price sample.
    fn latest_sample(&self) -> PriceSample;

    /// A short human-readable identification of the feed, carried in
    /// audit records when the feed reference is replaced.
    fn description(&self) -> String;
}

// ---------------------------------------------------------------------------
// SwapRouter
// ---------------------------------------------------------------------------

/// Errors signalled by a [`SwapRouter`].
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapCallError {
    /// The execution did not settle within its validity window.
    #[error("swap deadline expired")]
    DeadlineExpired,

    /// The router rejected the call (insufficient output, missing pair,
    /// whatever the venue's reason).
    #[error("router rejected the swap: {reason}")]
    Rejected {
        /// Human-readable cause, verbatim from the router.
        reason: String,
    },
}

/// The external exchange used by the swap generation.
///
/// The engine holds the conversion path fixed and never routes; it asks
/// for one non-binding quote and one bounded execution per deposit.
pub trait SwapRouter: Send + Sync {
    /// Returns the expected output of swapping `amount_in` along `path`.
    /// Non-binding: the execution may return less.
    fn quote(&self, amount_in: u128, path: &[AssetId]) -> Result<u128, SwapCallError>;

    /// Executes the swap. The router must return at least `minimum_out`
    /// or fail the call, and must fail once `deadline` has passed.
    fn swap_exact_in(
        &self,
        amount_in: u128,
        minimum_out: u128,
        path: &[AssetId],
        deadline: DateTime<Utc>,
    ) -> Result<u128, SwapCallError>;
}

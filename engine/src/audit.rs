//! # Audit Records
//!
//! Every completed state transition emits exactly one immutable record.
//! The engine writes them and never reads them back; consumption is an
//! external observer's concern, behind the [`AuditSink`] seam.
//!
//! Records are emitted *after* the transition is durable and the entry
//! permit has been released, so a sink can legally re-invoke the vault
//! without observing half-applied state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::{AccountId, AssetId};

// ---------------------------------------------------------------------------
// Record payloads
// ---------------------------------------------------------------------------

/// A completed deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMade {
    /// Unique record id.
    pub id: Uuid,
    /// When the deposit completed.
    pub at: DateTime<Utc>,
    /// The depositing account.
    pub account: AccountId,
    /// The asset that was deposited.
    pub asset: AssetId,
    /// Deposited amount in raw asset units.
    pub raw_amount: u128,
    /// Credited value in the vault's accounting unit.
    pub normalized_amount: u128,
}

/// A completed withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalMade {
    /// Unique record id.
    pub id: Uuid,
    /// When the withdrawal completed.
    pub at: DateTime<Utc>,
    /// The withdrawing account.
    pub account: AccountId,
    /// The asset that was released.
    pub asset: AssetId,
    /// Released amount in raw asset units.
    pub amount: u128,
    /// The account's balance after the debit.
    pub remaining_balance: u128,
}

/// A replaced capacity ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityUpdated {
    /// Unique record id.
    pub id: Uuid,
    /// When the ceiling was replaced.
    pub at: DateTime<Utc>,
    /// The ceiling before the call.
    pub previous: u128,
    /// The ceiling after the call.
    pub capacity: u128,
}

/// A replaced price-feed reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedUpdated {
    /// Unique record id.
    pub id: Uuid,
    /// When the feed was replaced.
    pub at: DateTime<Utc>,
    /// Description of the feed now in use.
    pub feed: String,
}

/// A newly registered asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAdded {
    /// Unique record id.
    pub id: Uuid,
    /// When the asset was registered.
    pub at: DateTime<Utc>,
    /// The registered asset.
    pub asset: AssetId,
    /// Display symbol at registration time.
    pub symbol: String,
    /// Fractional digits at registration time.
    pub decimals: u8,
}

// ---------------------------------------------------------------------------
// AuditEvent
// ---------------------------------------------------------------------------

/// One immutable record of one completed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEvent {
    /// A deposit was credited.
    DepositMade(DepositMade),
    /// A withdrawal was released.
    WithdrawalMade(WithdrawalMade),
    /// The capacity ceiling was replaced.
    CapacityUpdated(CapacityUpdated),
    /// The price feed reference was replaced.
    FeedUpdated(FeedUpdated),
    /// An asset was registered.
    AssetAdded(AssetAdded),
}

impl AuditEvent {
    /// The record kind as a stable string, for filters and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DepositMade(_) => "DepositMade",
            Self::WithdrawalMade(_) => "WithdrawalMade",
            Self::CapacityUpdated(_) => "CapacityUpdated",
            Self::FeedUpdated(_) => "FeedUpdated",
            Self::AssetAdded(_) => "AssetAdded",
        }
    }
}

// ---------------------------------------------------------------------------
// AuditSink
// ---------------------------------------------------------------------------

/// Write-only destination for audit records.
///
/// Sinks must not fail: auditing is observation, and a broken observer
/// must never be able to roll back a settled transition.
pub trait AuditSink: Send + Sync {
    /// Records one completed transition.
    fn record(&self, event: AuditEvent);
}

/// A sink that drops every record. Useful when a vault is assembled for
/// pure computation (tests of unrelated behavior, dry runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

//! # Global Ledger State
//!
//! One [`LedgerState`] per vault: the capacity ceiling, the running total
//! of custodied value in the vault's accounting unit, and the operation
//! counters. The capacity check and the total are updated in the same
//! call, under the same lock, so the invariant `current_total <= capacity`
//! holds after every successful state-changing operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by capacity accounting.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Admitting the deposit would push the running total past the
    /// capacity ceiling.
    #[error("capacity exceeded: {remaining} remaining")]
    CapacityExceeded {
        /// How much normalized value the vault can still admit.
        remaining: u128,
    },
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// Capacity ceiling, running total, and operation counters for one vault.
///
/// All value fields are denominated in the owning vault's accounting
/// unit; the counters count completed operations, not value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerState {
    capacity: u128,
    current_total: u128,
    deposit_count: u64,
    withdrawal_count: u64,
}

impl LedgerState {
    /// Creates a fresh ledger with the given capacity and nothing
    /// custodied.
    pub fn new(capacity: u128) -> Self {
        Self {
            capacity,
            current_total: 0,
            deposit_count: 0,
            withdrawal_count: 0,
        }
    }

    /// The capacity ceiling.
    pub fn capacity(&self) -> u128 {
        self.capacity
    }

    /// The running total of custodied value.
    pub fn current_total(&self) -> u128 {
        self.current_total
    }

    /// How much value the vault can still admit.
    pub fn remaining(&self) -> u128 {
        self.capacity.saturating_sub(self.current_total)
    }

    /// Number of completed deposits.
    pub fn deposit_count(&self) -> u64 {
        self.deposit_count
    }

    /// Number of completed withdrawals.
    pub fn withdrawal_count(&self) -> u64 {
        self.withdrawal_count
    }

    /// Checks whether `amount` fits under the ceiling without mutating.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CapacityExceeded`] with the remaining
    /// headroom otherwise.
    pub fn admit(&self, amount: u128) -> Result<(), LedgerError> {
        let admitted = self
            .current_total
            .checked_add(amount)
            .ok_or(LedgerError::CapacityExceeded {
                remaining: self.remaining(),
            })?;
        if admitted > self.capacity {
            return Err(LedgerError::CapacityExceeded {
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Admits a deposit: bumps the running total and the deposit counter.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CapacityExceeded`] and leaves the state
    /// untouched if the amount does not fit.
    pub fn record_deposit(&mut self, amount: u128) -> Result<(), LedgerError> {
        self.admit(amount)?;
        self.current_total += amount;
        self.deposit_count += 1;
        Ok(())
    }

    /// Settles a withdrawal: drops the running total and bumps the
    /// withdrawal counter.
    ///
    /// The total saturates at zero. In the oracle generation the debit is
    /// valued at the current price, which can exceed what deposit-time
    /// prices contributed; clamping keeps the ledger consistent instead
    /// of underflowing.
    pub fn record_withdrawal(&mut self, amount: u128) {
        self.current_total = self.current_total.saturating_sub(amount);
        self.withdrawal_count += 1;
    }

    /// Reverses a [`record_withdrawal`](Self::record_withdrawal) after a
    /// failed release. Must not fail: saturates instead.
    pub fn rollback_withdrawal(&mut self, amount: u128) {
        self.current_total = self.current_total.saturating_add(amount);
        self.withdrawal_count = self.withdrawal_count.saturating_sub(1);
    }

    /// Replaces the capacity ceiling and returns the previous value.
    ///
    /// Lowering the ceiling below the current total is allowed: existing
    /// custody stays, further deposits are blocked until the total drops.
    pub fn set_capacity(&mut self, capacity: u128) -> u128 {
        std::mem::replace(&mut self.capacity, capacity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

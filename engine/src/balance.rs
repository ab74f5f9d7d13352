//! # Balance Books
//!
//! The books are where custody actually lives. Two shapes, matching the
//! two ledger generations:
//!
//! - [`UnitBook`] -- one amount per account, for generations whose entire
//!   ledger is denominated in a single unit (native-only custody, or a
//!   canonical stable asset).
//! - [`AssetBook`] -- one amount per `(account, asset)` pair, for the
//!   two-level generation that custodies several raw denominations side
//!   by side.
//!
//! Both enforce the same two rules: a balance never goes negative, and a
//! credit never silently wraps. Everything is checked `u128` arithmetic;
//! a failed operation leaves the book untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::asset::{AccountId, AssetId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during book operations.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// Attempted to debit more than the available balance.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The balance at the time of the failed debit.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// Arithmetic overflow during a credit.
    ///
    /// Nothing legitimate credits anywhere near `u128::MAX`; hitting this
    /// is either a bug upstream or an attack.
    #[error("balance overflow: current {current}, credit {credit}")]
    Overflow {
        /// The balance before the failed credit.
        current: u128,
        /// The amount that caused the overflow.
        credit: u128,
    },
}

// ---------------------------------------------------------------------------
// UnitBook
// ---------------------------------------------------------------------------

/// Per-account balances in a single denomination.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UnitBook {
    balances: HashMap<AccountId, u128>,
}

impl UnitBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits an account and returns its new balance.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Overflow`] if the credit would exceed
    /// `u128::MAX`. The book is unchanged on error.
    pub fn credit(&mut self, account: AccountId, amount: u128) -> Result<u128, BalanceError> {
        let balance = self.balances.entry(account).or_insert(0);
        let updated = balance
            .checked_add(amount)
            .ok_or(BalanceError::Overflow {
                current: *balance,
                credit: amount,
            })?;
        *balance = updated;
        Ok(updated)
    }

    /// Debits an account and returns its remaining balance.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::InsufficientBalance`] if the debit exceeds
    /// the current balance. The book is unchanged on error.
    pub fn debit(&mut self, account: &AccountId, amount: u128) -> Result<u128, BalanceError> {
        let balance = self.balances.get_mut(account).ok_or(
            BalanceError::InsufficientBalance {
                available: 0,
                requested: amount,
            },
        )?;
        if *balance < amount {
            return Err(BalanceError::InsufficientBalance {
                available: *balance,
                requested: amount,
            });
        }
        *balance -= amount;
        Ok(*balance)
    }

    /// Credits without failing, saturating on overflow.
    ///
    /// Rollback paths restore a balance they debited moments earlier and
    /// must not themselves be able to fail.
    pub fn credit_saturating(&mut self, account: AccountId, amount: u128) -> u128 {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
        *balance
    }

    /// Returns an account's balance. Unknown accounts hold zero.
    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Returns the number of accounts with a book entry.
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }
}

// ---------------------------------------------------------------------------
// AssetBook
// ---------------------------------------------------------------------------

/// Per-account, per-asset balances in raw asset units.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssetBook {
    accounts: HashMap<AccountId, HashMap<AssetId, u128>>,
}

impl AssetBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits an `(account, asset)` position and returns its new balance.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Overflow`] if the credit would exceed
    /// `u128::MAX`. The book is unchanged on error.
    pub fn credit(
        &mut self,
        account: AccountId,
        asset: AssetId,
        amount: u128,
    ) -> Result<u128, BalanceError> {
        let balance = self
            .accounts
            .entry(account)
            .or_default()
            .entry(asset)
            .or_insert(0);
        let updated = balance
            .checked_add(amount)
            .ok_or(BalanceError::Overflow {
                current: *balance,
                credit: amount,
            })?;
        *balance = updated;
        Ok(updated)
    }

    /// Debits an `(account, asset)` position and returns the remainder.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::InsufficientBalance`] if the debit exceeds
    /// the current balance. The book is unchanged on error.
    pub fn debit(
        &mut self,
        account: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<u128, BalanceError> {
        let balance = self
            .accounts
            .get_mut(account)
            .and_then(|assets| assets.get_mut(asset))
            .ok_or(BalanceError::InsufficientBalance {
                available: 0,
                requested: amount,
            })?;
        if *balance < amount {
            return Err(BalanceError::InsufficientBalance {
                available: *balance,
                requested: amount,
            });
        }
        *balance -= amount;
        Ok(*balance)
    }

    /// Credits without failing, saturating on overflow. See
    /// [`UnitBook::credit_saturating`].
    pub fn credit_saturating(&mut self, account: AccountId, asset: AssetId, amount: u128) -> u128 {
        let balance = self
            .accounts
            .entry(account)
            .or_default()
            .entry(asset)
            .or_insert(0);
        *balance = balance.saturating_add(amount);
        *balance
    }

    /// Returns an `(account, asset)` balance. Unknown positions hold zero.
    pub fn balance_of(&self, account: &AccountId, asset: &AssetId) -> u128 {
        self.accounts
            .get(account)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(0)
    }

    /// Returns all non-zero positions of one account.
    pub fn holdings_of(&self, account: &AccountId) -> Vec<(AssetId, u128)> {
        self.accounts
            .get(account)
            .map(|assets| {
                assets
                    .iter()
                    .filter(|(_, amount)| **amount > 0)
                    .map(|(asset, amount)| (*asset, *amount))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of accounts with a book entry.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

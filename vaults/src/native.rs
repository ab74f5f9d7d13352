//! # Generation 1 -- Native Vault
//!
//! The first era of the protocol: custody of the native chain currency
//! and nothing else. One balance per account, capacity and the per-call
//! withdrawal ceiling denominated in native units, no valuation layer.
//!
//! Small as it is, this generation established the call discipline the
//! later ones inherit: validate, pull, mutate under the entry permit,
//! release the permit, then talk to the outside world.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use cairn_engine::asset::{native_asset_id, AccountId};
use cairn_engine::audit::{AuditEvent, AuditSink, CapacityUpdated, DepositMade, WithdrawalMade};
use cairn_engine::balance::UnitBook;
use cairn_engine::external::{AccessControl, AssetMover, PrivilegedAction};
use cairn_engine::ledger::LedgerState;

use crate::error::VaultError;
use crate::guard::EntryFlag;
use crate::receipt::{DepositReceipt, WithdrawalReceipt};

struct Books {
    balances: UnitBook,
    ledger: LedgerState,
}

/// The generation-1 vault: native currency custody with a global
/// capacity ceiling and a fixed per-call withdrawal ceiling.
pub struct NativeVault {
    books: Mutex<Books>,
    withdrawal_limit: u128,
    entry: EntryFlag,
    mover: Arc<dyn AssetMover>,
    access: Arc<dyn AccessControl>,
    audit: Arc<dyn AuditSink>,
}

impl NativeVault {
    /// Creates a vault with the given capacity and per-call withdrawal
    /// ceiling, both in native units.
    pub fn new(
        capacity: u128,
        withdrawal_limit: u128,
        mover: Arc<dyn AssetMover>,
        access: Arc<dyn AccessControl>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            books: Mutex::new(Books {
                balances: UnitBook::new(),
                ledger: LedgerState::new(capacity),
            }),
            withdrawal_limit,
            entry: EntryFlag::new(),
            mover,
            access,
            audit,
        }
    }

    // -----------------------------------------------------------------------
    // State-changing operations
    // -----------------------------------------------------------------------

    /// Deposits native currency for `caller`.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` on a zero amount, `ZeroAddress` for the zero
    /// account, `TransferFailed` if the mover rejects the pull,
    /// `CapacityExceeded` if the amount does not fit under the ceiling.
    pub fn deposit(&self, caller: AccountId, amount: u128) -> Result<DepositReceipt, VaultError> {
        if caller.is_zero() {
            return Err(VaultError::ZeroAddress);
        }
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }

        self.mover.pull(&caller, &native_asset_id(), amount)?;

        let new_balance = {
            let _permit = self.entry.enter()?;
            let mut books = self.books.lock();
            books.ledger.admit(amount)?;
            let new_balance = books.balances.credit(caller, amount)?;
            books.ledger.record_deposit(amount)?;
            new_balance
        };

        tracing::info!(account = %caller, amount, new_balance, "deposit credited");
        self.audit.record(AuditEvent::DepositMade(DepositMade {
            id: Uuid::new_v4(),
            at: Utc::now(),
            account: caller,
            asset: native_asset_id(),
            raw_amount: amount,
            normalized_amount: amount,
        }));

        Ok(DepositReceipt {
            asset: native_asset_id(),
            raw_amount: amount,
            normalized_amount: amount,
            new_balance,
            timestamp: Utc::now(),
        })
    }

    /// Withdraws native currency for `caller`.
    ///
    /// The debit is durably applied before the external release; if the
    /// release fails, a compensating rollback restores the books and the
    /// call fails `TransferFailed` with zero net state change.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `ZeroAddress`, `LimitExceeded`,
    /// `InsufficientBalance`, `TransferFailed`.
    pub fn withdraw(
        &self,
        caller: AccountId,
        amount: u128,
    ) -> Result<WithdrawalReceipt, VaultError> {
        if caller.is_zero() {
            return Err(VaultError::ZeroAddress);
        }
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        if amount > self.withdrawal_limit {
            return Err(VaultError::LimitExceeded {
                requested: amount,
                allowed: self.withdrawal_limit,
            });
        }

        let remaining_balance = {
            let _permit = self.entry.enter()?;
            let mut books = self.books.lock();
            let remaining = books.balances.debit(&caller, amount)?;
            books.ledger.record_withdrawal(amount);
            remaining
        };

        if let Err(cause) = self.mover.release(&caller, &native_asset_id(), amount) {
            let mut books = self.books.lock();
            books.balances.credit_saturating(caller, amount);
            books.ledger.rollback_withdrawal(amount);
            drop(books);
            tracing::warn!(account = %caller, amount, %cause, "release failed, withdrawal rolled back");
            return Err(VaultError::TransferFailed(cause));
        }

        tracing::info!(account = %caller, amount, remaining_balance, "withdrawal released");
        self.audit.record(AuditEvent::WithdrawalMade(WithdrawalMade {
            id: Uuid::new_v4(),
            at: Utc::now(),
            account: caller,
            asset: native_asset_id(),
            amount,
            remaining_balance,
        }));

        Ok(WithdrawalReceipt {
            amount,
            remaining_balance,
            timestamp: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Privileged configuration
    // -----------------------------------------------------------------------

    /// Replaces the capacity ceiling, in native units.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the access check rejects the caller.
    pub fn set_capacity(&self, caller: AccountId, capacity: u128) -> Result<(), VaultError> {
        self.access.ensure(&caller, PrivilegedAction::SetCapacity)?;

        let previous = {
            let _permit = self.entry.enter()?;
            self.books.lock().ledger.set_capacity(capacity)
        };

        tracing::info!(previous, capacity, "capacity updated");
        self.audit
            .record(AuditEvent::CapacityUpdated(CapacityUpdated {
                id: Uuid::new_v4(),
                at: Utc::now(),
                previous,
                capacity,
            }));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The caller's balance, in native units.
    pub fn get_balance(&self, account: &AccountId) -> u128 {
        self.books.lock().balances.balance_of(account)
    }

    /// The capacity ceiling, in native units.
    pub fn get_capacity(&self) -> u128 {
        self.books.lock().ledger.capacity()
    }

    /// The per-call withdrawal ceiling, in native units.
    pub fn get_withdrawal_limit(&self) -> u128 {
        self.withdrawal_limit
    }

    /// Number of completed deposits.
    pub fn get_total_deposits(&self) -> u64 {
        self.books.lock().ledger.deposit_count()
    }

    /// Number of completed withdrawals.
    pub fn get_total_withdrawals(&self) -> u64 {
        self.books.lock().ledger.withdrawal_count()
    }

    /// The running total of custodied value, in native units.
    pub fn get_current_total_balance(&self) -> u128 {
        self.books.lock().ledger.current_total()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_engine::audit::NullAuditSink;
    use cairn_engine::memory::{InMemoryMover, OpenAccess, SingleAdmin};

    const ONE: u128 = 1_000_000_000_000_000_000;

    fn alice() -> AccountId {
        AccountId::named("alice")
    }

    fn vault_with_mover(capacity: u128, limit: u128) -> (NativeVault, Arc<InMemoryMover>) {
        let mover = Arc::new(InMemoryMover::new());
        let vault = NativeVault::new(
            capacity,
            limit,
            mover.clone(),
            Arc::new(OpenAccess),
            Arc::new(NullAuditSink),
        );
        (vault, mover)
    }

    #[test]
    fn deposit_credits_and_counts() {
        let (vault, mover) = vault_with_mover(100 * ONE, ONE);
        mover.fund(alice(), native_asset_id(), 10 * ONE);

        let receipt = vault.deposit(alice(), 3 * ONE).unwrap();
        assert_eq!(receipt.new_balance, 3 * ONE);
        assert_eq!(vault.get_balance(&alice()), 3 * ONE);
        assert_eq!(vault.get_current_total_balance(), 3 * ONE);
        assert_eq!(vault.get_total_deposits(), 1);
        assert_eq!(mover.holding_of(&alice(), &native_asset_id()), 7 * ONE);
    }

    #[test]
    fn zero_deposit_rejected_without_state_change() {
        let (vault, _mover) = vault_with_mover(100 * ONE, ONE);
        assert!(matches!(
            vault.deposit(alice(), 0),
            Err(VaultError::InvalidAmount)
        ));
        assert_eq!(vault.get_total_deposits(), 0);
        assert_eq!(vault.get_current_total_balance(), 0);
    }

    #[test]
    fn zero_account_rejected() {
        let (vault, _mover) = vault_with_mover(100 * ONE, ONE);
        assert!(matches!(
            vault.deposit(AccountId::ZERO, ONE),
            Err(VaultError::ZeroAddress)
        ));
    }

    #[test]
    fn unfunded_deposit_is_transfer_failed() {
        let (vault, _mover) = vault_with_mover(100 * ONE, ONE);
        assert!(matches!(
            vault.deposit(alice(), ONE),
            Err(VaultError::TransferFailed(_))
        ));
        assert_eq!(vault.get_current_total_balance(), 0);
    }

    #[test]
    fn capacity_exceeded_reports_remaining() {
        let (vault, mover) = vault_with_mover(5 * ONE, 10 * ONE);
        mover.fund(alice(), native_asset_id(), 10 * ONE);

        vault.deposit(alice(), 4 * ONE).unwrap();
        let err = vault.deposit(alice(), 2 * ONE).unwrap_err();
        assert!(matches!(
            err,
            VaultError::CapacityExceeded { remaining } if remaining == ONE
        ));
        assert_eq!(vault.get_current_total_balance(), 4 * ONE);
    }

    #[test]
    fn withdraw_releases_exactly_the_amount() {
        let (vault, mover) = vault_with_mover(100 * ONE, ONE);
        mover.fund(alice(), native_asset_id(), 5 * ONE);
        vault.deposit(alice(), 5 * ONE).unwrap();

        let receipt = vault.withdraw(alice(), ONE).unwrap();
        assert_eq!(receipt.remaining_balance, 4 * ONE);
        assert_eq!(mover.holding_of(&alice(), &native_asset_id()), ONE);
        assert_eq!(vault.get_total_withdrawals(), 1);
    }

    #[test]
    fn withdraw_above_ceiling_rejected_despite_balance() {
        let (vault, mover) = vault_with_mover(100 * ONE, ONE);
        mover.fund(alice(), native_asset_id(), 5 * ONE);
        vault.deposit(alice(), 5 * ONE).unwrap();

        let err = vault.withdraw(alice(), 2 * ONE).unwrap_err();
        assert!(matches!(
            err,
            VaultError::LimitExceeded { requested, allowed }
                if requested == 2 * ONE && allowed == ONE
        ));
        assert_eq!(vault.get_balance(&alice()), 5 * ONE);
    }

    #[test]
    fn withdraw_beyond_balance_rejected() {
        let (vault, mover) = vault_with_mover(100 * ONE, 10 * ONE);
        mover.fund(alice(), native_asset_id(), ONE);
        vault.deposit(alice(), ONE).unwrap();

        let err = vault.withdraw(alice(), 2 * ONE).unwrap_err();
        assert!(matches!(
            err,
            VaultError::InsufficientBalance { available, requested }
                if available == ONE && requested == 2 * ONE
        ));
    }

    #[test]
    fn failed_release_rolls_back_everything() {
        let (vault, mover) = vault_with_mover(100 * ONE, 10 * ONE);
        mover.fund(alice(), native_asset_id(), 5 * ONE);
        vault.deposit(alice(), 5 * ONE).unwrap();

        mover.set_fail_releases(true);
        let err = vault.withdraw(alice(), ONE).unwrap_err();
        assert!(matches!(err, VaultError::TransferFailed(_)));

        assert_eq!(vault.get_balance(&alice()), 5 * ONE);
        assert_eq!(vault.get_current_total_balance(), 5 * ONE);
        assert_eq!(vault.get_total_withdrawals(), 0);
        assert_eq!(mover.holding_of(&alice(), &native_asset_id()), 0);
    }

    #[test]
    fn set_capacity_requires_privilege() {
        let admin = AccountId::named("admin");
        let mover = Arc::new(InMemoryMover::new());
        let vault = NativeVault::new(
            ONE,
            ONE,
            mover,
            Arc::new(SingleAdmin::new(admin)),
            Arc::new(NullAuditSink),
        );

        assert!(matches!(
            vault.set_capacity(alice(), 2 * ONE),
            Err(VaultError::Unauthorized(_))
        ));
        assert_eq!(vault.get_capacity(), ONE);

        vault.set_capacity(admin, 2 * ONE).unwrap();
        assert_eq!(vault.get_capacity(), 2 * ONE);
    }
}

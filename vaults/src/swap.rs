//! # Generation 3 -- Swap Vault
//!
//! The single-normalized-unit era. Every deposit is converted at entry
//! into the canonical stable asset by actually executing a swap on an
//! external exchange, so the vault keeps exactly one balance per account
//! and the normalized unit IS the canonical asset. The only asset that
//! skips the exchange is the canonical asset itself.
//!
//! Withdrawals release the canonical asset, ceiling and capacity both in
//! canonical units. No price feed anywhere in this generation: the
//! exchange's execution is the valuation.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use cairn_engine::asset::{
    native_asset_id, native_asset_info, AccountId, AssetId, AssetInfo, AssetRegistry,
};
use cairn_engine::audit::{
    AssetAdded, AuditEvent, AuditSink, CapacityUpdated, DepositMade, WithdrawalMade,
};
use cairn_engine::balance::UnitBook;
use cairn_engine::external::{AccessControl, AssetMover, PrivilegedAction};
use cairn_engine::ledger::LedgerState;
use cairn_engine::valuation::{SwapValuation, ValuationProvider};

use crate::error::VaultError;
use crate::guard::EntryFlag;
use crate::receipt::{DepositReceipt, WithdrawalReceipt};

struct Books {
    balances: UnitBook,
    ledger: LedgerState,
}

/// The generation-3 vault: swap-converted custody in the canonical
/// asset.
pub struct SwapVault {
    registry: RwLock<AssetRegistry>,
    valuation: SwapValuation,
    books: Mutex<Books>,
    withdrawal_limit: u128,
    entry: EntryFlag,
    mover: Arc<dyn AssetMover>,
    access: Arc<dyn AccessControl>,
    audit: Arc<dyn AuditSink>,
}

impl SwapVault {
    /// Creates a vault with `capacity` and `withdrawal_limit` in
    /// canonical units, converting through `valuation`.
    ///
    /// The native asset and the canonical asset are registered here;
    /// further assets arrive through
    /// [`add_supported_asset`](Self::add_supported_asset).
    ///
    /// # Errors
    ///
    /// `ZeroAddress` if the valuation's canonical or intermediate asset
    /// is the reserved zero id.
    pub fn new(
        capacity: u128,
        withdrawal_limit: u128,
        valuation: SwapValuation,
        canonical_info: AssetInfo,
        mover: Arc<dyn AssetMover>,
        access: Arc<dyn AccessControl>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, VaultError> {
        if valuation.canonical().is_zero() || valuation.intermediate().is_zero() {
            return Err(VaultError::ZeroAddress);
        }

        let mut registry = AssetRegistry::new();
        registry.add(native_asset_id(), native_asset_info());
        registry.add(valuation.canonical(), canonical_info);

        Ok(Self {
            registry: RwLock::new(registry),
            valuation,
            books: Mutex::new(Books {
                balances: UnitBook::new(),
                ledger: LedgerState::new(capacity),
            }),
            withdrawal_limit,
            entry: EntryFlag::new(),
            mover,
            access,
            audit,
        })
    }

    // -----------------------------------------------------------------------
    // State-changing operations
    // -----------------------------------------------------------------------

    /// Deposits native currency for `caller`, converting it into the
    /// canonical asset on the exchange.
    pub fn deposit(&self, caller: AccountId, amount: u128) -> Result<DepositReceipt, VaultError> {
        self.deposit_asset(caller, native_asset_id(), amount)
    }

    /// Deposits `amount` raw units of `asset` for `caller`.
    ///
    /// Canonical-asset deposits credit 1:1 with no exchange interaction.
    /// Anything else is pulled into custody, granted to the exchange
    /// where the token path requires an allowance, and swapped along the
    /// fixed conversion path; the actual execution output is what gets
    /// credited and admitted against capacity.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `ZeroAddress`, `UnsupportedAsset`,
    /// `TransferFailed`, `Valuation` (`SwapFailed`, `DeadlineExpired`),
    /// `CapacityExceeded`.
    pub fn deposit_asset(
        &self,
        caller: AccountId,
        asset: AssetId,
        amount: u128,
    ) -> Result<DepositReceipt, VaultError> {
        if caller.is_zero() {
            return Err(VaultError::ZeroAddress);
        }
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        if !self.registry.read().is_supported(&asset) {
            return Err(VaultError::UnsupportedAsset(asset));
        }

        self.mover.pull(&caller, &asset, amount)?;
        if self.valuation.needs_allowance(&asset) {
            self.mover.grant_allowance(&asset, amount)?;
        }

        let normalized = self.valuation.convert(&asset, amount)?;
        if normalized == 0 {
            return Err(VaultError::InvalidAmount);
        }

        let new_balance = {
            let _permit = self.entry.enter()?;
            let mut books = self.books.lock();
            books.ledger.admit(normalized)?;
            let new_balance = books.balances.credit(caller, normalized)?;
            books.ledger.record_deposit(normalized)?;
            new_balance
        };

        tracing::info!(
            account = %caller,
            asset = %asset,
            amount,
            normalized,
            "deposit credited"
        );
        self.audit.record(AuditEvent::DepositMade(DepositMade {
            id: Uuid::new_v4(),
            at: Utc::now(),
            account: caller,
            asset,
            raw_amount: amount,
            normalized_amount: normalized,
        }));

        Ok(DepositReceipt {
            asset,
            raw_amount: amount,
            normalized_amount: normalized,
            new_balance,
            timestamp: Utc::now(),
        })
    }

    /// Withdraws canonical-asset units for `caller`.
    ///
    /// Debit-before-release, with a compensating rollback if the release
    /// fails.
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

        let canonical = self.valuation.canonical();
        let remaining_balance = {
            let _permit = self.entry.enter()?;
            let mut books = self.books.lock();
            let remaining = books.balances.debit(&caller, amount)?;
            books.ledger.record_withdrawal(amount);
            remaining
        };

        if let Err(cause) = self.mover.release(&caller, &canonical, amount) {
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
            asset: canonical,
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

    /// Replaces the capacity ceiling, in canonical units.
    ///
    /// # Errors
    ///
    /// `Unauthorized`.
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

    /// Registers a swappable asset, or overwrites its metadata if
    /// already registered. There is no removal path.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `ZeroAddress`.
    pub fn add_supported_asset(
        &self,
        caller: AccountId,
        asset: AssetId,
        symbol: &str,
        decimals: u8,
    ) -> Result<(), VaultError> {
        self.access.ensure(&caller, PrivilegedAction::AddAsset)?;
        if asset.is_zero() {
            return Err(VaultError::ZeroAddress);
        }

        self.registry.write().add(
            asset,
            AssetInfo {
                symbol: symbol.to_string(),
                decimals,
            },
        );

        tracing::info!(asset = %asset, symbol, decimals, "asset registered");
        self.audit.record(AuditEvent::AssetAdded(AssetAdded {
            id: Uuid::new_v4(),
            at: Utc::now(),
            asset,
            symbol: symbol.to_string(),
            decimals,
        }));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The caller's balance, in canonical units.
    pub fn get_balance(&self, account: &AccountId) -> u128 {
        self.books.lock().balances.balance_of(account)
    }

    /// The capacity ceiling, in canonical units.
    pub fn get_capacity(&self) -> u128 {
        self.books.lock().ledger.capacity()
    }

    /// The capacity ceiling in the normalized unit. The normalized unit
    /// is the canonical asset, so this equals
    /// [`get_capacity`](Self::get_capacity).
    pub fn get_capacity_in_normalized_value(&self) -> u128 {
        self.get_capacity()
    }

    /// The per-call withdrawal ceiling, in canonical units.
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

    /// The running total of custodied value, in canonical units.
    pub fn get_current_total_balance(&self) -> u128 {
        self.books.lock().ledger.current_total()
    }

    /// The canonical asset all deposits resolve into.
    pub fn canonical_asset(&self) -> AssetId {
        self.valuation.canonical()
    }

    /// All registered assets and their metadata.
    pub fn supported_assets(&self) -> Vec<(AssetId, AssetInfo)> {
        self.registry
            .read()
            .iter()
            .map(|(id, info)| (*id, info.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

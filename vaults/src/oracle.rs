//! # Generation 2 -- Oracle Vault
//!
//! The two-level-balance era. The vault custodies the native currency
//! alongside privileged-registered normalized-denominated assets, keeping
//! every balance in raw asset units keyed by `(account, asset)`. The
//! capacity ledger, however, is kept in the normalized unit: native
//! deposits are valued through a staleness-checked price sample,
//! registered assets through decimal scaling alone.
//!
//! Withdrawals release the native currency, with the per-call ceiling in
//! native units; the normalized running total is debited at the current
//! price. A stale or compromised feed therefore fails deposits and
//! withdrawals alike -- refusing to move value at an unknown price is
//! the conservative failure mode.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use cairn_engine::asset::{
    native_asset_id, native_asset_info, AccountId, AssetId, AssetInfo, AssetRegistry,
};
use cairn_engine::audit::{
    AssetAdded, AuditEvent, AuditSink, CapacityUpdated, DepositMade, FeedUpdated, WithdrawalMade,
};
use cairn_engine::balance::AssetBook;
use cairn_engine::external::{AccessControl, AssetMover, PriceFeed, PriceSample, PrivilegedAction};
use cairn_engine::ledger::LedgerState;
use cairn_engine::valuation::{OracleValuation, ValuationProvider};

use crate::error::VaultError;
use crate::guard::EntryFlag;
use crate::receipt::{DepositReceipt, WithdrawalReceipt};

struct Books {
    balances: AssetBook,
    ledger: LedgerState,
}

/// The generation-2 vault: raw multi-asset balances under a
/// normalized-unit capacity ceiling, priced by an external feed.
pub struct OracleVault {
    registry: RwLock<AssetRegistry>,
    valuation: RwLock<OracleValuation>,
    books: Mutex<Books>,
    withdrawal_limit: u128,
    entry: EntryFlag,
    mover: Arc<dyn AssetMover>,
    access: Arc<dyn AccessControl>,
    audit: Arc<dyn AuditSink>,
}

impl OracleVault {
    /// Creates a vault with `capacity` in normalized units and
    /// `withdrawal_limit` in native units, priced by `feed`.
    ///
    /// The native asset's registry entry is seeded here; everything else
    /// arrives through [`add_supported_asset`](Self::add_supported_asset).
    pub fn new(
        capacity: u128,
        withdrawal_limit: u128,
        feed: Arc<dyn PriceFeed>,
        mover: Arc<dyn AssetMover>,
        access: Arc<dyn AccessControl>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let mut registry = AssetRegistry::new();
        registry.add(native_asset_id(), native_asset_info());

        Self {
            registry: RwLock::new(registry),
            valuation: RwLock::new(OracleValuation::new(feed)),
            books: Mutex::new(Books {
                balances: AssetBook::new(),
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
    pub fn deposit(&self, caller: AccountId, amount: u128) -> Result<DepositReceipt, VaultError> {
        self.deposit_asset(caller, native_asset_id(), amount)
    }

    /// Deposits `amount` raw units of `asset` for `caller`.
    ///
    /// The amount is pulled into custody, valued into the normalized
    /// unit, and admitted against the capacity ceiling before the
    /// caller's raw-unit position is credited.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` on a zero amount or an amount whose normalized
    /// value floors to zero, `ZeroAddress`, `UnsupportedAsset`,
    /// `TransferFailed`, `Valuation` (compromised or stale sample),
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

        // Valuation reads the external feed; snapshot the strategy so no
        // vault lock is held across the collaborator call.
        let valuation = self.valuation.read().clone();
        let normalized = valuation.convert(&asset, amount)?;
        if normalized == 0 {
            return Err(VaultError::InvalidAmount);
        }

        let new_balance = {
            let _permit = self.entry.enter()?;
            let mut books = self.books.lock();
            books.ledger.admit(normalized)?;
            let new_balance = books.balances.credit(caller, asset, amount)?;
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

    /// Withdraws native currency for `caller`, `amount` in native units.
    ///
    /// The debit and the normalized total decrement are durably applied
    /// before the external release; a failed release is compensated and
    /// the call fails `TransferFailed` with zero net state change.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `ZeroAddress`, `LimitExceeded`,
    /// `InsufficientBalance`, `Valuation`, `TransferFailed`.
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

        // Value the debit at the current price, before any mutation.
        let valuation = self.valuation.read().clone();
        let normalized = valuation.convert_native(amount)?;

        let native = native_asset_id();
        let remaining_balance = {
            let _permit = self.entry.enter()?;
            let mut books = self.books.lock();
            let remaining = books.balances.debit(&caller, &native, amount)?;
            books.ledger.record_withdrawal(normalized);
            remaining
        };

        if let Err(cause) = self.mover.release(&caller, &native, amount) {
            let mut books = self.books.lock();
            books.balances.credit_saturating(caller, native, amount);
            books.ledger.rollback_withdrawal(normalized);
            drop(books);
            tracing::warn!(account = %caller, amount, %cause, "release failed, withdrawal rolled back");
            return Err(VaultError::TransferFailed(cause));
        }

        tracing::info!(account = %caller, amount, remaining_balance, "withdrawal released");
        self.audit.record(AuditEvent::WithdrawalMade(WithdrawalMade {
            id: Uuid::new_v4(),
            at: Utc::now(),
            account: caller,
            asset: native,
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

    /// Replaces the capacity ceiling, taking the new ceiling in native
    /// units and storing its normalized value at the current price.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `Valuation` (the conversion needs a usable
    /// sample).
    pub fn set_capacity(&self, caller: AccountId, native_amount: u128) -> Result<(), VaultError> {
        self.access.ensure(&caller, PrivilegedAction::SetCapacity)?;

        let valuation = self.valuation.read().clone();
        let normalized = valuation.convert_native(native_amount)?;
        self.replace_capacity(normalized)
    }

    /// Replaces the capacity ceiling directly in normalized units, no
    /// feed interaction.
    ///
    /// # Errors
    ///
    /// `Unauthorized`.
    pub fn set_capacity_in_normalized_value(
        &self,
        caller: AccountId,
        normalized: u128,
    ) -> Result<(), VaultError> {
        self.access.ensure(&caller, PrivilegedAction::SetCapacity)?;
        self.replace_capacity(normalized)
    }

    fn replace_capacity(&self, capacity: u128) -> Result<(), VaultError> {
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

    /// Replaces the price feed reference.
    ///
    /// # Errors
    ///
    /// `Unauthorized`.
    pub fn set_price_feed(
        &self,
        caller: AccountId,
        feed: Arc<dyn PriceFeed>,
    ) -> Result<(), VaultError> {
        self.access
            .ensure(&caller, PrivilegedAction::SetPriceFeed)?;

        let description = feed.description();
        self.valuation.write().set_feed(feed);

        tracing::info!(feed = %description, "price feed updated");
        self.audit.record(AuditEvent::FeedUpdated(FeedUpdated {
            id: Uuid::new_v4(),
            at: Utc::now(),
            feed: description,
        }));
        Ok(())
    }

    /// Registers a normalized-denominated asset, or overwrites its
    /// metadata if already registered. There is no removal path.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `ZeroAddress` for the reserved zero id.
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
        self.valuation
            .write()
            .register_denomination(asset, decimals);

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

    /// The caller's native-currency balance, in native units.
    pub fn get_balance(&self, account: &AccountId) -> u128 {
        self.books
            .lock()
            .balances
            .balance_of(account, &native_asset_id())
    }

    /// The caller's balance in a specific asset, in raw units.
    pub fn get_balance_asset(&self, account: &AccountId, asset: &AssetId) -> u128 {
        self.books.lock().balances.balance_of(account, asset)
    }

    /// The caller's total holdings valued in the normalized unit at the
    /// current price.
    ///
    /// # Errors
    ///
    /// `Valuation` if the sample is unusable, `Overflow` if the sum
    /// overflows.
    pub fn get_balance_in_normalized_value(
        &self,
        account: &AccountId,
    ) -> Result<u128, VaultError> {
        let holdings = self.books.lock().balances.holdings_of(account);
        let valuation = self.valuation.read().clone();

        let mut total: u128 = 0;
        for (asset, amount) in holdings {
            let normalized = valuation.convert(&asset, amount)?;
            total = total.checked_add(normalized).ok_or(VaultError::Overflow)?;
        }
        Ok(total)
    }

    /// The most recent price sample, unvalidated.
    pub fn get_price(&self) -> PriceSample {
        self.valuation.read().latest_sample()
    }

    /// The capacity ceiling, in normalized units.
    pub fn get_capacity_in_normalized_value(&self) -> u128 {
        self.books.lock().ledger.capacity()
    }

    /// The capacity ceiling converted to native units at the current
    /// price.
    ///
    /// # Errors
    ///
    /// `Valuation` if the sample is unusable.
    pub fn get_capacity(&self) -> Result<u128, VaultError> {
        let capacity = self.books.lock().ledger.capacity();
        let valuation = self.valuation.read().clone();
        valuation.to_native(capacity).map_err(Into::into)
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

    /// The running total of custodied value, in normalized units.
    pub fn get_current_total_balance(&self) -> u128 {
        self.books.lock().ledger.current_total()
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

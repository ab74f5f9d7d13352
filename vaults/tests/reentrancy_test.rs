//! Adversarial re-entrancy: collaborators that re-invoke the vault while
//! their own call is still on the stack.
//!
//! The property under test is the checks-effects-interactions ordering:
//! by the time the mover's `release` runs, the withdrawal's debit is
//! durable, so a re-entrant withdrawal for the same caller observes the
//! already-decremented balance and fails `InsufficientBalance`. It must
//! never succeed twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use cairn_engine::asset::{AccountId, AssetId, AssetInfo};
use cairn_engine::audit::NullAuditSink;
use cairn_engine::external::{AssetMover, TransferError};
use cairn_engine::memory::{FixedRateRouter, InMemoryMover, OpenAccess};
use cairn_engine::valuation::SwapValuation;
use cairn_vaults::{NativeVault, SwapVault, VaultError};

const ONE: u128 = 1_000_000_000_000_000_000;
const ONE_CANONICAL: u128 = 1_000_000;

fn alice() -> AccountId {
    AccountId::named("alice")
}

/// A mover whose `release` re-invokes `withdraw` on the vault once,
/// recording what the nested call observed, before completing the
/// original release.
#[derive(Default)]
struct ReentrantNativeMover {
    inner: InMemoryMover,
    vault: Mutex<Option<Arc<NativeVault>>>,
    armed: AtomicBool,
    reentry_amount: Mutex<u128>,
    observed: Mutex<Option<Result<u128, VaultError>>>,
}

impl ReentrantNativeMover {
    fn arm(&self, vault: Arc<NativeVault>, amount: u128) {
        *self.vault.lock() = Some(vault);
        *self.reentry_amount.lock() = amount;
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl AssetMover for ReentrantNativeMover {
    fn pull(&self, from: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        self.inner.pull(from, asset, amount)
    }

    fn release(&self, to: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            let vault = self.vault.lock().clone().expect("armed without a vault");
            let nested = vault.withdraw(*to, *self.reentry_amount.lock());
            *self.observed.lock() = Some(nested.map(|receipt| receipt.remaining_balance));
        }
        self.inner.release(to, asset, amount)
    }

    fn grant_allowance(&self, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        self.inner.grant_allowance(asset, amount)
    }
}

#[test]
fn reentrant_native_withdrawal_sees_the_debited_balance() {
    let mover = Arc::new(ReentrantNativeMover::default());
    let vault = Arc::new(NativeVault::new(
        100 * ONE,
        ONE,
        mover.clone(),
        Arc::new(OpenAccess),
        Arc::new(NullAuditSink),
    ));

    mover.inner.fund(alice(), cairn_engine::asset::native_asset_id(), ONE);
    vault.deposit(alice(), ONE).unwrap();

    // The release step will try to withdraw the same amount again.
    mover.arm(vault.clone(), ONE);
    let receipt = vault.withdraw(alice(), ONE).unwrap();
    assert_eq!(receipt.remaining_balance, 0);

    // The nested call ran, observed the already-decremented balance, and
    // was refused -- it never succeeded twice.
    let observed = mover.observed.lock().take().expect("nested call ran");
    match observed {
        Err(VaultError::InsufficientBalance {
            available,
            requested,
        }) => {
            assert_eq!(available, 0);
            assert_eq!(requested, ONE);
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }

    // Exactly one release reached the outside world.
    assert_eq!(
        mover
            .inner
            .holding_of(&alice(), &cairn_engine::asset::native_asset_id()),
        ONE
    );
    assert_eq!(vault.get_total_withdrawals(), 1);
    assert_eq!(vault.get_current_total_balance(), 0);
}

/// Same shape for the swap generation: the nested withdrawal runs against
/// canonical-unit balances.
#[derive(Default)]
struct ReentrantSwapMover {
    inner: InMemoryMover,
    vault: Mutex<Option<Arc<SwapVault>>>,
    armed: AtomicBool,
    reentry_amount: Mutex<u128>,
    observed: Mutex<Option<Result<u128, VaultError>>>,
}

impl ReentrantSwapMover {
    fn arm(&self, vault: Arc<SwapVault>, amount: u128) {
        *self.vault.lock() = Some(vault);
        *self.reentry_amount.lock() = amount;
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl AssetMover for ReentrantSwapMover {
    fn pull(&self, from: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        self.inner.pull(from, asset, amount)
    }

    fn release(&self, to: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            let vault = self.vault.lock().clone().expect("armed without a vault");
            let nested = vault.withdraw(*to, *self.reentry_amount.lock());
            *self.observed.lock() = Some(nested.map(|receipt| receipt.remaining_balance));
        }
        self.inner.release(to, asset, amount)
    }

    fn grant_allowance(&self, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        self.inner.grant_allowance(asset, amount)
    }
}

#[test]
fn reentrant_swap_withdrawal_sees_the_debited_balance() {
    let usdc = AssetId::derive("USDC", "cairn:test");
    let wnat = AssetId::derive("WNAT", "cairn:test");

    let mover = Arc::new(ReentrantSwapMover::default());
    let router = Arc::new(FixedRateRouter::new());
    let valuation = SwapValuation::new(router, wnat, usdc);
    let vault = Arc::new(
        SwapVault::new(
            100_000 * ONE_CANONICAL,
            1000 * ONE_CANONICAL,
            valuation,
            AssetInfo {
                symbol: "USDC".into(),
                decimals: 6,
            },
            mover.clone(),
            Arc::new(OpenAccess),
            Arc::new(NullAuditSink),
        )
        .unwrap(),
    );

    mover.inner.fund(alice(), usdc, 600 * ONE_CANONICAL);
    vault
        .deposit_asset(alice(), usdc, 600 * ONE_CANONICAL)
        .unwrap();

    // Withdrawing 400 leaves 200; the nested attempt for another 400
    // must find only 200 available.
    mover.arm(vault.clone(), 400 * ONE_CANONICAL);
    vault.withdraw(alice(), 400 * ONE_CANONICAL).unwrap();

    let observed = mover.observed.lock().take().expect("nested call ran");
    match observed {
        Err(VaultError::InsufficientBalance {
            available,
            requested,
        }) => {
            assert_eq!(available, 200 * ONE_CANONICAL);
            assert_eq!(requested, 400 * ONE_CANONICAL);
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }

    assert_eq!(vault.get_balance(&alice()), 200 * ONE_CANONICAL);
    assert_eq!(mover.inner.holding_of(&alice(), &usdc), 400 * ONE_CANONICAL);
    assert_eq!(vault.get_total_withdrawals(), 1);
}

/// Reads are always safe to re-enter: a balance read during the release
/// window reports the already-debited amount.
#[derive(Default)]
struct ReadingMover {
    inner: InMemoryMover,
    vault: Mutex<Option<Arc<NativeVault>>>,
    observed_balance: Mutex<Option<u128>>,
}

impl AssetMover for ReadingMover {
    fn pull(&self, from: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        self.inner.pull(from, asset, amount)
    }

    fn release(&self, to: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        if let Some(vault) = self.vault.lock().clone() {
            *self.observed_balance.lock() = Some(vault.get_balance(to));
        }
        self.inner.release(to, asset, amount)
    }

    fn grant_allowance(&self, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        self.inner.grant_allowance(asset, amount)
    }
}

#[test]
fn reentrant_read_observes_settled_state() {
    let mover = Arc::new(ReadingMover::default());
    let vault = Arc::new(NativeVault::new(
        100 * ONE,
        ONE,
        mover.clone(),
        Arc::new(OpenAccess),
        Arc::new(NullAuditSink),
    ));

    mover.inner.fund(alice(), cairn_engine::asset::native_asset_id(), 3 * ONE);
    vault.deposit(alice(), 3 * ONE).unwrap();

    *mover.vault.lock() = Some(vault.clone());
    vault.withdraw(alice(), ONE).unwrap();

    // The read inside the release window saw the post-debit balance.
    assert_eq!(*mover.observed_balance.lock(), Some(2 * ONE));
}

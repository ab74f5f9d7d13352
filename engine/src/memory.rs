//! # In-Memory Collaborators
//!
//! Concrete implementations of the collaborator seams backed by plain
//! maps and locks. The test suites and the demo binary assemble vaults
//! from these; nothing here is production custody.
//!
//! The doubles are deliberately well-behaved by default and misbehave
//! only when told to (`set_fail_releases`, `set_zero_output`), so a test
//! reads as: arrange the fault, observe the typed failure.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::asset::{AccountId, AssetId};
use crate::audit::{AuditEvent, AuditSink};
use crate::config::BPS_SCALE;
use crate::external::{
    AccessControl, AccessError, AssetMover, PriceFeed, PriceSample, PrivilegedAction,
    SwapCallError, SwapRouter, TransferError,
};

// ---------------------------------------------------------------------------
// InMemoryMover
// ---------------------------------------------------------------------------

/// An asset mover over an in-memory holdings map.
///
/// `pull` debits the payer's external holding, `release` credits the
/// recipient's. Granted allowances are recorded for assertions. Flip
/// `set_fail_releases` to simulate a transfer outage and exercise the
/// rollback path.
#[derive(Default)]
pub struct InMemoryMover {
    holdings: Mutex<HashMap<(AccountId, AssetId), u128>>,
    allowances: Mutex<HashMap<AssetId, u128>>,
    fail_releases: AtomicBool,
}

impl InMemoryMover {
    /// Creates a mover with empty holdings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an external holding.
    pub fn fund(&self, account: AccountId, asset: AssetId, amount: u128) {
        *self.holdings.lock().entry((account, asset)).or_insert(0) += amount;
    }

    /// Returns an account's external holding of an asset.
    pub fn holding_of(&self, account: &AccountId, asset: &AssetId) -> u128 {
        self.holdings
            .lock()
            .get(&(*account, *asset))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the cumulative allowance granted over an asset.
    pub fn allowance_of(&self, asset: &AssetId) -> u128 {
        self.allowances.lock().get(asset).copied().unwrap_or(0)
    }

    /// Makes every subsequent `release` fail, until cleared.
    pub fn set_fail_releases(&self, fail: bool) {
        self.fail_releases.store(fail, Ordering::SeqCst);
    }
}

impl AssetMover for InMemoryMover {
    fn pull(&self, from: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        let mut holdings = self.holdings.lock();
        let held = holdings.entry((*from, *asset)).or_insert(0);
        if *held < amount {
            return Err(TransferError::Rejected {
                reason: format!("holding {held} is below the requested {amount}"),
            });
        }
        *held -= amount;
        Ok(())
    }

    fn release(&self, to: &AccountId, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        if self.fail_releases.load(Ordering::SeqCst) {
            return Err(TransferError::Rejected {
                reason: "simulated transfer outage".to_string(),
            });
        }
        *self.holdings.lock().entry((*to, *asset)).or_insert(0) += amount;
        Ok(())
    }

    fn grant_allowance(&self, asset: &AssetId, amount: u128) -> Result<(), TransferError> {
        *self.allowances.lock().entry(*asset).or_insert(0) += amount;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StaticPriceFeed
// ---------------------------------------------------------------------------

/// A price feed whose sample is set by the test or demo harness.
pub struct StaticPriceFeed {
    sample: Mutex<PriceSample>,
    name: String,
}

impl StaticPriceFeed {
    /// Creates a feed with a fresh sample at the given value.
    pub fn new(name: &str, value: i128) -> Self {
        Self {
            sample: Mutex::new(PriceSample {
                value,
                updated_at: Utc::now(),
            }),
            name: name.to_string(),
        }
    }

    /// Replaces the sample wholesale.
    pub fn set_sample(&self, sample: PriceSample) {
        *self.sample.lock() = sample;
    }

    /// Replaces the value, refreshing the timestamp.
    pub fn set_value(&self, value: i128) {
        *self.sample.lock() = PriceSample {
            value,
            updated_at: Utc::now(),
        };
    }
}

impl PriceFeed for StaticPriceFeed {
    fn latest_sample(&self) -> PriceSample {
        *self.sample.lock()
    }

    fn description(&self) -> String {
        self.name.clone()
    }
}

// ---------------------------------------------------------------------------
// FixedRateRouter
// ---------------------------------------------------------------------------

/// A swap router that fills at a fixed per-asset rate.
///
/// The rate is keyed by the first node of the path and expressed as
/// output units per input unit as a fraction. Call counters and the
/// honored-minimum check make the quote/execute contract observable.
#[derive(Default)]
pub struct FixedRateRouter {
    rates: Mutex<HashMap<AssetId, (u128, u128)>>,
    quote_calls: AtomicU64,
    swap_calls: AtomicU64,
    execution_shortfall_bps: Mutex<u128>,
    zero_output: AtomicBool,
}

impl FixedRateRouter {
    /// Creates a router with no pairs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fill rate for paths entering at `asset`:
    /// `out = in * numerator / denominator`.
    pub fn set_rate(&self, asset: AssetId, numerator: u128, denominator: u128) {
        self.rates.lock().insert(asset, (numerator, denominator));
    }

    /// Makes executions fill the given bps short of the quote.
    pub fn set_execution_shortfall_bps(&self, bps: u128) {
        *self.execution_shortfall_bps.lock() = bps;
    }

    /// Makes executions nominally succeed with zero output.
    pub fn set_zero_output(&self, zero: bool) {
        self.zero_output.store(zero, Ordering::SeqCst);
    }

    /// Number of quotes served.
    pub fn quote_count(&self) -> u64 {
        self.quote_calls.load(Ordering::SeqCst)
    }

    /// Number of executions served.
    pub fn swap_count(&self) -> u64 {
        self.swap_calls.load(Ordering::SeqCst)
    }

    fn rate_out(&self, amount_in: u128, path: &[AssetId]) -> Result<u128, SwapCallError> {
        let entry = path.first().ok_or(SwapCallError::Rejected {
            reason: "empty path".to_string(),
        })?;
        let (numerator, denominator) =
            self.rates
                .lock()
                .get(entry)
                .copied()
                .ok_or(SwapCallError::Rejected {
                    reason: format!("no pair for path entry {entry}"),
                })?;
        amount_in
            .checked_mul(numerator)
            .map(|product| product / denominator)
            .ok_or(SwapCallError::Rejected {
                reason: "rate overflow".to_string(),
            })
    }
}

impl SwapRouter for FixedRateRouter {
    fn quote(&self, amount_in: u128, path: &[AssetId]) -> Result<u128, SwapCallError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.rate_out(amount_in, path)
    }

    fn swap_exact_in(
        &self,
        amount_in: u128,
        minimum_out: u128,
        path: &[AssetId],
        deadline: DateTime<Utc>,
    ) -> Result<u128, SwapCallError> {
        self.swap_calls.fetch_add(1, Ordering::SeqCst);
        if Utc::now() > deadline {
            return Err(SwapCallError::DeadlineExpired);
        }
        if self.zero_output.load(Ordering::SeqCst) {
            return Ok(0);
        }

        let quoted = self.rate_out(amount_in, path)?;
        let shortfall = *self.execution_shortfall_bps.lock();
        let filled = quoted * (BPS_SCALE - shortfall.min(BPS_SCALE)) / BPS_SCALE;
        if filled < minimum_out {
            return Err(SwapCallError::Rejected {
                reason: format!("output {filled} is below the minimum {minimum_out}"),
            });
        }
        Ok(filled)
    }
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

/// Access control that authorizes everyone. For tests of behavior that
/// is not about privilege.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAccess;

impl AccessControl for OpenAccess {
    fn ensure(&self, _caller: &AccountId, _action: PrivilegedAction) -> Result<(), AccessError> {
        Ok(())
    }
}

/// Access control with exactly one authorized account.
#[derive(Debug, Clone, Copy)]
pub struct SingleAdmin {
    admin: AccountId,
}

impl SingleAdmin {
    /// Creates an access check recognizing only `admin`.
    pub fn new(admin: AccountId) -> Self {
        Self { admin }
    }
}

impl AccessControl for SingleAdmin {
    fn ensure(&self, caller: &AccountId, action: PrivilegedAction) -> Result<(), AccessError> {
        if *caller == self.admin {
            Ok(())
        } else {
            Err(AccessError::Denied {
                caller: *caller,
                action,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryAuditSink
// ---------------------------------------------------------------------------

/// An audit sink that retains every record for assertions.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded events, in emission order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Returns how many events of the given kind were recorded.
    pub fn count_of(&self, kind: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::native_asset_id;

    fn alice() -> AccountId {
        AccountId::named("alice")
    }

    #[test]
    fn mover_pull_requires_funding() {
        let mover = InMemoryMover::new();
        let result = mover.pull(&alice(), &native_asset_id(), 100);
        assert!(matches!(result, Err(TransferError::Rejected { .. })));

        mover.fund(alice(), native_asset_id(), 100);
        mover.pull(&alice(), &native_asset_id(), 100).unwrap();
        assert_eq!(mover.holding_of(&alice(), &native_asset_id()), 0);
    }

    #[test]
    fn mover_release_credits_recipient() {
        let mover = InMemoryMover::new();
        mover.release(&alice(), &native_asset_id(), 250).unwrap();
        assert_eq!(mover.holding_of(&alice(), &native_asset_id()), 250);
    }

    #[test]
    fn mover_release_outage_is_rejected() {
        let mover = InMemoryMover::new();
        mover.set_fail_releases(true);
        assert!(mover.release(&alice(), &native_asset_id(), 1).is_err());

        mover.set_fail_releases(false);
        assert!(mover.release(&alice(), &native_asset_id(), 1).is_ok());
    }

    #[test]
    fn router_honors_minimum_out() {
        let usdc = AssetId::derive("USDC", "cairn:test");
        let dai = AssetId::derive("DAI", "cairn:test");
        let router = FixedRateRouter::new();
        router.set_rate(dai, 1, 1);
        router.set_execution_shortfall_bps(200); // fills 2% short

        let path = [dai, usdc];
        let quoted = router.quote(10_000, &path).unwrap();
        assert_eq!(quoted, 10_000);

        // A 1%-under minimum is missed by a 2% shortfall.
        let deadline = Utc::now() + chrono::Duration::seconds(15);
        let result = router.swap_exact_in(10_000, 9_900, &path, deadline);
        assert!(matches!(result, Err(SwapCallError::Rejected { .. })));
    }

    #[test]
    fn router_counts_calls() {
        let dai = AssetId::derive("DAI", "cairn:test");
        let router = FixedRateRouter::new();
        router.set_rate(dai, 1, 1);

        let deadline = Utc::now() + chrono::Duration::seconds(15);
        router.quote(100, &[dai]).unwrap();
        router.swap_exact_in(100, 0, &[dai], deadline).unwrap();
        assert_eq!(router.quote_count(), 1);
        assert_eq!(router.swap_count(), 1);
    }

    #[test]
    fn router_rejects_past_deadlines() {
        let dai = AssetId::derive("DAI", "cairn:test");
        let router = FixedRateRouter::new();
        router.set_rate(dai, 1, 1);

        let expired = Utc::now() - chrono::Duration::seconds(1);
        let result = router.swap_exact_in(100, 0, &[dai], expired);
        assert!(matches!(result, Err(SwapCallError::DeadlineExpired)));
    }

    #[test]
    fn single_admin_rejects_others() {
        let access = SingleAdmin::new(alice());
        assert!(access
            .ensure(&alice(), PrivilegedAction::SetCapacity)
            .is_ok());
        assert!(access
            .ensure(&AccountId::named("mallory"), PrivilegedAction::SetCapacity)
            .is_err());
    }

    #[test]
    fn memory_sink_counts_kinds() {
        let sink = MemoryAuditSink::new();
        sink.record(AuditEvent::FeedUpdated(crate::audit::FeedUpdated {
            id: uuid::Uuid::new_v4(),
            at: Utc::now(),
            feed: "feed-a".to_string(),
        }));
        assert_eq!(sink.count_of("FeedUpdated"), 1);
        assert_eq!(sink.count_of("DepositMade"), 0);
    }
}

//! Oracle-priced valuation: convert native amounts through an external
//! price sample, refusing compromised or stale observations.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::asset::{native_asset_id, AssetId};
use crate::config::{DECIMAL_FACTOR, HEARTBEAT_SECS, NORMALIZED_DECIMALS};
use crate::external::{PriceFeed, PriceSample};
use crate::math;
use crate::valuation::{ValuationError, ValuationProvider};

/// Valuation through an external price-sample feed.
///
/// The native currency converts at the sampled price:
/// `normalized = floor(amount * value / 10^20)`, reconciling an
/// 18-fractional-digit amount and an 8-fractional-digit price down to
/// the 6-fractional-digit normalized unit. Registered denominations
/// (assets already expressed in the reference currency) convert by
/// decimal scaling alone, with no feed interaction.
///
/// No retries anywhere: a compromised or stale sample fails the whole
/// call, and recovery is a fresh sample on a later call or a privileged
/// feed replacement.
#[derive(Clone)]
pub struct OracleValuation {
    feed: Arc<dyn PriceFeed>,
    heartbeat: Duration,
    native: AssetId,
    denominations: HashMap<AssetId, u8>,
}

impl OracleValuation {
    /// Creates a strategy over the given feed with the protocol
    /// heartbeat.
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        Self {
            feed,
            heartbeat: Duration::seconds(HEARTBEAT_SECS),
            native: native_asset_id(),
            denominations: HashMap::new(),
        }
    }

    /// Registers an asset as normalized-denominated with the given
    /// fractional-digit count. Such assets convert by scaling alone.
    pub fn register_denomination(&mut self, asset: AssetId, decimals: u8) {
        self.denominations.insert(asset, decimals);
    }

    /// Replaces the feed reference.
    ///
    /// Privilege gating happens at the vault layer; this trades
    /// centralization risk for upgradability and is the only recovery
    /// path from a permanently broken feed.
    pub fn set_feed(&mut self, feed: Arc<dyn PriceFeed>) {
        self.feed = feed;
    }

    /// A short identification of the feed in use.
    pub fn feed_description(&self) -> String {
        self.feed.description()
    }

    /// The most recent sample, unvalidated. Pure read.
    pub fn latest_sample(&self) -> PriceSample {
        self.feed.latest_sample()
    }

    /// The most recent sample, validated for use in a conversion.
    ///
    /// # Errors
    ///
    /// [`ValuationError::OracleCompromised`] if the value is zero or
    /// negative; [`ValuationError::StalePrice`] if the sample is older
    /// than the heartbeat.
    pub fn checked_sample(&self) -> Result<PriceSample, ValuationError> {
        let sample = self.feed.latest_sample();
        if sample.value <= 0 {
            return Err(ValuationError::OracleCompromised);
        }
        let age = Utc::now().signed_duration_since(sample.updated_at);
        if age > self.heartbeat {
            return Err(ValuationError::StalePrice {
                age_secs: age.num_seconds(),
                heartbeat_secs: self.heartbeat.num_seconds(),
            });
        }
        Ok(sample)
    }

    /// Converts a native amount to the normalized unit at the current
    /// sample.
    pub fn convert_native(&self, amount: u128) -> Result<u128, ValuationError> {
        let sample = self.checked_sample()?;
        math::mul_div_down(amount, sample.value as u128, DECIMAL_FACTOR)
            .ok_or(ValuationError::Overflow)
    }

    /// Converts a normalized amount back to native units at the current
    /// sample. Exact inverse scaling of
    /// [`convert_native`](Self::convert_native); used for
    /// native-denominated capacity views and configuration.
    pub fn to_native(&self, normalized: u128) -> Result<u128, ValuationError> {
        let sample = self.checked_sample()?;
        math::mul_div_down(normalized, DECIMAL_FACTOR, sample.value as u128)
            .ok_or(ValuationError::Overflow)
    }
}

impl ValuationProvider for OracleValuation {
    fn convert(&self, asset: &AssetId, amount: u128) -> Result<u128, ValuationError> {
        if *asset == self.native {
            return self.convert_native(amount);
        }
        let decimals = self
            .denominations
            .get(asset)
            .copied()
            .ok_or(ValuationError::UnknownDenomination(*asset))?;
        math::scale_decimals(amount, decimals, NORMALIZED_DECIMALS).ok_or(ValuationError::Overflow)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;

    struct FixedFeed {
        sample: Mutex<PriceSample>,
    }

    impl FixedFeed {
        fn at(value: i128, updated_at: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                sample: Mutex::new(PriceSample { value, updated_at }),
            })
        }

        fn fresh(value: i128) -> Arc<Self> {
            Self::at(value, Utc::now())
        }
    }

    impl PriceFeed for FixedFeed {
        fn latest_sample(&self) -> PriceSample {
            *self.sample.lock()
        }

        fn description(&self) -> String {
            "fixed test feed".to_string()
        }
    }

    const PRICE_2000: i128 = 200_000_000_000; // 2000.00000000

    #[test]
    fn reference_conversion_vector() {
        // price 2000.00000000, amount 1.000000000000000000
        // => exactly 2000.000000 normalized units.
        let valuation = OracleValuation::new(FixedFeed::fresh(PRICE_2000));
        let normalized = valuation
            .convert(&native_asset_id(), 1_000_000_000_000_000_000)
            .unwrap();
        assert_eq!(normalized, 2_000_000_000);
    }

    #[test]
    fn conversion_floors() {
        // 1 wei at price 2000 is far below one normalized smallest unit.
        let valuation = OracleValuation::new(FixedFeed::fresh(PRICE_2000));
        assert_eq!(valuation.convert(&native_asset_id(), 1).unwrap(), 0);
    }

    #[test]
    fn reverse_conversion_is_symmetric() {
        let valuation = OracleValuation::new(FixedFeed::fresh(PRICE_2000));
        let native = valuation.to_native(2_000_000_000).unwrap();
        assert_eq!(native, 1_000_000_000_000_000_000);

        // Round trip through both directions is the identity for amounts
        // that the floor does not truncate.
        let normalized = valuation.convert_native(native).unwrap();
        assert_eq!(normalized, 2_000_000_000);
    }

    #[test]
    fn zero_price_is_compromised() {
        let valuation = OracleValuation::new(FixedFeed::fresh(0));
        assert_eq!(
            valuation.convert_native(1).unwrap_err(),
            ValuationError::OracleCompromised
        );
    }

    #[test]
    fn negative_price_is_compromised() {
        let valuation = OracleValuation::new(FixedFeed::fresh(-1));
        assert_eq!(
            valuation.convert_native(1).unwrap_err(),
            ValuationError::OracleCompromised
        );
    }

    #[test]
    fn sample_past_heartbeat_is_stale() {
        let updated_at = Utc::now() - Duration::seconds(HEARTBEAT_SECS + 60);
        let valuation = OracleValuation::new(FixedFeed::at(PRICE_2000, updated_at));
        let err = valuation.convert_native(1).unwrap_err();
        assert!(matches!(
            err,
            ValuationError::StalePrice {
                heartbeat_secs: HEARTBEAT_SECS,
                ..
            }
        ));
    }

    #[test]
    fn sample_within_heartbeat_is_usable() {
        let updated_at = Utc::now() - Duration::seconds(HEARTBEAT_SECS - 60);
        let valuation = OracleValuation::new(FixedFeed::at(PRICE_2000, updated_at));
        assert!(valuation.convert_native(1_000_000_000_000_000_000).is_ok());
    }

    #[test]
    fn registered_denomination_converts_by_scaling() {
        let usdx = AssetId::derive("USDX", "cairn:test");
        let mut valuation = OracleValuation::new(FixedFeed::fresh(PRICE_2000));
        valuation.register_denomination(usdx, 8);

        // 8 -> 6 digits: 1.00000000 becomes 1.000000.
        assert_eq!(valuation.convert(&usdx, 100_000_000).unwrap(), 1_000_000);
    }

    #[test]
    fn identity_denomination_passes_through() {
        let usdx = AssetId::derive("USDX", "cairn:test");
        let mut valuation = OracleValuation::new(FixedFeed::fresh(PRICE_2000));
        valuation.register_denomination(usdx, NORMALIZED_DECIMALS);
        assert_eq!(valuation.convert(&usdx, 123_456).unwrap(), 123_456);
    }

    #[test]
    fn unknown_asset_is_rejected() {
        let ghost = AssetId::derive("GHOST", "cairn:test");
        let valuation = OracleValuation::new(FixedFeed::fresh(PRICE_2000));
        assert_eq!(
            valuation.convert(&ghost, 1).unwrap_err(),
            ValuationError::UnknownDenomination(ghost)
        );
    }

    #[test]
    fn set_feed_replaces_the_reference() {
        let mut valuation = OracleValuation::new(FixedFeed::fresh(PRICE_2000));
        valuation.set_feed(FixedFeed::fresh(PRICE_2000 * 2));
        let normalized = valuation
            .convert_native(1_000_000_000_000_000_000)
            .unwrap();
        assert_eq!(normalized, 4_000_000_000);
    }
}

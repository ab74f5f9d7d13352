//! Exchange-executed valuation: convert deposits by actually swapping
//! them for the canonical asset along a fixed path.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::asset::{native_asset_id, AssetId};
use crate::config::{BPS_SCALE, SLIPPAGE_TOLERANCE_BPS, SWAP_DEADLINE_SECS};
use crate::external::{SwapCallError, SwapRouter};
use crate::math;
use crate::valuation::{ValuationError, ValuationProvider};

/// Valuation by execution on an external exchange.
///
/// The normalized unit IS the canonical asset, so the canonical asset
/// converts by identity with no exchange interaction. Everything else
/// goes through a fixed conversion path: the native currency as
/// `[intermediate, canonical]` (the intermediate liquidity asset doubles
/// as the wrapped form of the native currency), any other asset as
/// `[asset, intermediate, canonical]`.
///
/// One non-binding quote, one bounded execution per conversion. The
/// quote-then-execute pair is not atomic against price movement; the
/// exposure is bounded by the 1% tolerance and the validity window, and
/// by nothing else.
#[derive(Clone)]
pub struct SwapValuation {
    router: Arc<dyn SwapRouter>,
    native: AssetId,
    intermediate: AssetId,
    canonical: AssetId,
    slippage_bps: u128,
    deadline: Duration,
}

impl SwapValuation {
    /// Creates a strategy over the given router and path endpoints with
    /// the protocol tolerance and validity window.
    pub fn new(router: Arc<dyn SwapRouter>, intermediate: AssetId, canonical: AssetId) -> Self {
        Self {
            router,
            native: native_asset_id(),
            intermediate,
            canonical,
            slippage_bps: SLIPPAGE_TOLERANCE_BPS,
            deadline: Duration::seconds(SWAP_DEADLINE_SECS),
        }
    }

    /// The canonical asset all deposits resolve into.
    pub fn canonical(&self) -> AssetId {
        self.canonical
    }

    /// The intermediate liquidity asset on the conversion path.
    pub fn intermediate(&self) -> AssetId {
        self.intermediate
    }

    /// Returns `true` if the asset is the canonical asset itself.
    pub fn is_canonical(&self, asset: &AssetId) -> bool {
        *asset == self.canonical
    }

    /// Returns `true` if converting this asset requires granting the
    /// exchange a spending allowance first (the token path; native value
    /// is attached directly).
    pub fn needs_allowance(&self, asset: &AssetId) -> bool {
        !self.is_canonical(asset) && *asset != self.native
    }

    /// The fixed conversion path for an asset.
    pub fn conversion_path(&self, asset: &AssetId) -> Vec<AssetId> {
        if *asset == self.native {
            vec![self.intermediate, self.canonical]
        } else {
            vec![*asset, self.intermediate, self.canonical]
        }
    }

    fn map_router_error(error: SwapCallError) -> ValuationError {
        match error {
            SwapCallError::DeadlineExpired => ValuationError::DeadlineExpired,
            SwapCallError::Rejected { reason } => ValuationError::SwapFailed { reason },
        }
    }
}

impl ValuationProvider for SwapValuation {
    fn convert(&self, asset: &AssetId, amount: u128) -> Result<u128, ValuationError> {
        // Identity path: already the canonical asset, nothing to execute.
        if self.is_canonical(asset) {
            return Ok(amount);
        }

        let path = self.conversion_path(asset);

        let expected = self
            .router
            .quote(amount, &path)
            .map_err(Self::map_router_error)?;
        let minimum_out = math::apply_bps_discount(expected, self.slippage_bps, BPS_SCALE)
            .ok_or(ValuationError::Overflow)?;

        let deadline = Utc::now() + self.deadline;
        let actual = self
            .router
            .swap_exact_in(amount, minimum_out, &path, deadline)
            .map_err(Self::map_router_error)?;

        // A nominally successful call with no output is still a failure;
        // crediting zero would be worse than refusing.
        if actual == 0 {
            return Err(ValuationError::SwapFailed {
                reason: "execution returned zero output".to_string(),
            });
        }
        Ok(actual)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! # Engine Configuration & Constants
//!
//! Every magic number in CAIRN lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! The decimal precisions below are part of the accounting model itself.
//! Changing them after any vault holds value silently re-denominates every
//! balance, so don't.

// ---------------------------------------------------------------------------
// Decimal Precision
// ---------------------------------------------------------------------------

/// Fractional digits of the native chain currency. One whole native unit
/// is `10^18` smallest units.
pub const NATIVE_DECIMALS: u8 = 18;

/// Fractional digits of a price sample. A feed quoting 2000.5 reports
/// `200_050_000_000`.
pub const PRICE_DECIMALS: u8 = 8;

/// Fractional digits of the normalized accounting unit. One whole
/// normalized unit is `10^6` smallest units.
pub const NORMALIZED_DECIMALS: u8 = 6;

/// Scale factor reconciling an 18-digit native amount multiplied by an
/// 8-digit price down to the 6-digit normalized unit:
/// `10^(NATIVE_DECIMALS + PRICE_DECIMALS - NORMALIZED_DECIMALS)`.
///
/// The same factor is used in both conversion directions. Round-tripping
/// through an asymmetric pair of exponents would disagree with itself,
/// which is not a property you want in a capacity check.
pub const DECIMAL_FACTOR: u128 = 100_000_000_000_000_000_000; // 10^20

// ---------------------------------------------------------------------------
// Oracle Valuation
// ---------------------------------------------------------------------------

/// Maximum tolerated age of a price sample, in seconds. A sample older
/// than this is unusable and fails the whole call.
pub const HEARTBEAT_SECS: i64 = 3600;

// ---------------------------------------------------------------------------
// Swap Valuation
// ---------------------------------------------------------------------------

/// Basis-point denominator. 100% = 10_000 bps.
pub const BPS_SCALE: u128 = 10_000;

/// Maximum acceptable shortfall between a quoted and an executed swap
/// output, in basis points. 100 bps = 1%.
pub const SLIPPAGE_TOLERANCE_BPS: u128 = 100;

/// Validity window for a swap execution, in seconds. The exchange must
/// settle within this window or the call self-cancels.
pub const SWAP_DEADLINE_SECS: i64 = 15;

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Display symbol for the native chain currency.
pub const NATIVE_SYMBOL: &str = "NATIVE";

//! Fixed-point arithmetic helpers.
//!
//! All functions are pure, deterministic, and return `None` on overflow or
//! division by zero instead of panicking. Callers in the engine map `None`
//! to a typed overflow error; nothing in a money path ever unwraps.

/// Multiplies two `u128` values and divides by a third, rounding down.
///
/// Flooring is the conservative direction for crediting deposits: the
/// ledger never credits more than the conversion is worth.
pub fn mul_div_down(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    a.checked_mul(b)?.checked_div(c)
}

/// Returns `10^exp`, or `None` if the power overflows `u128`.
pub fn pow10(exp: u32) -> Option<u128> {
    10u128.checked_pow(exp)
}

/// Rescales `amount` from `from` fractional digits to `to` fractional
/// digits. Scaling down floors; scaling up fails on overflow.
pub fn scale_decimals(amount: u128, from: u8, to: u8) -> Option<u128> {
    if from == to {
        return Some(amount);
    }
    if from > to {
        let divisor = pow10(u32::from(from - to))?;
        amount.checked_div(divisor)
    } else {
        let factor = pow10(u32::from(to - from))?;
        amount.checked_mul(factor)
    }
}

/// Applies a basis-point discount: `amount * (scale - bps) / scale`.
///
/// Used to derive the minimum acceptable output from a swap quote.
/// Returns `None` if `bps` exceeds `scale` or the product overflows.
pub fn apply_bps_discount(amount: u128, bps: u128, scale: u128) -> Option<u128> {
    let retained = scale.checked_sub(bps)?;
    mul_div_down(amount, retained, scale)
}

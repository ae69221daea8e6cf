//! Fixed-point arithmetic for reward accounting.
//!
//! All quantities are unsigned 256-bit integers in smallest token units.
//! Every product is checked and every division truncates toward zero. The
//! truncation direction decides who keeps the rounding dust, so none of
//! these helpers round.

use alloy_primitives::U256;

use crate::error::MathError;

/// `a * b / d`, truncating. Returns zero when `d` is zero.
///
/// The product is formed in full 256-bit width before dividing, so
/// `mul_div(w, reward, total)` is exact for any share computation whose
/// product fits in 256 bits.
pub fn mul_div(a: U256, b: U256, d: U256) -> Result<U256, MathError> {
    if d.is_zero() {
        return Ok(U256::ZERO);
    }
    let product = a.checked_mul(b).ok_or(MathError::ArithmeticOverflow)?;
    Ok(product / d)
}

/// Apply one step of geometric decay: `rate * numerator / denominator`.
pub fn decay(rate: U256, numerator: u64, denominator: u64) -> Result<U256, MathError> {
    mul_div(rate, U256::from(numerator), U256::from(denominator))
}

/// Divide an amount by an integer ratio. A zero ratio yields zero.
pub fn ratio_div(amount: U256, ratio: u64) -> U256 {
    if ratio == 0 {
        return U256::ZERO;
    }
    amount / U256::from(ratio)
}

/// `rate * ticks`, checked.
pub fn scale_by_ticks(rate: U256, ticks: u64) -> Result<U256, MathError> {
    rate.checked_mul(U256::from(ticks))
        .ok_or(MathError::ArithmeticOverflow)
}

/// Checked 256-bit addition.
pub fn add(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_add(b).ok_or(MathError::ArithmeticOverflow)
}

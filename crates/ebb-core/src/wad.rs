//! WAD fixed-point arithmetic with explicit rounding direction.
//!
//! Every call site picks `down` or `up` deliberately: amounts owed to users
//! round down, amounts taken from users (losses) round up, so aggregates
//! can never go negative. All intermediates are checked `u128`.

use crate::constants::WAD;
use crate::error::MathError;

/// `floor(a * b / d)`.
///
/// # Examples
///
/// ```
/// use ebb_core::wad::mul_div_down;
/// assert_eq!(mul_div_down(10, 10, 3).unwrap(), 33);
/// ```
pub fn mul_div_down(a: u128, b: u128, d: u128) -> Result<u128, MathError> {
    if d == 0 {
        return Err(MathError::DivisionByZero);
    }
    let num = a.checked_mul(b).ok_or(MathError::ArithmeticOverflow)?;
    Ok(num / d)
}

/// `ceil(a * b / d)`.
///
/// # Examples
///
/// ```
/// use ebb_core::wad::mul_div_up;
/// assert_eq!(mul_div_up(10, 10, 3).unwrap(), 34);
/// assert_eq!(mul_div_up(9, 10, 3).unwrap(), 30);
/// ```
pub fn mul_div_up(a: u128, b: u128, d: u128) -> Result<u128, MathError> {
    if d == 0 {
        return Err(MathError::DivisionByZero);
    }
    let num = a.checked_mul(b).ok_or(MathError::ArithmeticOverflow)?;
    Ok(num.div_ceil(d))
}

/// `floor(a * b / WAD)`.
pub fn mul_wad_down(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_down(a, b, WAD)
}

/// `ceil(a * b / WAD)`.
pub fn mul_wad_up(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_up(a, b, WAD)
}

/// `floor(a * WAD / b)`.
pub fn div_wad_down(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_down(a, WAD, b)
}

/// `ceil(a * WAD / b)`.
pub fn div_wad_up(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_up(a, WAD, b)
}

/// Parse a decimal string such as `"1.25"` into WAD.
///
/// At most 18 fractional digits are accepted. Used by configuration loading.
///
/// # Examples
///
/// ```
/// use ebb_core::{constants::WAD, wad::parse_wad};
/// assert_eq!(parse_wad("1.25"), Some(WAD + WAD / 4));
/// assert_eq!(parse_wad("2"), Some(2 * WAD));
/// assert_eq!(parse_wad("abc"), None);
/// ```
pub fn parse_wad(s: &str) -> Option<u128> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if frac_part.len() > 18 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let int: u128 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    let mut frac: u128 = if frac_part.is_empty() { 0 } else { frac_part.parse().ok()? };
    for _ in frac_part.len()..18 {
        frac *= 10;
    }
    int.checked_mul(WAD)?.checked_add(frac)
}

/// Render a WAD value as a decimal string with trailing zeros trimmed.
///
/// # Examples
///
/// ```
/// use ebb_core::{constants::WAD, wad::format_wad};
/// assert_eq!(format_wad(WAD + WAD / 5), "1.2");
/// assert_eq!(format_wad(3 * WAD), "3");
/// ```
pub fn format_wad(v: u128) -> String {
    let int = v / WAD;
    let frac = v % WAD;
    if frac == 0 {
        return int.to_string();
    }
    let digits = format!("{frac:018}");
    format!("{int}.{}", digits.trim_end_matches('0'))
}

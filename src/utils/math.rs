//! Fixed-point arithmetic and mathematical utilities.
//!
//! Every amount in the protocol is a `u128` carrying 18 fractional decimal
//! digits. Products are taken in 256 bits so `amount * price` never wraps, and
//! every division truncates toward zero.

use std::str::FromStr;

use primitive_types::U256;
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::utils::constants::{BPS_DIVISOR, DECIMALS, PRECISION, RATIO_PRECISION, SECONDS_PER_YEAR};

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(Error::Overflow {
        operation: format!("{} - {}", a, b),
    })
}

/// Computes `(a * b) / c` with a 256-bit intermediate, rounding down
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let result = U256::from(a) * U256::from(b) / U256::from(c);
    if result > U256::from(u128::MAX) {
        return Err(Error::Overflow {
            operation: format!("({} * {}) / {}", a, b, c),
        });
    }
    Ok(result.as_u128())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARE / VALUE CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Value of `shares` at a fixed-point exchange rate
pub fn shares_to_value(shares: u128, exchange_rate: u128) -> Result<u128> {
    mul_div(shares, exchange_rate, PRECISION)
}

/// Shares bought by `value` at a fixed-point exchange rate
pub fn value_to_shares(value: u128, exchange_rate: u128) -> Result<u128> {
    mul_div(value, PRECISION, exchange_rate)
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERALIZATION CALCULATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Value of reserve-asset collateral in pegged units.
///
/// `price` is quoted in pegged units per whole reserve unit, scaled by
/// [`PRECISION`].
pub fn calculate_collateral_value(collateral: u128, price: u128) -> Result<u128> {
    mul_div(collateral, price, PRECISION)
}

/// Collateralization ratio as a whole percentage (150 = 150%).
///
/// Zero debt yields `u128::MAX`, i.e. an always-safe position.
pub fn calculate_position_ratio(collateral_value: u128, debt_value: u128) -> Result<u128> {
    if debt_value == 0 {
        return Ok(u128::MAX);
    }
    mul_div(collateral_value, RATIO_PRECISION, debt_value)
}

// ═══════════════════════════════════════════════════════════════════════════════
// INTEREST
// ═══════════════════════════════════════════════════════════════════════════════

/// Simple interest earned by `value` over `elapsed` seconds at `rate_bps` per year
pub fn calculate_interest(value: u128, rate_bps: u128, elapsed: u64) -> Result<u128> {
    let rate_time = rate_bps.checked_mul(elapsed as u128).ok_or(Error::Overflow {
        operation: format!("{} * {}", rate_bps, elapsed),
    })?;
    mul_div(value, rate_time, SECONDS_PER_YEAR * BPS_DIVISOR)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPLAY / PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a human decimal string ("1.5") into an 18-decimal fixed-point amount
pub fn parse_wad(input: &str) -> Result<u128> {
    let decimal = Decimal::from_str(input.trim()).map_err(|e| Error::InvalidParameter {
        name: "amount".into(),
        reason: e.to_string(),
    })?;

    if decimal.is_sign_negative() {
        return Err(Error::InvalidParameter {
            name: "amount".into(),
            reason: "cannot be negative".into(),
        });
    }

    let scale = decimal.scale();
    if scale > DECIMALS {
        return Err(Error::InvalidParameter {
            name: "amount".into(),
            reason: format!("more than {} decimal places", DECIMALS),
        });
    }

    let mantissa = decimal.mantissa() as u128;
    let factor = 10u128.pow(DECIMALS - scale);
    mantissa.checked_mul(factor).ok_or(Error::Overflow {
        operation: format!("parse {}", input),
    })
}

/// Format an 18-decimal fixed-point amount, trimming trailing zeros
pub fn format_wad(amount: u128) -> String {
    let whole = amount / PRECISION;
    let frac = amount % PRECISION;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:018}", frac);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

//! Protocol constants and magic numbers.
//!
//! All protocol-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point scale: 18 fractional decimal digits
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Number of fractional decimal digits carried by every amount
pub const DECIMALS: u32 = 18;

/// Basis points divisor (10000 = 100%)
pub const BPS_DIVISOR: u128 = 10_000;

/// Seconds in the 365-day interest year
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 3600;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERALIZATION CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimum collateralization ratio - 150%
pub const MIN_COLLATERAL_RATIO: u128 = 150;

/// Ratio precision (100 = 100%)
pub const RATIO_PRECISION: u128 = 100;

/// Share of seized collateral paid to the liquidator - 10%
pub const LIQUIDATION_REWARD_PERCENT: u128 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// RATE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default annual borrow rate - 5% (500 basis points)
pub const DEFAULT_BORROW_RATE_BPS: u128 = 500;

/// Default annual staking rate - 3% (300 basis points)
pub const DEFAULT_STAKING_RATE_BPS: u128 = 300;

/// Highest accepted annual rate - 100%
pub const MAX_RATE_BPS: u128 = BPS_DIVISOR;

// ═══════════════════════════════════════════════════════════════════════════════
// SWAP CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Input kept after the 0.3% swap fee, per mille
pub const SWAP_FEE_NUMERATOR: u128 = 997;

/// Swap fee denominator
pub const SWAP_FEE_DENOMINATOR: u128 = 1_000;

// ═══════════════════════════════════════════════════════════════════════════════
// MISC
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an account address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Maximum events kept in memory by the event log
pub const MAX_EVENTS: usize = 1_000;

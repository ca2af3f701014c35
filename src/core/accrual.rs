//! Lazy interest accrual shared by the debt pool and the staking vault.
//!
//! Both pools keep a monotonic exchange rate that is only brought up to date
//! when something touches the pool. Each touch applies simple interest for the
//! window since the previous touch, on top of the already-inflated pool value,
//! so the realized growth depends on how often the pool is touched. That
//! stepwise behavior (including truncation on every step) is part of the
//! accounting model and must not be replaced by continuous compounding.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::math::calculate_interest;

/// Rate and last-touch time of a share pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestClock {
    /// Annual rate in basis points
    rate_bps: u128,
    /// Timestamp of the last accrual (seconds)
    last_update: u64,
}

impl InterestClock {
    /// Start a clock at `now`
    pub fn new(rate_bps: u128, now: u64) -> Self {
        Self {
            rate_bps,
            last_update: now,
        }
    }

    /// Current annual rate in basis points
    pub fn rate_bps(&self) -> u128 {
        self.rate_bps
    }

    /// Timestamp of the last accrual
    pub fn last_update(&self) -> u64 {
        self.last_update
    }

    /// Replace the rate. Callers accrue first so the old rate is crystallized.
    pub fn set_rate(&mut self, rate_bps: u128) {
        self.rate_bps = rate_bps;
    }

    /// Interest earned by `pool_value` since the last touch.
    ///
    /// Refreshes `last_update` to `now`. Returns zero when no time has passed,
    /// the pool holds no shares, or the rate is zero. A `now` earlier than the
    /// last touch is ignored entirely. Never fails: a window whose interest
    /// would overflow is skipped.
    pub fn accrue(&mut self, now: u64, pool_value: u128, pool_shares: u128) -> u128 {
        if now < self.last_update {
            return 0;
        }

        let elapsed = now - self.last_update;
        self.last_update = now;

        if elapsed == 0 || pool_shares == 0 || self.rate_bps == 0 {
            return 0;
        }

        match calculate_interest(pool_value, self.rate_bps, elapsed) {
            Ok(interest) => {
                debug!(elapsed, pool_value, rate_bps = %self.rate_bps, interest, "accrual window");
                interest
            }
            Err(e) => {
                warn!(elapsed, pool_value, "skipping accrual window: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{PRECISION, SECONDS_PER_YEAR};

    const YEAR: u64 = SECONDS_PER_YEAR as u64;

    #[test]
    fn test_zero_elapsed_refreshes_only() {
        let mut clock = InterestClock::new(500, 100);
        assert_eq!(clock.accrue(100, 100 * PRECISION, 100 * PRECISION), 0);
        assert_eq!(clock.last_update(), 100);
    }

    #[test]
    fn test_empty_pool_refreshes_only() {
        let mut clock = InterestClock::new(500, 0);
        assert_eq!(clock.accrue(YEAR, 100 * PRECISION, 0), 0);
        assert_eq!(clock.last_update(), YEAR);
    }

    #[test]
    fn test_zero_rate_refreshes_only() {
        let mut clock = InterestClock::new(0, 0);
        assert_eq!(clock.accrue(YEAR, 100 * PRECISION, 100 * PRECISION), 0);
        assert_eq!(clock.last_update(), YEAR);
    }

    #[test]
    fn test_single_window() {
        let mut clock = InterestClock::new(500, 0);
        assert_eq!(clock.accrue(YEAR, 100 * PRECISION, 100 * PRECISION), 5 * PRECISION);
    }

    #[test]
    fn test_backwards_time_ignored() {
        let mut clock = InterestClock::new(500, 1_000);
        assert_eq!(clock.accrue(10, 100 * PRECISION, 100 * PRECISION), 0);
        assert_eq!(clock.last_update(), 1_000);
    }

    #[test]
    fn test_overflowing_window_skipped() {
        let mut clock = InterestClock::new(10_000, 0);
        assert_eq!(clock.accrue(u64::MAX, u128::MAX, 1), 0);
        assert_eq!(clock.last_update(), u64::MAX);
    }
}

//! Protocol configuration and parameters.
//!
//! Parameters are fixed when the protocol is assembled. Rates can later be
//! changed through the rate controller; the price through the oracle owner.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Protocol parameters (set when the protocol is assembled)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Protocol version
    pub version: String,

    /// Minimum collateralization ratio in percent.
    /// Positions below it cannot borrow or withdraw and can be liquidated.
    pub min_collateral_ratio: u128,

    /// Percent of seized collateral paid to the liquidator; the rest goes to the treasury
    pub liquidation_reward_percent: u128,

    /// Initial annual borrow rate in basis points
    pub borrow_rate_bps: u128,

    /// Initial annual staking rate in basis points
    pub staking_rate_bps: u128,

    /// Initial oracle price (VNDT per reserve unit, 18 decimals)
    pub initial_eth_price: u128,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            min_collateral_ratio: MIN_COLLATERAL_RATIO,
            liquidation_reward_percent: LIQUIDATION_REWARD_PERCENT,
            borrow_rate_bps: DEFAULT_BORROW_RATE_BPS,
            staking_rate_bps: DEFAULT_STAKING_RATE_BPS,
            initial_eth_price: 2_500 * PRECISION,
        }
    }
}

impl ProtocolParams {
    /// Override the rates (for testing)
    pub fn with_rates(mut self, borrow_rate_bps: u128, staking_rate_bps: u128) -> Self {
        self.borrow_rate_bps = borrow_rate_bps;
        self.staking_rate_bps = staking_rate_bps;
        self
    }

    /// Override the initial price (for testing)
    pub fn with_price(mut self, price: u128) -> Self {
        self.initial_eth_price = price;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        if self.min_collateral_ratio == 0 {
            return Err(Error::InvalidParameter {
                name: "min_collateral_ratio".into(),
                reason: "cannot be zero".into(),
            });
        }
        if self.liquidation_reward_percent > RATIO_PRECISION {
            return Err(Error::InvalidParameter {
                name: "liquidation_reward_percent".into(),
                reason: format!("must be at most {}", RATIO_PRECISION),
            });
        }
        validate_rate("borrow_rate_bps", self.borrow_rate_bps)?;
        validate_rate("staking_rate_bps", self.staking_rate_bps)?;
        Ok(())
    }
}

/// Reject annual rates above 100%
pub fn validate_rate(name: &str, rate_bps: u128) -> Result<()> {
    if rate_bps > MAX_RATE_BPS {
        return Err(Error::InvalidParameter {
            name: name.into(),
            reason: format!("{} bps exceeds maximum {}", rate_bps, MAX_RATE_BPS),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = ProtocolParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.min_collateral_ratio, 150);
        assert_eq!(params.liquidation_reward_percent, 10);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = ProtocolParams::default();
        params.min_collateral_ratio = 0;
        assert!(params.validate().is_err());

        let params = ProtocolParams::default().with_rates(20_000, 0);
        assert!(params.validate().is_err());

        let mut params = ProtocolParams::default();
        params.liquidation_reward_percent = 101;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_params_json_roundtrip() {
        let params = ProtocolParams::default().with_price(PRECISION);
        let json = serde_json::to_string(&params).unwrap();
        let decoded: ProtocolParams = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, params);
    }
}

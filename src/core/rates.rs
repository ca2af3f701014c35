//! Rate controller.
//!
//! Owner-restricted entry point for interest-rate changes. The controller
//! forwards each update to the engine or the vault under its own identity,
//! which is the only identity those components accept rate changes from.

use serde::{Deserialize, Serialize};

use crate::core::config::validate_rate;
use crate::core::engine::DebtEngine;
use crate::core::staking::StakingVault;
use crate::error::{Error, Result};
use crate::protocol::events::EventLog;
use crate::utils::address::Address;

/// Pushes borrow and staking rates into the engine and vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateController {
    owner: Address,
    address: Address,
}

impl RateController {
    pub fn new(owner: Address, address: Address) -> Self {
        Self { owner, address }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Identity the engine and vault accept rate changes from
    pub fn address(&self) -> Address {
        self.address
    }

    /// Set the engine's annual borrow rate
    pub(crate) fn update_borrow_rate(
        &self,
        caller: &Address,
        rate_bps: u128,
        engine: &mut DebtEngine,
        now: u64,
        events: &mut EventLog,
    ) -> Result<()> {
        self.authorize(caller)?;
        validate_rate("borrow_rate_bps", rate_bps)?;
        engine.set_borrow_rate(&self.address, rate_bps, now, events)
    }

    /// Set the vault's annual staking rate
    pub(crate) fn update_staking_rate(
        &self,
        caller: &Address,
        rate_bps: u128,
        vault: &mut StakingVault,
        now: u64,
        events: &mut EventLog,
    ) -> Result<()> {
        self.authorize(caller)?;
        validate_rate("staking_rate_bps", rate_bps)?;
        vault.set_staking_rate(&self.address, rate_bps, now, events)
    }

    fn authorize(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::NotAuthorized(format!(
                "{} is not the rate controller owner",
                caller.to_hex()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProtocolParams;

    fn owner() -> Address {
        Address::from_label("admin")
    }

    fn controller() -> RateController {
        RateController::new(owner(), Address::from_label("rate-controller"))
    }

    fn engine(rates: &RateController) -> DebtEngine {
        DebtEngine::new(
            Address::from_label("engine"),
            rates.address(),
            Address::from_label("treasury"),
            &ProtocolParams::default(),
            0,
        )
    }

    #[test]
    fn test_owner_updates_both_rates() {
        let rates = controller();
        let mut engine = engine(&rates);
        let mut vault = StakingVault::new(Address::from_label("vault"), rates.address(), 300, 0);
        let mut events = EventLog::new();

        rates.update_borrow_rate(&owner(), 800, &mut engine, 1, &mut events).unwrap();
        rates.update_staking_rate(&owner(), 400, &mut vault, 1, &mut events).unwrap();

        assert_eq!(engine.borrow_rate(), 800);
        assert_eq!(vault.staking_rate(), 400);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_non_owner_rejected() {
        let rates = controller();
        let mut engine = engine(&rates);
        let err = rates
            .update_borrow_rate(&Address::from_label("mallory"), 800, &mut engine, 1, &mut EventLog::new())
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthorized(_)));
        assert_eq!(engine.borrow_rate(), 500);
    }

    #[test]
    fn test_rate_bound() {
        let rates = controller();
        let mut engine = engine(&rates);
        let err = rates
            .update_borrow_rate(&owner(), 10_001, &mut engine, 1, &mut EventLog::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }
}

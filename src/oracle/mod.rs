//! Price oracle.
//!
//! Holds a single reserve-asset price, quoted in VNDT per whole reserve unit
//! and scaled by 10^18. Only the owner may change it; no validation is applied
//! to the new value.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::protocol::events::{EventLog, PriceUpdatedEvent, ProtocolEvent};
use crate::utils::address::Address;

/// Single-value price oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Oracle {
    owner: Address,
    price: u128,
}

impl Oracle {
    /// Create an oracle with an initial price
    pub fn new(owner: Address, price: u128) -> Self {
        Self { owner, price }
    }

    /// Current reserve-asset price
    pub fn get_eth_price(&self) -> u128 {
        self.price
    }

    /// Oracle owner
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Replace the price. Only the owner may call.
    pub fn set_eth_price(
        &mut self,
        caller: &Address,
        price: u128,
        now: u64,
        events: &mut EventLog,
    ) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::NotAuthorized(format!(
                "{} is not the oracle owner",
                caller.to_hex()
            )));
        }
        self.price = price;
        events.emit(now, ProtocolEvent::PriceUpdated(PriceUpdatedEvent { price }));
        info!(price, "oracle price updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::PRECISION;

    #[test]
    fn test_owner_sets_price() {
        let owner = Address::from_label("owner");
        let mut oracle = Oracle::new(owner, 2_500 * PRECISION);
        let mut events = EventLog::new();

        oracle.set_eth_price(&owner, 2_000 * PRECISION, 1, &mut events).unwrap();
        assert_eq!(oracle.get_eth_price(), 2_000 * PRECISION);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_stranger_rejected() {
        let mut oracle = Oracle::new(Address::from_label("owner"), PRECISION);
        let mut events = EventLog::new();
        let err = oracle
            .set_eth_price(&Address::from_label("mallory"), 1, 1, &mut events)
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthorized(_)));
        assert_eq!(oracle.get_eth_price(), PRECISION);
    }

    #[test]
    fn test_zero_price_accepted() {
        let owner = Address::from_label("owner");
        let mut oracle = Oracle::new(owner, PRECISION);
        oracle.set_eth_price(&owner, 0, 1, &mut EventLog::new()).unwrap();
        assert_eq!(oracle.get_eth_price(), 0);
    }
}

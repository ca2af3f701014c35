//! Reserve-asset (native currency) transfers.
//!
//! Collateral and swap-pool reserves move through a [`NativeAsset`]. A transfer
//! is the point where control leaves the accounting core, so callers perform it
//! last and treat a failure as failing the whole operation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::safe_add;

/// Source of reserve-asset balances and transfers
pub trait NativeAsset {
    /// Balance held by `account`
    fn balance_of(&self, account: &Address) -> u128;

    /// Move `amount` from `from` to `to`; any failure is a `TransferFailed`
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<()>;
}

/// In-memory reserve-asset balances
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeBank {
    balances: HashMap<Address, u128>,
    /// Accounts whose receive hook fails
    rejecting: HashSet<Address>,
    total_supply: u128,
}

impl NativeBank {
    /// Create an empty bank
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new reserve units for `account` (genesis / faucet)
    pub fn credit(&mut self, account: &Address, amount: u128) -> Result<()> {
        let balance = safe_add(self.balance_of(account), amount)?;
        self.total_supply = safe_add(self.total_supply, amount)?;
        self.balances.insert(*account, balance);
        Ok(())
    }

    /// Make every incoming transfer to `account` fail (or stop failing)
    pub fn set_rejecting(&mut self, account: &Address, rejecting: bool) {
        if rejecting {
            self.rejecting.insert(*account);
        } else {
            self.rejecting.remove(account);
        }
    }

    /// Total reserve units in existence
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }
}

impl NativeAsset for NativeBank {
    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<()> {
        if amount == 0 || from == to {
            return Ok(());
        }
        if to.is_zero() {
            return Err(Error::TransferFailed("recipient is the zero address".into()));
        }
        if self.rejecting.contains(to) {
            return Err(Error::TransferFailed(format!(
                "{} rejected the transfer",
                to.to_hex()
            )));
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(Error::TransferFailed(format!(
                "{} holds {} but {} was requested",
                from.to_hex(),
                available,
                amount
            )));
        }
        let credited = safe_add(self.balance_of(to), amount)
            .map_err(|e| Error::TransferFailed(e.to_string()))?;

        self.balances.insert(*from, available - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

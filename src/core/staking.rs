//! Staking vault for VNDT deposits.
//!
//! Deposits are tracked as shares of a pool whose value grows with the staking
//! rate. The vault never holds a stored ledger balance: staking burns the
//! deposit from the ledger, unstaking mints the redeemed value back, and the
//! ledger reports the vault's balance as the value of all outstanding shares.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::core::accrual::InterestClock;
use crate::core::ledger::{Ledger, VirtualBalance};
use crate::error::{Error, Result};
use crate::protocol::events::*;
use crate::utils::address::Address;
use crate::utils::math::*;

/// Pool, ledger and event-log state captured before a mutation so a failed call can be undone
#[derive(Debug, Clone)]
struct Checkpoint {
    clock: InterestClock,
    total_shares: u128,
    total_value: u128,
    account: Address,
    account_shares: u128,
    ledger: Ledger,
    events: EventLog,
}

/// The staking vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakingVault {
    /// The vault's ledger address
    address: Address,
    /// Only identity allowed to change the staking rate
    rate_controller: Address,
    /// Shares by staker
    shares: HashMap<Address, u128>,
    /// Sum of all shares
    total_shares: u128,
    /// Pegged-unit value of all shares, yield included
    total_value: u128,
    /// Staking rate and last accrual time
    clock: InterestClock,
}

impl StakingVault {
    /// Create an empty vault
    pub fn new(address: Address, rate_controller: Address, staking_rate_bps: u128, now: u64) -> Self {
        Self {
            address,
            rate_controller,
            shares: HashMap::new(),
            total_shares: 0,
            total_value: 0,
            clock: InterestClock::new(staking_rate_bps, now),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// The vault's ledger address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sum of all shares
    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// Pool value
    pub fn total_value(&self) -> u128 {
        self.total_value
    }

    /// Shares held by `account`
    pub fn shares_of(&self, account: &Address) -> u128 {
        self.shares.get(account).copied().unwrap_or(0)
    }

    /// Current staking rate in basis points
    pub fn staking_rate(&self) -> u128 {
        self.clock.rate_bps()
    }

    /// Timestamp of the last accrual
    pub fn last_update(&self) -> u64 {
        self.clock.last_update()
    }

    /// Number of stakers
    pub fn staker_count(&self) -> usize {
        self.shares.len()
    }

    /// Pegged-unit value of `shares`. Pure read: no accrual.
    pub fn get_shares_value(&self, shares: u128) -> Result<u128> {
        if shares == 0 || self.total_shares == 0 {
            return Ok(0);
        }
        mul_div(shares, self.total_value, self.total_shares)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCRUAL
    // ═══════════════════════════════════════════════════════════════════════════

    /// Add the yield earned since the last touch to the pool value
    pub fn accrue_interest(&mut self, now: u64, events: &mut EventLog) {
        let interest = self.clock.accrue(now, self.total_value, self.total_shares);
        if interest == 0 {
            return;
        }
        match self.total_value.checked_add(interest) {
            Some(new_value) => {
                self.total_value = new_value;
                events.emit(
                    now,
                    ProtocolEvent::InterestAccrued(InterestAccruedEvent {
                        pool: PoolKind::Staking,
                        new_value,
                    }),
                );
            }
            None => warn!(interest, "staking pool value would overflow; window skipped"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STAKE / UNSTAKE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stake `amount` pegged units from `caller`, returning the shares issued.
    ///
    /// The tokens are pulled with the vault's allowance over `caller`.
    pub(crate) fn stake(
        &mut self,
        ledger: &mut Ledger,
        events: &mut EventLog,
        caller: &Address,
        amount: u128,
        now: u64,
    ) -> Result<u128> {
        if amount == 0 {
            return Err(Error::zero_amount("stake"));
        }

        let checkpoint = self.checkpoint(caller, ledger, events);
        let result = self.try_stake(ledger, events, caller, amount, now);
        if let Err(e) = &result {
            warn!(user = %caller.short(), error = %e, "stake rolled back");
            self.restore(checkpoint, ledger, events);
        }
        result
    }

    fn try_stake(
        &mut self,
        ledger: &mut Ledger,
        events: &mut EventLog,
        caller: &Address,
        amount: u128,
        now: u64,
    ) -> Result<u128> {
        self.accrue_interest(now, events);

        let (shares, new_total_value) = if self.total_shares == 0 {
            // bootstrap 1:1; any residual value left by rounding is dropped
            (amount, amount)
        } else {
            (
                mul_div(amount, self.total_shares, self.total_value)?,
                safe_add(self.total_value, amount)?,
            )
        };
        if shares == 0 {
            return Err(Error::InvalidAmount(format!(
                "stake of {} buys no shares",
                amount
            )));
        }

        let new_account_shares = safe_add(self.shares_of(caller), shares)?;
        let new_total_shares = safe_add(self.total_shares, shares)?;

        self.shares.insert(*caller, new_account_shares);
        self.total_shares = new_total_shares;
        self.total_value = new_total_value;

        ledger.transfer_from(&self.address, caller, &self.address, amount)?;

        events.emit(
            now,
            ProtocolEvent::Staked(StakeEvent {
                user: *caller,
                amount,
                shares,
            }),
        );
        info!(user = %caller.short(), amount, shares, "staked");
        Ok(shares)
    }

    /// Redeem `shares` for their current value, returning the value paid out
    pub(crate) fn unstake(
        &mut self,
        ledger: &mut Ledger,
        events: &mut EventLog,
        caller: &Address,
        shares: u128,
        now: u64,
    ) -> Result<u128> {
        if shares == 0 {
            return Err(Error::zero_amount("unstake"));
        }
        let held = self.shares_of(caller);
        if shares > held {
            return Err(Error::InsufficientShares {
                required: shares,
                available: held,
            });
        }

        let checkpoint = self.checkpoint(caller, ledger, events);
        let result = self.try_unstake(ledger, events, caller, shares, now);
        if let Err(e) = &result {
            warn!(user = %caller.short(), error = %e, "unstake rolled back");
            self.restore(checkpoint, ledger, events);
        }
        result
    }

    fn try_unstake(
        &mut self,
        ledger: &mut Ledger,
        events: &mut EventLog,
        caller: &Address,
        shares: u128,
        now: u64,
    ) -> Result<u128> {
        self.accrue_interest(now, events);

        let value = self.get_shares_value(shares)?;

        self.set_shares(*caller, self.shares_of(caller) - shares);
        self.total_shares = safe_sub(self.total_shares, shares)?;
        self.total_value = safe_sub(self.total_value, value)?;

        if value > 0 {
            ledger.release_from_vault(&self.address, caller, value)?;
        }

        events.emit(
            now,
            ProtocolEvent::Unstaked(StakeEvent {
                user: *caller,
                amount: value,
                shares,
            }),
        );
        info!(user = %caller.short(), value, shares, "unstaked");
        Ok(value)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RATE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Replace the staking rate. Only the rate controller may call.
    pub(crate) fn set_staking_rate(
        &mut self,
        caller: &Address,
        rate_bps: u128,
        now: u64,
        events: &mut EventLog,
    ) -> Result<()> {
        if *caller != self.rate_controller {
            return Err(Error::NotAuthorized(format!(
                "{} is not the rate controller",
                caller.to_hex()
            )));
        }

        self.accrue_interest(now, events);
        self.clock.set_rate(rate_bps);

        events.emit(
            now,
            ProtocolEvent::StakingRateUpdated(RateUpdatedEvent { rate_bps }),
        );
        info!(rate_bps, "staking rate updated");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn set_shares(&mut self, account: Address, shares: u128) {
        if shares == 0 {
            self.shares.remove(&account);
        } else {
            self.shares.insert(account, shares);
        }
    }

    fn checkpoint(&self, account: &Address, ledger: &Ledger, events: &EventLog) -> Checkpoint {
        Checkpoint {
            clock: self.clock,
            total_shares: self.total_shares,
            total_value: self.total_value,
            account: *account,
            account_shares: self.shares_of(account),
            ledger: ledger.clone(),
            events: events.clone(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint, ledger: &mut Ledger, events: &mut EventLog) {
        self.clock = checkpoint.clock;
        self.total_shares = checkpoint.total_shares;
        self.total_value = checkpoint.total_value;
        self.set_shares(checkpoint.account, checkpoint.account_shares);
        *ledger = checkpoint.ledger;
        *events = checkpoint.events;
    }
}

impl VirtualBalance for StakingVault {
    fn virtual_balance(&self) -> u128 {
        // shares == total_shares cannot overflow: the result is total_value
        self.get_shares_value(self.total_shares)
            .unwrap_or(self.total_value)
    }
}

//! Debt engine: collateral positions, share-based debt and liquidation.
//!
//! Debt is tracked as shares of a global pool whose exchange rate grows with
//! the borrow rate. A position moves through
//! `Empty -> Collateralized -> Borrowing -> {Collateralized | Empty}`:
//! - collateral is reserve asset attached by the caller
//! - minting issues pegged units against it and requires a 150% ratio afterwards
//! - repayment caps at the amount owed
//! - a position below the minimum ratio can be fully liquidated by anyone
//!   holding enough pegged units to cover its debt
//!
//! Every operation accrues first, commits internal state, validates the
//! resulting ratio and only then moves tokens or reserve asset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::core::accrual::InterestClock;
use crate::core::config::ProtocolParams;
use crate::core::ledger::{Ledger, VirtualBalance};
use crate::core::reserve::NativeAsset;
use crate::error::{Error, Result};
use crate::oracle::Oracle;
use crate::protocol::events::*;
use crate::utils::address::Address;
use crate::utils::constants::*;
use crate::utils::math::{self, mul_div, safe_add, safe_sub, shares_to_value, value_to_shares};

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle stage of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    /// No collateral and no debt
    Empty,
    /// Collateral posted, nothing borrowed
    Collateralized,
    /// Debt outstanding
    Borrowing,
}

/// A user's collateral position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPosition {
    /// Reserve-asset units held by the engine for this user
    pub collateral: u128,
    /// Claim on the global debt pool
    pub debt_shares: u128,
}

impl CollateralPosition {
    /// Current lifecycle stage
    pub fn status(&self) -> PositionStatus {
        if self.debt_shares > 0 {
            PositionStatus::Borrowing
        } else if self.collateral > 0 {
            PositionStatus::Collateralized
        } else {
            PositionStatus::Empty
        }
    }

    /// Check if the position has debt
    pub fn has_debt(&self) -> bool {
        self.debt_shares > 0
    }

    /// Check if the position holds nothing
    pub fn is_empty(&self) -> bool {
        self.collateral == 0 && self.debt_shares == 0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a liquidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationResult {
    /// Owner of the liquidated position
    pub user: Address,
    /// Account that paid off the debt
    pub liquidator: Address,
    /// Debt value burned from the liquidator
    pub liquidated_debt: u128,
    /// Value of the seized collateral at the oracle price
    pub collateral_value: u128,
    /// Liquidator's share of the collateral value
    pub liquidator_reward: u128,
    /// Treasury's share of the collateral value
    pub protocol_reward: u128,
    /// Reserve-asset units sent to the liquidator
    pub liquidator_collateral: u128,
    /// Reserve-asset units sent to the treasury
    pub protocol_collateral: u128,
    /// Oracle price used
    pub price: u128,
}

/// Aggregate engine statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_collateral: u128,
    pub total_collateral_value: u128,
    pub total_debt_shares: u128,
    pub total_debt_value: u128,
    pub debt_exchange_rate: u128,
    pub borrow_rate_bps: u128,
    /// Ledger total supply, vault virtual balance included
    pub total_supply: u128,
    /// System-wide collateralization ratio (percent)
    pub system_ratio: u128,
    pub open_positions: usize,
    pub liquidatable_positions: usize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Collaborators an engine operation reads from or moves value through
pub struct EngineContext<'a> {
    pub oracle: &'a Oracle,
    pub ledger: &'a mut Ledger,
    pub reserve: &'a mut dyn NativeAsset,
    pub events: &'a mut EventLog,
    pub now: u64,
}

impl EngineContext<'_> {
    fn price(&self) -> u128 {
        self.oracle.get_eth_price()
    }
}

/// Pool and position state captured before a mutation
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    clock: InterestClock,
    debt_exchange_rate: u128,
    total_debt_shares: u128,
    total_collateral: u128,
    account: Address,
    position: CollateralPosition,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEBT ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateralized borrowing against the reserve asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtEngine {
    /// Engine identity: ledger minter and reserve-asset custodian
    address: Address,
    /// Only identity allowed to change the borrow rate
    rate_controller: Address,
    /// Receives the protocol's share of liquidated collateral
    treasury: Address,
    /// Minimum collateralization ratio (percent)
    min_collateral_ratio: u128,
    /// Liquidator's share of seized collateral (percent)
    liquidation_reward_percent: u128,
    positions: HashMap<Address, CollateralPosition>,
    total_debt_shares: u128,
    total_collateral: u128,
    /// Debt value per share, scaled by PRECISION; never decreases
    debt_exchange_rate: u128,
    clock: InterestClock,
}

impl DebtEngine {
    /// Create an engine with no positions
    pub fn new(
        address: Address,
        rate_controller: Address,
        treasury: Address,
        params: &ProtocolParams,
        now: u64,
    ) -> Self {
        Self {
            address,
            rate_controller,
            treasury,
            min_collateral_ratio: params.min_collateral_ratio,
            liquidation_reward_percent: params.liquidation_reward_percent,
            positions: HashMap::new(),
            total_debt_shares: 0,
            total_collateral: 0,
            debt_exchange_rate: PRECISION,
            clock: InterestClock::new(params.borrow_rate_bps, now),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Engine identity
    pub fn address(&self) -> Address {
        self.address
    }

    /// Treasury receiving the protocol's liquidation share
    pub fn treasury(&self) -> Address {
        self.treasury
    }

    /// Position of `user` (default if none)
    pub fn position(&self, user: &Address) -> CollateralPosition {
        self.positions.get(user).copied().unwrap_or_default()
    }

    /// Number of non-empty positions
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn total_debt_shares(&self) -> u128 {
        self.total_debt_shares
    }

    pub fn total_collateral(&self) -> u128 {
        self.total_collateral
    }

    pub fn debt_exchange_rate(&self) -> u128 {
        self.debt_exchange_rate
    }

    pub fn borrow_rate(&self) -> u128 {
        self.clock.rate_bps()
    }

    pub fn last_update(&self) -> u64 {
        self.clock.last_update()
    }

    pub fn min_collateral_ratio(&self) -> u128 {
        self.min_collateral_ratio
    }

    /// Value of all outstanding debt at the current exchange rate
    pub fn total_debt_value(&self) -> Result<u128> {
        shares_to_value(self.total_debt_shares, self.debt_exchange_rate)
    }

    /// Debt owed by `user` at the current exchange rate (no accrual)
    pub fn current_debt_value(&self, user: &Address) -> Result<u128> {
        shares_to_value(self.position(user).debt_shares, self.debt_exchange_rate)
    }

    /// Value of `user`'s collateral at `price`
    pub fn calculate_collateral_value(&self, user: &Address, price: u128) -> Result<u128> {
        math::calculate_collateral_value(self.position(user).collateral, price)
    }

    /// Collateralization ratio of `user` at `price`; `u128::MAX` without debt
    pub fn calculate_position_ratio(&self, user: &Address, price: u128) -> Result<u128> {
        let debt = self.current_debt_value(user)?;
        if debt == 0 {
            return Ok(u128::MAX);
        }
        let collateral_value = self.calculate_collateral_value(user, price)?;
        math::calculate_position_ratio(collateral_value, debt)
    }

    /// Check if `user` is below the minimum ratio at `price`
    pub fn is_liquidatable(&self, user: &Address, price: u128) -> bool {
        // a ratio too large to represent is safe
        matches!(
            self.calculate_position_ratio(user, price),
            Ok(ratio) if ratio < self.min_collateral_ratio
        )
    }

    /// Additional pegged units `user` could mint at `price` and stay at the minimum ratio
    pub fn available_to_mint(&self, user: &Address, price: u128) -> Result<u128> {
        let collateral_value = self.calculate_collateral_value(user, price)?;
        let max_debt = mul_div(collateral_value, RATIO_PRECISION, self.min_collateral_ratio)?;
        Ok(max_debt.saturating_sub(self.current_debt_value(user)?))
    }

    /// Liquidatable positions at `price`, lowest ratio first
    pub fn liquidatable_positions(&self, price: u128) -> Vec<(Address, u128)> {
        let mut found: Vec<(Address, u128)> = self
            .positions
            .keys()
            .filter_map(|user| match self.calculate_position_ratio(user, price) {
                Ok(ratio) if ratio < self.min_collateral_ratio => Some((*user, ratio)),
                _ => None,
            })
            .collect();
        found.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        found
    }

    /// Engine-wide statistics; the ledger and vault supply the circulating supply
    pub fn system_stats(
        &self,
        ledger: &Ledger,
        vault: &impl VirtualBalance,
        price: u128,
    ) -> Result<SystemStats> {
        let total_debt_value = self.total_debt_value()?;
        let total_collateral_value = math::calculate_collateral_value(self.total_collateral, price)?;

        Ok(SystemStats {
            total_collateral: self.total_collateral,
            total_collateral_value,
            total_debt_shares: self.total_debt_shares,
            total_debt_value,
            debt_exchange_rate: self.debt_exchange_rate,
            borrow_rate_bps: self.borrow_rate(),
            total_supply: ledger.total_supply(vault),
            system_ratio: math::calculate_position_ratio(total_collateral_value, total_debt_value)?,
            open_positions: self.positions.len(),
            liquidatable_positions: self.liquidatable_positions(price).len(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCRUAL
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fold the interest accrued since the last touch into the exchange rate
    pub fn accrue_interest(&mut self, now: u64, events: &mut EventLog) {
        let pool_value = match self.total_debt_value() {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "debt pool value unavailable; window skipped");
                0
            }
        };
        let interest = self.clock.accrue(now, pool_value, self.total_debt_shares);
        if interest == 0 {
            return;
        }

        let new_rate = mul_div(interest, PRECISION, self.total_debt_shares)
            .and_then(|delta| safe_add(self.debt_exchange_rate, delta));
        match new_rate {
            Ok(rate) if rate > self.debt_exchange_rate => {
                self.debt_exchange_rate = rate;
                let new_value = self.total_debt_value().unwrap_or(pool_value);
                debug!(rate, new_value, "debt exchange rate accrued");
                events.emit(
                    now,
                    ProtocolEvent::InterestAccrued(InterestAccruedEvent {
                        pool: PoolKind::Debt,
                        new_value,
                    }),
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, interest, "debt exchange rate would overflow; window skipped"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLATERAL
    // ═══════════════════════════════════════════════════════════════════════════

    /// Lock `amount` of reserve asset attached by `caller`
    pub(crate) fn add_collateral(
        &mut self,
        ctx: &mut EngineContext<'_>,
        caller: &Address,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Err(Error::zero_amount("collateral"));
        }
        self.transact(ctx, caller, |engine, ctx| engine.try_add_collateral(ctx, caller, amount))
    }

    fn try_add_collateral(
        &mut self,
        ctx: &mut EngineContext<'_>,
        caller: &Address,
        amount: u128,
    ) -> Result<()> {
        self.accrue_interest(ctx.now, ctx.events);

        let mut position = self.position(caller);
        position.collateral = safe_add(position.collateral, amount)?;
        self.total_collateral = safe_add(self.total_collateral, amount)?;
        self.positions.insert(*caller, position);

        ctx.reserve.transfer(caller, &self.address, amount)?;

        let price = ctx.price();
        ctx.events.emit(
            ctx.now,
            ProtocolEvent::CollateralAdded(CollateralEvent {
                user: *caller,
                amount,
                price,
            }),
        );
        info!(user = %caller.short(), amount, price, "collateral added");
        Ok(())
    }

    /// Release `amount` of collateral to `caller`, keeping the position safe
    pub(crate) fn withdraw_collateral(
        &mut self,
        ctx: &mut EngineContext<'_>,
        caller: &Address,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Err(Error::zero_amount("withdrawal"));
        }
        let held = self.position(caller).collateral;
        if amount > held {
            return Err(Error::InsufficientCollateral {
                required: amount,
                available: held,
            });
        }
        self.transact(ctx, caller, |engine, ctx| engine.try_withdraw_collateral(ctx, caller, amount))
    }

    fn try_withdraw_collateral(
        &mut self,
        ctx: &mut EngineContext<'_>,
        caller: &Address,
        amount: u128,
    ) -> Result<()> {
        self.accrue_interest(ctx.now, ctx.events);

        let mut position = self.position(caller);
        position.collateral = safe_sub(position.collateral, amount)?;
        self.total_collateral = safe_sub(self.total_collateral, amount)?;
        self.set_position(*caller, position);

        let price = ctx.price();
        self.ensure_safe(caller, price)?;

        ctx.reserve.transfer(&self.address, caller, amount)?;

        ctx.events.emit(
            ctx.now,
            ProtocolEvent::CollateralWithdrawn(CollateralEvent {
                user: *caller,
                amount,
                price,
            }),
        );
        info!(user = %caller.short(), amount, price, "collateral withdrawn");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEBT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Borrow `amount` pegged units against `caller`'s collateral.
    /// Returns the debt shares issued.
    pub(crate) fn mint_vndt(
        &mut self,
        ctx: &mut EngineContext<'_>,
        caller: &Address,
        amount: u128,
    ) -> Result<u128> {
        if amount == 0 {
            return Err(Error::zero_amount("mint"));
        }
        self.transact(ctx, caller, |engine, ctx| engine.try_mint(ctx, caller, amount))
    }

    fn try_mint(&mut self, ctx: &mut EngineContext<'_>, caller: &Address, amount: u128) -> Result<u128> {
        self.accrue_interest(ctx.now, ctx.events);

        let shares = value_to_shares(amount, self.debt_exchange_rate)?;
        if shares == 0 {
            return Err(Error::InvalidAmount(format!(
                "mint of {} issues no debt shares",
                amount
            )));
        }
        debug!(amount, shares, rate = self.debt_exchange_rate, "debt shares computed");

        let mut position = self.position(caller);
        position.debt_shares = safe_add(position.debt_shares, shares)?;
        self.total_debt_shares = safe_add(self.total_debt_shares, shares)?;
        self.positions.insert(*caller, position);

        self.ensure_safe(caller, ctx.price())?;

        ctx.ledger.mint_to(&self.address, caller, amount)?;

        ctx.events.emit(
            ctx.now,
            ProtocolEvent::DebtSharesMinted(DebtSharesEvent {
                user: *caller,
                amount,
                shares,
            }),
        );
        info!(user = %caller.short(), amount, shares, "debt minted");
        Ok(shares)
    }

    /// Repay up to `amount` of `caller`'s debt, returning the amount actually repaid.
    ///
    /// Paying more than is owed caps at the owed amount. The engine burns the
    /// repayment with its allowance over `caller`.
    pub(crate) fn repay_up_to(
        &mut self,
        ctx: &mut EngineContext<'_>,
        caller: &Address,
        amount: u128,
    ) -> Result<u128> {
        if amount == 0 {
            return Err(Error::zero_amount("repayment"));
        }
        self.transact(ctx, caller, |engine, ctx| engine.try_repay(ctx, caller, amount))
    }

    fn try_repay(&mut self, ctx: &mut EngineContext<'_>, caller: &Address, amount: u128) -> Result<u128> {
        self.accrue_interest(ctx.now, ctx.events);

        let owed = self.current_debt_value(caller)?;
        let actual = amount.min(owed);
        if actual == 0 {
            return Ok(0);
        }

        let mut position = self.position(caller);
        let shares = if actual == owed {
            position.debt_shares
        } else {
            value_to_shares(actual, self.debt_exchange_rate)?.min(position.debt_shares)
        };
        position.debt_shares -= shares;
        self.total_debt_shares = safe_sub(self.total_debt_shares, shares)?;
        self.set_position(*caller, position);

        ctx.ledger.burn_from(&self.address, caller, actual)?;

        ctx.events.emit(
            ctx.now,
            ProtocolEvent::DebtSharesBurned(DebtSharesEvent {
                user: *caller,
                amount: actual,
                shares,
            }),
        );
        info!(user = %caller.short(), repaid = actual, shares, "debt repaid");
        Ok(actual)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIQUIDATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Close `user`'s unsafe position in full.
    ///
    /// The liquidator pays the whole debt (burned with the engine's allowance)
    /// and receives the reward share of the collateral; the rest goes to the
    /// treasury. Any shortfall is absorbed by closing the position.
    pub(crate) fn liquidate(
        &mut self,
        ctx: &mut EngineContext<'_>,
        liquidator: &Address,
        user: &Address,
    ) -> Result<LiquidationResult> {
        if !self.is_liquidatable(user, ctx.price()) {
            return Err(Error::NotLiquidatable(user.to_hex()));
        }
        self.transact(ctx, user, |engine, ctx| engine.try_liquidate(ctx, liquidator, user))
    }

    fn try_liquidate(
        &mut self,
        ctx: &mut EngineContext<'_>,
        liquidator: &Address,
        user: &Address,
    ) -> Result<LiquidationResult> {
        self.accrue_interest(ctx.now, ctx.events);

        let price = ctx.price();
        let position = self.position(user);
        let liquidated_debt = self.current_debt_value(user)?;
        let collateral_value = self.calculate_collateral_value(user, price)?;

        let liquidator_reward = mul_div(collateral_value, self.liquidation_reward_percent, RATIO_PRECISION)?;
        let protocol_reward = collateral_value - liquidator_reward;
        let liquidator_collateral = mul_div(position.collateral, self.liquidation_reward_percent, RATIO_PRECISION)?;
        let protocol_collateral = position.collateral - liquidator_collateral;

        self.total_debt_shares = safe_sub(self.total_debt_shares, position.debt_shares)?;
        self.total_collateral = safe_sub(self.total_collateral, position.collateral)?;
        self.positions.remove(user);

        if liquidated_debt > 0 {
            ctx.ledger.burn_from(&self.address, liquidator, liquidated_debt)?;
        }
        ctx.reserve.transfer(&self.address, liquidator, liquidator_collateral)?;
        if let Err(e) = ctx.reserve.transfer(&self.address, &self.treasury, protocol_collateral) {
            // hand the liquidator's share back so the reserve is unchanged
            ctx.reserve.transfer(liquidator, &self.address, liquidator_collateral)?;
            return Err(e);
        }

        ctx.events.emit(
            ctx.now,
            ProtocolEvent::Liquidated(LiquidationEvent {
                user: *user,
                liquidator: *liquidator,
                liquidator_reward,
                liquidated_debt,
                price,
            }),
        );
        info!(
            user = %user.short(),
            liquidator = %liquidator.short(),
            liquidated_debt,
            liquidator_reward,
            protocol_reward,
            "position liquidated"
        );

        Ok(LiquidationResult {
            user: *user,
            liquidator: *liquidator,
            liquidated_debt,
            collateral_value,
            liquidator_reward,
            protocol_reward,
            liquidator_collateral,
            protocol_collateral,
            price,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RATE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Replace the borrow rate. Only the rate controller may call.
    pub(crate) fn set_borrow_rate(
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

        events.emit(now, ProtocolEvent::BorrowRateUpdated(RateUpdatedEvent { rate_bps }));
        info!(rate_bps, "borrow rate updated");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn ensure_safe(&self, user: &Address, price: u128) -> Result<()> {
        let ratio = self.calculate_position_ratio(user, price)?;
        if ratio < self.min_collateral_ratio {
            return Err(Error::UnsafePositionRatio {
                current: ratio,
                minimum: self.min_collateral_ratio,
            });
        }
        Ok(())
    }

    fn set_position(&mut self, user: Address, position: CollateralPosition) {
        if position.is_empty() {
            self.positions.remove(&user);
        } else {
            self.positions.insert(user, position);
        }
    }

    /// Run `op`, restoring pool, `account`, ledger and event-log state if it fails
    fn transact<'c, T>(
        &mut self,
        ctx: &mut EngineContext<'c>,
        account: &Address,
        op: impl FnOnce(&mut Self, &mut EngineContext<'c>) -> Result<T>,
    ) -> Result<T> {
        let checkpoint = Checkpoint {
            clock: self.clock,
            debt_exchange_rate: self.debt_exchange_rate,
            total_debt_shares: self.total_debt_shares,
            total_collateral: self.total_collateral,
            account: *account,
            position: self.position(account),
        };
        let ledger = ctx.ledger.clone();
        let events = ctx.events.clone();

        let result = op(self, ctx);
        if let Err(e) = &result {
            warn!(account = %account.short(), error = %e, "engine operation rolled back");
            self.clock = checkpoint.clock;
            self.debt_exchange_rate = checkpoint.debt_exchange_rate;
            self.total_debt_shares = checkpoint.total_debt_shares;
            self.total_collateral = checkpoint.total_collateral;
            self.set_position(checkpoint.account, checkpoint.position);
            *ctx.ledger = ledger;
            *ctx.events = events;
        }
        result
    }
}

//! Protocol State Machine - Core orchestration engine.
//!
//! `Protocol` owns every component and is the transactional call boundary:
//! each [`Operation`] runs against a snapshot of the whole state, and a failed
//! operation leaves no trace. Component calls already order their work as
//! accrue, commit, validate, then move value; the snapshot additionally
//! covers effects in other components (ledger, reserve asset, event log) that
//! happened before a later step failed.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::config::ProtocolParams;
use crate::core::engine::{CollateralPosition, DebtEngine, EngineContext, LiquidationResult, SystemStats};
use crate::core::ledger::{Ledger, VirtualBalance};
use crate::core::rates::RateController;
use crate::core::reserve::{NativeAsset, NativeBank};
use crate::core::staking::StakingVault;
use crate::error::{Error, Result};
use crate::oracle::Oracle;
use crate::protocol::events::EventLog;
use crate::protocol::operations::Operation;
use crate::swap::SwapPool;
use crate::utils::address::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Identities of the protocol's components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolAddresses {
    /// Owns the oracle and the rate controller
    pub admin: Address,
    pub engine: Address,
    pub vault: Address,
    pub rate_controller: Address,
    pub treasury: Address,
    pub swap_pool: Address,
}

impl ProtocolAddresses {
    /// Deterministic component addresses for `admin`
    pub fn derive(admin: Address) -> Self {
        let derive = |component: &str| {
            Address::from_label(&format!("vndt/{}/{}", admin.to_hex(), component))
        };
        Self {
            admin,
            engine: derive("engine"),
            vault: derive("vault"),
            rate_controller: derive("rate-controller"),
            treasury: derive("treasury"),
            swap_pool: derive("swap-pool"),
        }
    }

    /// Whether `account` is one of the protocol's own contract identities
    pub fn is_component(&self, account: &Address) -> bool {
        [self.engine, self.vault, self.rate_controller, self.swap_pool].contains(account)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of any protocol operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationResult {
    /// Nothing to report beyond success
    Done,
    /// Shares issued (debt shares for a mint, vault shares for a stake)
    Shares(u128),
    /// Amount paid out or repaid
    Amount(u128),
    /// Liquidation outcome
    Liquidation(LiquidationResult),
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROTOCOL
// ═══════════════════════════════════════════════════════════════════════════════

/// The assembled protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    params: ProtocolParams,
    addresses: ProtocolAddresses,
    oracle: Oracle,
    rates: RateController,
    ledger: Ledger,
    vault: StakingVault,
    engine: DebtEngine,
    swap: SwapPool,
    bank: NativeBank,
    events: EventLog,
    /// Time of the latest executed operation
    clock: u64,
}

impl Protocol {
    /// Assemble a protocol administered by `admin`, starting at `now`
    pub fn new(admin: Address, params: ProtocolParams, now: u64) -> Result<Self> {
        params.validate()?;
        if admin.is_zero() {
            return Err(Error::InvalidParameter {
                name: "admin".into(),
                reason: "cannot be the zero address".into(),
            });
        }

        let addresses = ProtocolAddresses::derive(admin);
        Ok(Self {
            oracle: Oracle::new(admin, params.initial_eth_price),
            rates: RateController::new(admin, addresses.rate_controller),
            ledger: Ledger::new(addresses.engine).with_vault(addresses.vault),
            vault: StakingVault::new(
                addresses.vault,
                addresses.rate_controller,
                params.staking_rate_bps,
                now,
            ),
            engine: DebtEngine::new(
                addresses.engine,
                addresses.rate_controller,
                addresses.treasury,
                &params,
                now,
            ),
            swap: SwapPool::new(addresses.swap_pool),
            bank: NativeBank::new(),
            events: EventLog::new(),
            clock: now,
            params,
            addresses,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPERATION EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Execute `op` on behalf of `caller` at time `now`.
    ///
    /// Time never runs backwards: an earlier `now` is treated as the latest
    /// time already seen. On error every component is restored.
    pub fn execute(&mut self, caller: &Address, op: Operation, now: u64) -> Result<OperationResult> {
        let now = now.max(self.clock);
        let op_type = op.operation_type();
        let snapshot = self.clone();

        match self.dispatch(caller, op, now) {
            Ok(result) => {
                self.clock = now;
                debug!(op = op_type, caller = %caller.short(), now, "operation executed");
                Ok(result)
            }
            Err(e) => {
                *self = snapshot;
                warn!(op = op_type, caller = %caller.short(), error = %e, "operation failed; state restored");
                Err(e)
            }
        }
    }

    fn dispatch(&mut self, caller: &Address, op: Operation, now: u64) -> Result<OperationResult> {
        if !matches!(op, Operation::Accrue)
            && (caller.is_zero() || self.addresses.is_component(caller))
        {
            return Err(Error::NotAuthorized(format!(
                "{} cannot submit operations",
                caller.to_hex()
            )));
        }

        match op {
            Operation::AddCollateral { amount } => self
                .with_engine(now, |engine, ctx| engine.add_collateral(ctx, caller, amount))
                .map(|_| OperationResult::Done),
            Operation::WithdrawCollateral { amount } => self
                .with_engine(now, |engine, ctx| engine.withdraw_collateral(ctx, caller, amount))
                .map(|_| OperationResult::Done),
            Operation::MintVndt { amount } => self
                .with_engine(now, |engine, ctx| engine.mint_vndt(ctx, caller, amount))
                .map(OperationResult::Shares),
            Operation::RepayUpTo { amount } => self
                .with_engine(now, |engine, ctx| engine.repay_up_to(ctx, caller, amount))
                .map(OperationResult::Amount),
            Operation::Liquidate { user } => self
                .with_engine(now, |engine, ctx| engine.liquidate(ctx, caller, &user))
                .map(OperationResult::Liquidation),

            Operation::Stake { amount } => self
                .vault
                .stake(&mut self.ledger, &mut self.events, caller, amount, now)
                .map(OperationResult::Shares),
            Operation::Unstake { shares } => self
                .vault
                .unstake(&mut self.ledger, &mut self.events, caller, shares, now)
                .map(OperationResult::Amount),

            Operation::Transfer { to, amount } => self
                .ledger
                .transfer(caller, &to, amount)
                .map(|_| OperationResult::Done),
            Operation::Approve { spender, amount } => self
                .ledger
                .approve(caller, &spender, amount)
                .map(|_| OperationResult::Done),
            Operation::TransferFrom { from, to, amount } => self
                .ledger
                .transfer_from(caller, &from, &to, amount)
                .map(|_| OperationResult::Done),

            Operation::SetEthPrice { price } => self
                .oracle
                .set_eth_price(caller, price, now, &mut self.events)
                .map(|_| OperationResult::Done),
            Operation::UpdateBorrowRate { rate_bps } => self
                .rates
                .update_borrow_rate(caller, rate_bps, &mut self.engine, now, &mut self.events)
                .map(|_| OperationResult::Done),
            Operation::UpdateStakingRate { rate_bps } => self
                .rates
                .update_staking_rate(caller, rate_bps, &mut self.vault, now, &mut self.events)
                .map(|_| OperationResult::Done),

            Operation::AddLiquidity {
                eth_amount,
                vndt_amount,
            } => self
                .swap
                .add_liquidity(
                    &mut self.ledger,
                    &mut self.bank,
                    &mut self.events,
                    caller,
                    eth_amount,
                    vndt_amount,
                    now,
                )
                .map(|_| OperationResult::Done),
            Operation::SwapEthForVndt { eth_in, min_out } => self
                .swap
                .swap_eth_for_vndt(
                    &mut self.ledger,
                    &mut self.bank,
                    &mut self.events,
                    caller,
                    eth_in,
                    min_out,
                    now,
                )
                .map(OperationResult::Amount),
            Operation::SwapVndtForEth { vndt_in, min_out } => self
                .swap
                .swap_vndt_for_eth(
                    &mut self.ledger,
                    &mut self.bank,
                    &mut self.events,
                    caller,
                    vndt_in,
                    min_out,
                    now,
                )
                .map(OperationResult::Amount),

            Operation::Accrue => {
                self.engine.accrue_interest(now, &mut self.events);
                self.vault.accrue_interest(now, &mut self.events);
                Ok(OperationResult::Done)
            }
        }
    }

    fn with_engine<T>(
        &mut self,
        now: u64,
        op: impl FnOnce(&mut DebtEngine, &mut EngineContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut ctx = EngineContext {
            oracle: &self.oracle,
            ledger: &mut self.ledger,
            reserve: &mut self.bank,
            events: &mut self.events,
            now,
        };
        op(&mut self.engine, &mut ctx)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GENESIS / CLOCK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Create reserve-asset units for `account` (development faucet)
    pub fn faucet(&mut self, account: &Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Err(Error::zero_amount("faucet"));
        }
        self.bank.credit(account, amount)
    }

    /// Move the logical clock forward by `seconds`, returning the new time
    pub fn advance_clock(&mut self, seconds: u64) -> Result<u64> {
        self.clock = self.clock.checked_add(seconds).ok_or(Error::Overflow {
            operation: "clock advance".into(),
        })?;
        Ok(self.clock)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn addresses(&self) -> &ProtocolAddresses {
        &self.addresses
    }

    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn vault(&self) -> &StakingVault {
        &self.vault
    }

    pub fn engine(&self) -> &DebtEngine {
        &self.engine
    }

    pub fn swap(&self) -> &SwapPool {
        &self.swap
    }

    pub fn bank(&self) -> &NativeBank {
        &self.bank
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Time of the latest executed operation
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Current oracle price
    pub fn price(&self) -> u128 {
        self.oracle.get_eth_price()
    }

    /// Ledger balance, the vault's virtual balance included
    pub fn balance_of(&self, account: &Address) -> u128 {
        self.ledger.balance_of(account, &self.vault)
    }

    /// Ledger total supply, the vault's virtual balance included
    pub fn total_supply(&self) -> u128 {
        self.ledger.total_supply(&self.vault)
    }

    /// Reserve-asset balance
    pub fn reserve_balance_of(&self, account: &Address) -> u128 {
        self.bank.balance_of(account)
    }

    pub fn position(&self, user: &Address) -> CollateralPosition {
        self.engine.position(user)
    }

    /// Position ratio at the current oracle price
    pub fn position_ratio(&self, user: &Address) -> Result<u128> {
        self.engine.calculate_position_ratio(user, self.price())
    }

    pub fn is_liquidatable(&self, user: &Address) -> bool {
        self.engine.is_liquidatable(user, self.price())
    }

    /// Engine statistics at the current oracle price
    pub fn stats(&self) -> Result<SystemStats> {
        self.engine.system_stats(&self.ledger, &self.vault, self.price())
    }

    /// Check the cross-component accounting identities
    pub fn verify_invariants(&self) -> Result<()> {
        if !self.ledger.verify_supply_invariant() {
            return Err(Error::Internal("stored balances do not sum to stored supply".into()));
        }
        let vault_balance = self.balance_of(&self.addresses.vault);
        if vault_balance != self.vault.get_shares_value(self.vault.total_shares())? {
            return Err(Error::Internal(format!(
                "vault balance {} differs from its share value",
                vault_balance
            )));
        }
        let custody = self.bank.balance_of(&self.addresses.engine);
        if custody < self.engine.total_collateral() {
            return Err(Error::Internal(format!(
                "engine holds {} reserve units for {} of collateral",
                custody,
                self.engine.total_collateral()
            )));
        }
        let (pool_eth, pool_vndt) = self.swap.reserves();
        if self.bank.balance_of(&self.addresses.swap_pool) < pool_eth
            || self.ledger.stored_balance_of(&self.addresses.swap_pool) < pool_vndt
        {
            return Err(Error::Internal("swap pool reserves are not backed".into()));
        }
        Ok(())
    }

    /// Virtual balance reported for the vault address
    pub fn vault_balance(&self) -> u128 {
        self.vault.virtual_balance()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

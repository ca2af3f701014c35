//! Protocol events for state change notifications.
//!
//! Events are emitted for every committed state change so clients and tests
//! can observe what an operation did. Each event carries the literal fields
//! the operation computed; amounts are 18-decimal fixed point.

use serde::{Deserialize, Serialize};

use crate::utils::address::Address;
use crate::utils::constants::MAX_EVENTS;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Which share pool an accrual event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolKind {
    /// The debt engine's borrow pool
    Debt,
    /// The staking vault
    Staking,
}

/// All protocol event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// Reserve-asset collateral was added to a position
    CollateralAdded(CollateralEvent),
    /// Reserve-asset collateral was withdrawn from a position
    CollateralWithdrawn(CollateralEvent),
    /// Debt shares were issued against a mint
    DebtSharesMinted(DebtSharesEvent),
    /// Debt shares were burned by a repayment
    DebtSharesBurned(DebtSharesEvent),
    /// The engine's borrow rate changed
    BorrowRateUpdated(RateUpdatedEvent),
    /// The vault's staking rate changed
    StakingRateUpdated(RateUpdatedEvent),
    /// Pegged units were staked into the vault
    Staked(StakeEvent),
    /// Vault shares were redeemed
    Unstaked(StakeEvent),
    /// A pool's value grew through accrual
    InterestAccrued(InterestAccruedEvent),
    /// A position was liquidated
    Liquidated(LiquidationEvent),
    /// The oracle price changed
    PriceUpdated(PriceUpdatedEvent),
    /// Liquidity was added to the swap pool
    LiquidityAdded(LiquidityAddedEvent),
    /// A swap was executed
    Swapped(SwapEvent),
}

impl ProtocolEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CollateralAdded(_) => "CollateralAdded",
            Self::CollateralWithdrawn(_) => "CollateralWithdrawn",
            Self::DebtSharesMinted(_) => "DebtSharesMinted",
            Self::DebtSharesBurned(_) => "DebtSharesBurned",
            Self::BorrowRateUpdated(_) => "BorrowRateUpdated",
            Self::StakingRateUpdated(_) => "StakingRateUpdated",
            Self::Staked(_) => "Staked",
            Self::Unstaked(_) => "Unstaked",
            Self::InterestAccrued(_) => "InterestAccrued",
            Self::Liquidated(_) => "Liquidated",
            Self::PriceUpdated(_) => "PriceUpdated",
            Self::LiquidityAdded(_) => "LiquidityAdded",
            Self::Swapped(_) => "Swapped",
        }
    }
}

/// Collateral added or withdrawn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralEvent {
    /// Position owner
    pub user: Address,
    /// Reserve-asset amount
    pub amount: u128,
    /// Oracle price at the time of the change
    pub price: u128,
}

/// Debt shares minted or burned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSharesEvent {
    /// Position owner
    pub user: Address,
    /// Pegged-unit amount minted or repaid
    pub amount: u128,
    /// Debt shares issued or burned
    pub shares: u128,
}

/// Rate parameter change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateUpdatedEvent {
    /// New annual rate in basis points
    pub rate_bps: u128,
}

/// Stake or unstake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEvent {
    /// Staker
    pub user: Address,
    /// Pegged-unit amount moved
    pub amount: u128,
    /// Vault shares issued or redeemed
    pub shares: u128,
}

/// Interest crystallized into a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestAccruedEvent {
    /// Pool that accrued
    pub pool: PoolKind,
    /// Pool value after the accrual
    pub new_value: u128,
}

/// Liquidation of an unsafe position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    /// Liquidated position owner
    pub user: Address,
    /// Account that paid the debt
    pub liquidator: Address,
    /// Liquidator's share of the collateral value
    pub liquidator_reward: u128,
    /// Debt burned from the liquidator
    pub liquidated_debt: u128,
    /// Oracle price used
    pub price: u128,
}

/// Oracle price change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdatedEvent {
    /// New price
    pub price: u128,
}

/// Liquidity added to the swap pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityAddedEvent {
    /// Provider
    pub provider: Address,
    /// Reserve-asset amount added
    pub eth_amount: u128,
    /// Pegged-unit amount added
    pub vndt_amount: u128,
}

/// Swap executed against the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
    /// Trader
    pub trader: Address,
    /// True when the reserve asset was sold for pegged units
    pub eth_in: bool,
    /// Amount paid in
    pub amount_in: u128,
    /// Amount paid out
    pub amount_out: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// An event stamped with the time of the call that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Call timestamp (seconds)
    pub timestamp: u64,
    /// The event
    pub event: ProtocolEvent,
}

/// Bounded, append-only event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
    max_events: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create a new event log
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }

    /// Create a log that keeps at most `max_events` records
    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            records: Vec::new(),
            max_events,
        }
    }

    /// Append an event (pruning the oldest past capacity)
    pub fn emit(&mut self, timestamp: u64, event: ProtocolEvent) {
        self.records.push(EventRecord { timestamp, event });
        if self.records.len() > self.max_events {
            self.records.drain(0..self.records.len() - self.max_events);
        }
    }

    /// All retained records, oldest first
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Most recent event
    pub fn last(&self) -> Option<&ProtocolEvent> {
        self.records.last().map(|r| &r.event)
    }

    /// Events of one type
    pub fn of_type(&self, event_type: &str) -> Vec<&ProtocolEvent> {
        self.records
            .iter()
            .map(|r| &r.event)
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all events
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

//! Constant-product swap pool between the reserve asset and VNDT.
//!
//! `x * y = k` with a fixed 0.3% fee taken from the input. The pool is an
//! ordinary ledger holder: it has no privileged access to the accounting core.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::ledger::Ledger;
use crate::core::reserve::NativeAsset;
use crate::error::{Error, Result};
use crate::protocol::events::*;
use crate::utils::address::Address;
use crate::utils::constants::*;
use crate::utils::math::{mul_div, safe_add, safe_sub};

/// Output of a swap of `amount_in` against the given reserves, fee included
pub fn get_amount_out(amount_in: u128, reserve_in: u128, reserve_out: u128) -> Result<u128> {
    if amount_in == 0 {
        return Err(Error::zero_amount("swap input"));
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(Error::InsufficientLiquidity);
    }
    let in_with_fee = amount_in.checked_mul(SWAP_FEE_NUMERATOR).ok_or(Error::Overflow {
        operation: format!("{} * {}", amount_in, SWAP_FEE_NUMERATOR),
    })?;
    let denominator = reserve_in
        .checked_mul(SWAP_FEE_DENOMINATOR)
        .and_then(|scaled| scaled.checked_add(in_with_fee))
        .ok_or(Error::Overflow {
            operation: "swap denominator".into(),
        })?;
    mul_div(in_with_fee, reserve_out, denominator)
}

/// The swap pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapPool {
    address: Address,
    reserve_eth: u128,
    reserve_vndt: u128,
}

impl SwapPool {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            reserve_eth: 0,
            reserve_vndt: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// `(reserve asset, VNDT)` reserves
    pub fn reserves(&self) -> (u128, u128) {
        (self.reserve_eth, self.reserve_vndt)
    }

    /// Spot price in VNDT per reserve unit (18 decimals); 0 for an empty pool
    pub fn get_price(&self) -> Result<u128> {
        if self.reserve_eth == 0 {
            return Ok(0);
        }
        mul_div(self.reserve_vndt, PRECISION, self.reserve_eth)
    }

    /// Deposit both assets at any ratio
    pub(crate) fn add_liquidity(
        &mut self,
        ledger: &mut Ledger,
        reserve: &mut dyn NativeAsset,
        events: &mut EventLog,
        provider: &Address,
        eth_amount: u128,
        vndt_amount: u128,
        now: u64,
    ) -> Result<()> {
        if eth_amount == 0 || vndt_amount == 0 {
            return Err(Error::zero_amount("liquidity"));
        }
        let new_eth = safe_add(self.reserve_eth, eth_amount)?;
        let new_vndt = safe_add(self.reserve_vndt, vndt_amount)?;
        ensure_reserve_balance(reserve, provider, eth_amount)?;

        ledger.transfer(provider, &self.address, vndt_amount)?;
        reserve.transfer(provider, &self.address, eth_amount)?;
        self.reserve_eth = new_eth;
        self.reserve_vndt = new_vndt;

        events.emit(
            now,
            ProtocolEvent::LiquidityAdded(LiquidityAddedEvent {
                provider: *provider,
                eth_amount,
                vndt_amount,
            }),
        );
        info!(provider = %provider.short(), eth_amount, vndt_amount, "liquidity added");
        Ok(())
    }

    /// Sell `eth_in` reserve asset for at least `min_out` VNDT
    pub(crate) fn swap_eth_for_vndt(
        &mut self,
        ledger: &mut Ledger,
        reserve: &mut dyn NativeAsset,
        events: &mut EventLog,
        trader: &Address,
        eth_in: u128,
        min_out: u128,
        now: u64,
    ) -> Result<u128> {
        let amount_out = self.quote(eth_in, self.reserve_eth, self.reserve_vndt, min_out)?;
        let new_eth = safe_add(self.reserve_eth, eth_in)?;
        let new_vndt = safe_sub(self.reserve_vndt, amount_out)?;
        ensure_reserve_balance(reserve, trader, eth_in)?;

        reserve.transfer(trader, &self.address, eth_in)?;
        ledger.transfer(&self.address, trader, amount_out)?;
        self.reserve_eth = new_eth;
        self.reserve_vndt = new_vndt;

        self.emit_swap(events, trader, true, eth_in, amount_out, now);
        Ok(amount_out)
    }

    /// Sell `vndt_in` VNDT for at least `min_out` reserve asset
    pub(crate) fn swap_vndt_for_eth(
        &mut self,
        ledger: &mut Ledger,
        reserve: &mut dyn NativeAsset,
        events: &mut EventLog,
        trader: &Address,
        vndt_in: u128,
        min_out: u128,
        now: u64,
    ) -> Result<u128> {
        let amount_out = self.quote(vndt_in, self.reserve_vndt, self.reserve_eth, min_out)?;
        let new_vndt = safe_add(self.reserve_vndt, vndt_in)?;
        let new_eth = safe_sub(self.reserve_eth, amount_out)?;

        let before = ledger.clone();
        ledger.transfer(trader, &self.address, vndt_in)?;
        if let Err(e) = reserve.transfer(&self.address, trader, amount_out) {
            *ledger = before;
            return Err(e);
        }
        self.reserve_eth = new_eth;
        self.reserve_vndt = new_vndt;

        self.emit_swap(events, trader, false, vndt_in, amount_out, now);
        Ok(amount_out)
    }

    fn quote(&self, amount_in: u128, reserve_in: u128, reserve_out: u128, min_out: u128) -> Result<u128> {
        let amount_out = get_amount_out(amount_in, reserve_in, reserve_out)?;
        if amount_out == 0 || amount_out >= reserve_out {
            return Err(Error::InsufficientLiquidity);
        }
        if amount_out < min_out {
            return Err(Error::SlippageExceeded {
                output: amount_out,
                minimum: min_out,
            });
        }
        Ok(amount_out)
    }

    fn emit_swap(
        &self,
        events: &mut EventLog,
        trader: &Address,
        eth_in: bool,
        amount_in: u128,
        amount_out: u128,
        now: u64,
    ) {
        events.emit(
            now,
            ProtocolEvent::Swapped(SwapEvent {
                trader: *trader,
                eth_in,
                amount_in,
                amount_out,
            }),
        );
        info!(trader = %trader.short(), eth_in, amount_in, amount_out, "swap executed");
    }
}

fn ensure_reserve_balance(reserve: &dyn NativeAsset, account: &Address, amount: u128) -> Result<()> {
    let available = reserve.balance_of(account);
    if available < amount {
        return Err(Error::InsufficientBalance {
            required: amount,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reserve::NativeBank;

    fn minter() -> Address {
        Address::from_label("engine")
    }

    fn lp() -> Address {
        Address::from_label("lp")
    }

    fn trader() -> Address {
        Address::from_label("trader")
    }

    fn setup() -> (SwapPool, Ledger, NativeBank, EventLog) {
        let mut ledger = Ledger::new(minter());
        let mut bank = NativeBank::new();
        for account in [lp(), trader()] {
            ledger.mint_to(&minter(), &account, 100_000 * PRECISION).unwrap();
            bank.credit(&account, 100 * PRECISION).unwrap();
        }
        let mut pool = SwapPool::new(Address::from_label("pool"));
        let mut events = EventLog::new();
        pool.add_liquidity(
            &mut ledger,
            &mut bank,
            &mut events,
            &lp(),
            10 * PRECISION,
            25_000 * PRECISION,
            0,
        )
        .unwrap();
        (pool, ledger, bank, events)
    }

    #[test]
    fn test_amount_out_formula() {
        // 1 in against 1000/1000: 997 * 1000 / (1000 * 1000 + 997)
        assert_eq!(get_amount_out(1, 1_000, 1_000).unwrap(), 0);
        assert_eq!(get_amount_out(100, 1_000, 1_000).unwrap(), 90);
        assert!(matches!(get_amount_out(1, 0, 1_000), Err(Error::InsufficientLiquidity)));
        assert!(matches!(get_amount_out(0, 1, 1), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_add_liquidity_sets_price() {
        let (pool, ledger, bank, _) = setup();
        assert_eq!(pool.reserves(), (10 * PRECISION, 25_000 * PRECISION));
        assert_eq!(pool.get_price().unwrap(), 2_500 * PRECISION);
        assert_eq!(ledger.stored_balance_of(&pool.address()), 25_000 * PRECISION);
        assert_eq!(bank.balance_of(&pool.address()), 10 * PRECISION);
    }

    #[test]
    fn test_swap_eth_for_vndt() {
        let (mut pool, mut ledger, mut bank, mut events) = setup();
        let expected = get_amount_out(PRECISION, 10 * PRECISION, 25_000 * PRECISION).unwrap();
        let out = pool
            .swap_eth_for_vndt(&mut ledger, &mut bank, &mut events, &trader(), PRECISION, 0, 1)
            .unwrap();

        assert_eq!(out, expected);
        assert!(out < 2_500 * PRECISION);
        assert_eq!(pool.reserves(), (11 * PRECISION, 25_000 * PRECISION - out));
        assert_eq!(ledger.stored_balance_of(&trader()), 100_000 * PRECISION + out);
        assert_eq!(bank.balance_of(&trader()), 99 * PRECISION);
    }

    #[test]
    fn test_swap_vndt_for_eth() {
        let (mut pool, mut ledger, mut bank, mut events) = setup();
        let out = pool
            .swap_vndt_for_eth(&mut ledger, &mut bank, &mut events, &trader(), 2_500 * PRECISION, 0, 1)
            .unwrap();

        assert!(out > 0 && out < PRECISION);
        assert_eq!(bank.balance_of(&trader()), 100 * PRECISION + out);
        assert_eq!(pool.reserves().1, 27_500 * PRECISION);
    }

    #[test]
    fn test_slippage_guard() {
        let (mut pool, mut ledger, mut bank, mut events) = setup();
        let err = pool
            .swap_eth_for_vndt(
                &mut ledger,
                &mut bank,
                &mut events,
                &trader(),
                PRECISION,
                2_500 * PRECISION,
                1,
            )
            .unwrap_err();
        assert!(matches!(err, Error::SlippageExceeded { .. }));
        assert_eq!(pool.reserves(), (10 * PRECISION, 25_000 * PRECISION));
    }

    #[test]
    fn test_swap_to_rejecting_trader_keeps_tokens() {
        let (mut pool, mut ledger, mut bank, mut events) = setup();
        bank.set_rejecting(&trader(), true);
        let err = pool
            .swap_vndt_for_eth(&mut ledger, &mut bank, &mut events, &trader(), 2_500 * PRECISION, 0, 1)
            .unwrap_err();

        assert!(matches!(err, Error::TransferFailed(_)));
        assert_eq!(ledger.stored_balance_of(&trader()), 100_000 * PRECISION);
        assert_eq!(ledger.stored_balance_of(&pool.address()), 25_000 * PRECISION);
        assert_eq!(pool.reserves(), (10 * PRECISION, 25_000 * PRECISION));
    }

    #[test]
    fn test_swap_without_funds_leaves_pool_unchanged() {
        let (mut pool, mut ledger, mut bank, mut events) = setup();
        let broke = Address::from_label("broke");
        let err = pool
            .swap_eth_for_vndt(&mut ledger, &mut bank, &mut events, &broke, PRECISION, 0, 1)
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert_eq!(pool.reserves(), (10 * PRECISION, 25_000 * PRECISION));
    }
}

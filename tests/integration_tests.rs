//! Integration tests for the VNDT protocol.
//!
//! Every scenario runs through `Protocol::execute`, the same boundary the CLI uses.

use proptest::prelude::*;

use vndt::prelude::*;
use vndt::storage::backend::InMemoryStore;
use vndt::storage::state::StateStore;
use vndt::utils::constants::{MIN_COLLATERAL_RATIO, SECONDS_PER_YEAR};

const T0: u64 = 1_700_000_000;
const YEAR: u64 = SECONDS_PER_YEAR as u64;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn admin() -> Address {
    Address::from_label("admin")
}

fn alice() -> Address {
    Address::from_label("alice")
}

fn bob() -> Address {
    Address::from_label("bob")
}

fn keeper() -> Address {
    Address::from_label("keeper")
}

fn wad(units: u128) -> u128 {
    units * PRECISION
}

fn create_protocol(params: ProtocolParams) -> Protocol {
    let mut protocol = Protocol::new(admin(), params, T0).unwrap();
    for user in [alice(), bob(), keeper()] {
        protocol.faucet(&user, wad(1_000_000)).unwrap();
    }
    protocol
}

/// Lock `collateral` and mint `amount` for `user`
fn borrow(protocol: &mut Protocol, user: &Address, collateral: u128, amount: u128, now: u64) {
    protocol
        .execute(user, Operation::AddCollateral { amount: collateral }, now)
        .unwrap();
    protocol
        .execute(user, Operation::MintVndt { amount }, now)
        .unwrap();
}

fn approve(protocol: &mut Protocol, owner: &Address, spender: Address, amount: u128) {
    let now = protocol.clock();
    protocol
        .execute(owner, Operation::Approve { spender, amount }, now)
        .unwrap();
}

fn stake(protocol: &mut Protocol, user: &Address, amount: u128, now: u64) -> u128 {
    let vault = protocol.addresses().vault;
    approve(protocol, user, vault, amount);
    match protocol.execute(user, Operation::Stake { amount }, now).unwrap() {
        OperationResult::Shares(shares) => shares,
        other => panic!("unexpected result {:?}", other),
    }
}

fn assert_vault_virtual(protocol: &Protocol) {
    let vault = protocol.addresses().vault;
    let expected = protocol
        .vault()
        .get_shares_value(protocol.vault().total_shares())
        .unwrap();
    assert_eq!(protocol.balance_of(&vault), expected);
    assert_eq!(protocol.ledger().stored_balance_of(&vault), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_mint_at_exact_minimum_ratio() {
    let mut protocol = create_protocol(ProtocolParams::default());
    assert_eq!(protocol.price(), wad(2_500));

    protocol
        .execute(&alice(), Operation::AddCollateral { amount: PRECISION }, T0)
        .unwrap();
    protocol
        .execute(&alice(), Operation::MintVndt { amount: 1_666_666_666_666_666_666_666 }, T0)
        .unwrap();
    assert_eq!(protocol.position_ratio(&alice()).unwrap(), 150);

    let err = protocol
        .execute(&alice(), Operation::MintVndt { amount: 1 }, T0)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnsafePositionRatio { current: 149, minimum: 150 }
    ));
    assert_eq!(protocol.balance_of(&alice()), 1_666_666_666_666_666_666_666);
}

#[test]
fn test_single_window_staking_yield() {
    let mut protocol = create_protocol(ProtocolParams::default().with_rates(500, 500));
    borrow(&mut protocol, &alice(), wad(1), wad(100), T0);

    stake(&mut protocol, &alice(), wad(100), T0);
    protocol.execute(&admin(), Operation::Accrue, T0 + YEAR).unwrap();

    assert_eq!(protocol.vault().total_value(), wad(105));
    assert_eq!(protocol.balance_of(&protocol.addresses().vault), wad(105));
    assert_eq!(protocol.vault().last_update(), T0 + YEAR);
}

#[test]
fn test_vault_balance_is_computed() {
    let mut protocol = create_protocol(ProtocolParams::default());
    borrow(&mut protocol, &alice(), wad(10), wad(1_000), T0);
    borrow(&mut protocol, &bob(), wad(10), wad(1_000), T0);

    stake(&mut protocol, &alice(), wad(300), T0);
    assert_vault_virtual(&protocol);
    stake(&mut protocol, &bob(), wad(200), T0 + 1_000);
    assert_vault_virtual(&protocol);

    protocol.execute(&admin(), Operation::Accrue, T0 + YEAR / 2).unwrap();
    assert_vault_virtual(&protocol);

    let shares = protocol.vault().shares_of(&alice()) / 3;
    protocol
        .execute(&alice(), Operation::Unstake { shares }, T0 + YEAR)
        .unwrap();
    assert_vault_virtual(&protocol);

    // tokens sent to the vault address are burned, not credited
    let vault = protocol.addresses().vault;
    let before = protocol.balance_of(&vault);
    protocol
        .execute(&bob(), Operation::Transfer { to: vault, amount: wad(10) }, T0 + YEAR)
        .unwrap();
    assert_eq!(protocol.balance_of(&vault), before);
    assert_vault_virtual(&protocol);
    assert!(protocol.verify_invariants().is_ok());
}

#[test]
fn test_zero_and_component_callers_cannot_mint() {
    let mut protocol = create_protocol(ProtocolParams::default());
    borrow(&mut protocol, &alice(), wad(10), wad(1_000), T0);
    stake(&mut protocol, &alice(), wad(500), T0);

    let mallory = Address::from_label("mallory");
    let supply = protocol.total_supply();
    let vault_balance = protocol.balance_of(&protocol.addresses().vault);
    let addresses = *protocol.addresses();

    for caller in [Address::ZERO, addresses.vault, addresses.engine, addresses.swap_pool] {
        let err = protocol
            .execute(&caller, Operation::Transfer { to: mallory, amount: wad(1) }, T0)
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthorized(_)));

        let err = protocol
            .execute(&caller, Operation::Approve { spender: mallory, amount: u128::MAX }, T0)
            .unwrap_err();
        assert!(matches!(err, Error::NotAuthorized(_)));
    }

    // an allowance over the vault cannot be spent either
    let err = protocol
        .execute(
            &mallory,
            Operation::TransferFrom { from: addresses.vault, to: mallory, amount: wad(1) },
            T0,
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotAuthorized(_)));

    assert_eq!(protocol.balance_of(&mallory), 0);
    assert_eq!(protocol.total_supply(), supply);
    assert_eq!(protocol.balance_of(&addresses.vault), vault_balance);
    assert_vault_virtual(&protocol);
    assert!(protocol.verify_invariants().is_ok());
}

#[test]
fn test_liquidation_splits_collateral() {
    let mut protocol = create_protocol(ProtocolParams::default());
    protocol
        .execute(&admin(), Operation::SetEthPrice { price: wad(2) }, T0)
        .unwrap();

    let user = Address::from_label("borrower");
    protocol.faucet(&user, wad(120)).unwrap();
    borrow(&mut protocol, &user, wad(120), wad(100), T0);
    borrow(&mut protocol, &keeper(), wad(1_000), wad(100), T0);

    protocol
        .execute(&admin(), Operation::SetEthPrice { price: wad(1) }, T0)
        .unwrap();
    assert_eq!(protocol.position_ratio(&user).unwrap(), 120);
    assert!(protocol.is_liquidatable(&user));

    let engine = protocol.addresses().engine;
    approve(&mut protocol, &keeper(), engine, wad(100));
    let result = match protocol
        .execute(&keeper(), Operation::Liquidate { user }, T0)
        .unwrap()
    {
        OperationResult::Liquidation(result) => result,
        other => panic!("unexpected result {:?}", other),
    };

    assert_eq!(result.liquidated_debt, wad(100));
    assert_eq!(result.collateral_value, wad(120));
    assert_eq!(result.liquidator_reward, wad(12));
    assert_eq!(result.protocol_reward, wad(108));

    assert!(protocol.position(&user).is_empty());
    assert_eq!(protocol.balance_of(&keeper()), 0);
    assert_eq!(protocol.reserve_balance_of(&keeper()), wad(1_000_000 - 1_000 + 12));
    assert_eq!(protocol.reserve_balance_of(&protocol.addresses().treasury), wad(108));
    assert_eq!(protocol.total_supply(), wad(100));
    assert_eq!(protocol.events().of_type("Liquidated").len(), 1);
    assert!(protocol.verify_invariants().is_ok());
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_bootstrap_issues_one_share_per_unit() {
    let mut protocol = create_protocol(ProtocolParams::default());
    protocol
        .execute(&alice(), Operation::AddCollateral { amount: wad(1) }, T0)
        .unwrap();
    let minted = protocol
        .execute(&alice(), Operation::MintVndt { amount: wad(700) }, T0)
        .unwrap();
    assert_eq!(minted, OperationResult::Shares(wad(700)));
    assert_eq!(protocol.engine().total_debt_value().unwrap(), wad(700));

    let shares = stake(&mut protocol, &alice(), wad(250), T0);
    assert_eq!(shares, wad(250));
    assert_eq!(protocol.vault().total_value(), wad(250));
}

#[test]
fn test_liquidation_gating() {
    let mut protocol = create_protocol(ProtocolParams::default());
    borrow(&mut protocol, &alice(), wad(1), wad(1_000), T0);
    borrow(&mut protocol, &keeper(), wad(10), wad(1_000), T0);

    let engine = protocol.addresses().engine;
    approve(&mut protocol, &keeper(), engine, u128::MAX);
    let events = protocol.events().len();

    let err = protocol
        .execute(&keeper(), Operation::Liquidate { user: alice() }, T0)
        .unwrap_err();
    assert!(matches!(err, Error::NotLiquidatable(_)));
    assert_eq!(protocol.position(&alice()).debt_shares, wad(1_000));
    assert_eq!(protocol.events().len(), events);

    // an empty position is never liquidatable either
    assert!(matches!(
        protocol.execute(&keeper(), Operation::Liquidate { user: bob() }, T0),
        Err(Error::NotLiquidatable(_))
    ));
}

#[test]
fn test_liquidation_without_allowance_rolls_back() {
    let mut protocol = create_protocol(ProtocolParams::default());
    borrow(&mut protocol, &alice(), wad(1), wad(1_600), T0);
    borrow(&mut protocol, &keeper(), wad(10), wad(2_000), T0);
    protocol
        .execute(&admin(), Operation::SetEthPrice { price: wad(2_000) }, T0)
        .unwrap();

    let position = protocol.position(&alice());
    let err = protocol
        .execute(&keeper(), Operation::Liquidate { user: alice() }, T0)
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientAllowance { .. }));
    assert_eq!(protocol.position(&alice()), position);
    assert_eq!(protocol.balance_of(&keeper()), wad(2_000));
    assert_eq!(protocol.engine().total_collateral(), wad(11));
}

#[test]
fn test_withdraw_respects_minimum_ratio() {
    let mut protocol = create_protocol(ProtocolParams::default());
    borrow(&mut protocol, &alice(), wad(3), wad(2_500), T0);

    // 2 units at 2500 back 5000 of value: exactly 200%
    protocol
        .execute(&alice(), Operation::WithdrawCollateral { amount: wad(1) }, T0)
        .unwrap();
    let err = protocol
        .execute(&alice(), Operation::WithdrawCollateral { amount: wad(1) }, T0)
        .unwrap_err();
    assert!(matches!(err, Error::UnsafePositionRatio { .. }));
    assert_eq!(protocol.position(&alice()).collateral, wad(2));
    assert_eq!(protocol.reserve_balance_of(&alice()), wad(1_000_000 - 2));
}

#[test]
fn test_borrow_interest_and_full_repayment() {
    let mut protocol = create_protocol(ProtocolParams::default().with_rates(500, 0));
    borrow(&mut protocol, &alice(), wad(2), wad(1_000), T0);
    borrow(&mut protocol, &bob(), wad(2), wad(100), T0);

    protocol.execute(&admin(), Operation::Accrue, T0 + YEAR).unwrap();
    assert_eq!(protocol.engine().current_debt_value(&alice()).unwrap(), wad(1_050));
    assert_eq!(protocol.events().of_type("InterestAccrued").len(), 1);

    protocol
        .execute(&bob(), Operation::Transfer { to: alice(), amount: wad(50) }, T0 + YEAR)
        .unwrap();
    let engine = protocol.addresses().engine;
    approve(&mut protocol, &alice(), engine, u128::MAX);

    let repaid = protocol
        .execute(&alice(), Operation::RepayUpTo { amount: u128::MAX }, T0 + YEAR)
        .unwrap();
    assert_eq!(repaid, OperationResult::Amount(wad(1_050)));
    assert_eq!(protocol.position(&alice()).debt_shares, 0);
    assert_eq!(protocol.balance_of(&alice()), 0);

    protocol
        .execute(&alice(), Operation::WithdrawCollateral { amount: wad(2) }, T0 + YEAR)
        .unwrap();
    assert!(protocol.position(&alice()).is_empty());

    // nothing left to repay
    let repaid = protocol
        .execute(&alice(), Operation::RepayUpTo { amount: wad(1) }, T0 + YEAR)
        .unwrap();
    assert_eq!(repaid, OperationResult::Amount(0));
}

#[test]
fn test_rate_updates_through_controller() {
    let mut protocol = create_protocol(ProtocolParams::default());
    protocol
        .execute(&admin(), Operation::UpdateBorrowRate { rate_bps: 800 }, T0)
        .unwrap();
    protocol
        .execute(&admin(), Operation::UpdateStakingRate { rate_bps: 450 }, T0)
        .unwrap();
    assert_eq!(protocol.engine().borrow_rate(), 800);
    assert_eq!(protocol.vault().staking_rate(), 450);

    assert!(matches!(
        protocol.execute(&admin(), Operation::UpdateBorrowRate { rate_bps: 10_001 }, T0),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(matches!(
        protocol.execute(&alice(), Operation::UpdateBorrowRate { rate_bps: 1 }, T0),
        Err(Error::NotAuthorized(_))
    ));
    assert_eq!(protocol.engine().borrow_rate(), 800);
}

#[test]
fn test_swap_round() {
    let mut protocol = create_protocol(ProtocolParams::default());
    borrow(&mut protocol, &alice(), wad(100), wad(50_000), T0);

    protocol
        .execute(
            &alice(),
            Operation::AddLiquidity { eth_amount: wad(10), vndt_amount: wad(25_000) },
            T0,
        )
        .unwrap();
    assert_eq!(protocol.swap().get_price().unwrap(), wad(2_500));

    let out = match protocol
        .execute(&bob(), Operation::SwapEthForVndt { eth_in: wad(1), min_out: 0 }, T0)
        .unwrap()
    {
        OperationResult::Amount(out) => out,
        other => panic!("unexpected result {:?}", other),
    };
    assert!(out > 0 && out < wad(2_500));
    assert_eq!(protocol.balance_of(&bob()), out);

    assert!(matches!(
        protocol.execute(&bob(), Operation::SwapEthForVndt { eth_in: wad(1), min_out: wad(2_500) }, T0),
        Err(Error::SlippageExceeded { .. })
    ));
    assert!(protocol.verify_invariants().is_ok());
}

#[test]
fn test_snapshot_persists_through_store() {
    let mut protocol = create_protocol(ProtocolParams::default());
    borrow(&mut protocol, &alice(), wad(1), wad(1_000), T0);
    stake(&mut protocol, &alice(), wad(400), T0);

    let store = StateStore::new(InMemoryStore::new());
    assert!(!store.is_initialized().unwrap());
    store.save(&protocol).unwrap();

    let restored = store.load().unwrap().unwrap();
    assert_eq!(restored.balance_of(&alice()), wad(600));
    assert_eq!(restored.vault().shares_of(&alice()), wad(400));
    assert_eq!(
        restored.balance_of(&restored.addresses().vault),
        protocol.balance_of(&protocol.addresses().vault)
    );
    assert!(restored.verify_invariants().is_ok());
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum VaultStep {
    Stake { alice: bool, amount: u128 },
    Unstake { alice: bool, percent: u128 },
    Accrue { elapsed: u64 },
}

fn vault_step() -> impl Strategy<Value = VaultStep> {
    prop_oneof![
        (any::<bool>(), 1u128..wad(1_000)).prop_map(|(alice, amount)| VaultStep::Stake { alice, amount }),
        (any::<bool>(), 1u128..=100).prop_map(|(alice, percent)| VaultStep::Unstake { alice, percent }),
        (0u64..YEAR).prop_map(|elapsed| VaultStep::Accrue { elapsed }),
    ]
}

#[derive(Debug, Clone)]
enum SolvencyStep {
    Mint(u128),
    Withdraw(u128),
    SetPrice(u128),
}

fn solvency_step() -> impl Strategy<Value = SolvencyStep> {
    prop_oneof![
        (1u128..wad(5_000)).prop_map(SolvencyStep::Mint),
        (1u128..wad(3)).prop_map(SolvencyStep::Withdraw),
        (wad(100)..wad(5_000)).prop_map(SolvencyStep::SetPrice),
    ]
}

proptest! {
    #[test]
    fn prop_stake_unstake_round_trip(amount in 1u128..wad(1_000_000)) {
        let mut protocol = create_protocol(ProtocolParams::default());
        borrow(&mut protocol, &alice(), wad(1_000), wad(1_000_000), T0);

        let shares = stake(&mut protocol, &alice(), amount, T0);
        prop_assert_eq!(shares, amount);
        let out = protocol.execute(&alice(), Operation::Unstake { shares }, T0).unwrap();
        prop_assert_eq!(out, OperationResult::Amount(amount));
        prop_assert_eq!(protocol.balance_of(&alice()), wad(1_000_000));
    }

    #[test]
    fn prop_exchange_rates_never_decrease(
        steps in prop::collection::vec((0u64..YEAR, 0u128..200), 1..20)
    ) {
        let mut protocol = create_protocol(ProtocolParams::default());
        borrow(&mut protocol, &alice(), wad(10), wad(5_000), T0);
        stake(&mut protocol, &alice(), wad(2_000), T0);

        let mut now = T0;
        let mut borrow_rate = protocol.engine().borrow_rate();
        let mut debt_rate = protocol.engine().debt_exchange_rate();
        let mut pool_value = protocol.vault().total_value();

        for (elapsed, raise) in steps {
            now += elapsed;
            if raise > 0 {
                borrow_rate = (borrow_rate + raise).min(10_000);
                protocol
                    .execute(&admin(), Operation::UpdateBorrowRate { rate_bps: borrow_rate }, now)
                    .unwrap();
            }
            protocol.execute(&admin(), Operation::Accrue, now).unwrap();

            prop_assert!(protocol.engine().debt_exchange_rate() >= debt_rate);
            prop_assert!(protocol.vault().total_value() >= pool_value);
            debt_rate = protocol.engine().debt_exchange_rate();
            pool_value = protocol.vault().total_value();
        }
    }

    #[test]
    fn prop_no_operation_ends_below_minimum_ratio(
        steps in prop::collection::vec(solvency_step(), 1..30)
    ) {
        let mut protocol = create_protocol(ProtocolParams::default());
        protocol
            .execute(&alice(), Operation::AddCollateral { amount: wad(3) }, T0)
            .unwrap();

        let mut now = T0;
        for step in steps {
            now += 3_600;
            let result = match step {
                SolvencyStep::Mint(amount) => {
                    protocol.execute(&alice(), Operation::MintVndt { amount }, now)
                }
                SolvencyStep::Withdraw(amount) => {
                    protocol.execute(&alice(), Operation::WithdrawCollateral { amount }, now)
                }
                SolvencyStep::SetPrice(price) => {
                    protocol.execute(&admin(), Operation::SetEthPrice { price }, now).unwrap();
                    continue;
                }
            };
            if result.is_ok() {
                prop_assert!(protocol.position_ratio(&alice()).unwrap() >= MIN_COLLATERAL_RATIO);
            }
            prop_assert!(protocol.verify_invariants().is_ok());
        }
    }

    #[test]
    fn prop_vault_balance_tracks_share_value(
        steps in prop::collection::vec(vault_step(), 1..30)
    ) {
        let mut protocol = create_protocol(ProtocolParams::default());
        borrow(&mut protocol, &alice(), wad(1_000), wad(500_000), T0);
        borrow(&mut protocol, &bob(), wad(1_000), wad(500_000), T0);
        let vault = protocol.addresses().vault;
        approve(&mut protocol, &alice(), vault, u128::MAX);
        approve(&mut protocol, &bob(), vault, u128::MAX);

        let mut now = T0;
        for step in steps {
            match step {
                VaultStep::Stake { alice: first, amount } => {
                    let user = if first { alice() } else { bob() };
                    let _ = protocol.execute(&user, Operation::Stake { amount }, now);
                }
                VaultStep::Unstake { alice: first, percent } => {
                    let user = if first { alice() } else { bob() };
                    let shares = protocol.vault().shares_of(&user) * percent / 100;
                    if shares > 0 {
                        protocol.execute(&user, Operation::Unstake { shares }, now).unwrap();
                    }
                }
                VaultStep::Accrue { elapsed } => {
                    now += elapsed;
                    protocol.execute(&admin(), Operation::Accrue, now).unwrap();
                }
            }

            let expected = protocol
                .vault()
                .get_shares_value(protocol.vault().total_shares())
                .unwrap();
            prop_assert_eq!(protocol.balance_of(&vault), expected);
            prop_assert_eq!(protocol.ledger().stored_balance_of(&vault), 0);
        }
    }
}

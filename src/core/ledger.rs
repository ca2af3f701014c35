//! The VNDT pegged-unit ledger.
//!
//! An ordinary transferable-balance ledger with one twist: the staking vault's
//! address holds no stored balance. Its balance is resolved on every read from
//! the vault's share accounting, and movements into or out of it burn or mint
//! stored supply instead of moving stored balance.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::*;

// ═══════════════════════════════════════════════════════════════════════════════
// BALANCE RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// A component whose ledger balance is computed rather than stored
pub trait VirtualBalance {
    /// Current computed balance
    fn virtual_balance(&self) -> u128;
}

/// How the balance of an account is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSource {
    /// Read from the stored balance map
    Stored,
    /// Computed from the vault's shares; the stored amount is ignored
    ComputedFromVault,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// The VNDT ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Decimal places
    pub decimals: u8,
    /// Only identity allowed to mint and burn-from (the debt engine)
    minter: Address,
    /// Account whose balance is virtual
    vault: Option<Address>,
    /// Sum of stored balances
    stored_total_supply: u128,
    /// Stored balances
    balances: HashMap<Address, u128>,
    /// owner -> spender -> remaining allowance
    allowances: HashMap<Address, HashMap<Address, u128>>,
}

impl Ledger {
    /// Create a ledger whose privileged mint/burn identity is `minter`
    pub fn new(minter: Address) -> Self {
        Self {
            name: "VNDT".to_string(),
            symbol: "VNDT".to_string(),
            decimals: 18,
            minter,
            vault: None,
            stored_total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Designate the account whose balance is computed from vault shares
    pub fn with_vault(mut self, vault: Address) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Privileged mint/burn identity
    pub fn minter(&self) -> Address {
        self.minter
    }

    /// Designated vault address, if any
    pub fn vault(&self) -> Option<Address> {
        self.vault
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// How `account`'s balance is resolved
    pub fn resolve(&self, account: &Address) -> BalanceSource {
        if self.vault.as_ref() == Some(account) {
            BalanceSource::ComputedFromVault
        } else {
            BalanceSource::Stored
        }
    }

    /// Reported balance of `account`
    pub fn balance_of(&self, account: &Address, vault: &impl VirtualBalance) -> u128 {
        match self.resolve(account) {
            BalanceSource::Stored => self.stored_balance_of(account),
            BalanceSource::ComputedFromVault => vault.virtual_balance(),
        }
    }

    /// Stored balance, ignoring the virtual overlay
    pub fn stored_balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Reported supply: stored supply with the vault's stored balance
    /// replaced by its computed balance
    pub fn total_supply(&self, vault: &impl VirtualBalance) -> u128 {
        match self.vault {
            None => self.stored_total_supply,
            Some(vault_address) => self
                .stored_total_supply
                .saturating_sub(self.stored_balance_of(&vault_address))
                .saturating_add(vault.virtual_balance()),
        }
    }

    /// Sum of stored balances
    pub fn stored_total_supply(&self) -> u128 {
        self.stored_total_supply
    }

    /// Remaining allowance of `spender` over `owner`'s balance
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Number of accounts with a stored balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Stored supply equals the sum of stored balances
    pub fn verify_supply_invariant(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b));
        sum == Some(self.stored_total_supply)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MOVEMENT PRIMITIVE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Move `value` from `from` to `to`.
    ///
    /// The zero address and the vault address are both "outside" the stored
    /// ledger: debiting either mints stored supply, crediting either burns it.
    /// So a transfer out of the vault is a pure mint to `to`, and a transfer
    /// into the vault is a pure burn from `from`. The vault's own accounting is
    /// responsible for the matching change in its computed balance.
    pub(crate) fn update(&mut self, from: &Address, to: &Address, value: u128) -> Result<()> {
        let mints = from.is_zero() || self.resolve(from) == BalanceSource::ComputedFromVault;
        let burns = to.is_zero() || self.resolve(to) == BalanceSource::ComputedFromVault;

        if !mints && !burns && from == to {
            return self.check_debit(from, value);
        }

        let mut supply = self.stored_total_supply;
        let mut debited = None;
        if mints {
            supply = safe_add(supply, value)?;
        } else {
            let available = self.stored_balance_of(from);
            if available < value {
                return Err(Error::InsufficientBalance {
                    required: value,
                    available,
                });
            }
            debited = Some(available - value);
        }

        let mut credited = None;
        if burns {
            supply = safe_sub(supply, value)?;
        } else {
            credited = Some(safe_add(self.stored_balance_of(to), value)?);
        }

        if let Some(balance) = debited {
            self.set_balance(*from, balance);
        }
        if let Some(balance) = credited {
            self.set_balance(*to, balance);
        }
        self.stored_total_supply = supply;
        debug!(from = %from.short(), to = %to.short(), value, "ledger update");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // USER OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Transfer from `caller` to `to`
    pub fn transfer(&mut self, caller: &Address, to: &Address, value: u128) -> Result<()> {
        if value == 0 {
            return Err(Error::zero_amount("transfer"));
        }
        if to.is_zero() {
            return Err(Error::InvalidRecipient("zero address".into()));
        }
        self.check_holder(caller)?;
        self.update(caller, to, value)
    }

    /// Set `spender`'s allowance over `owner`'s balance
    pub fn approve(&mut self, owner: &Address, spender: &Address, value: u128) -> Result<()> {
        if spender.is_zero() {
            return Err(Error::InvalidRecipient("zero spender".into()));
        }
        self.check_holder(owner)?;
        self.allowances.entry(*owner).or_default().insert(*spender, value);
        Ok(())
    }

    /// Transfer from `from` to `to` using `spender`'s allowance
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        value: u128,
    ) -> Result<()> {
        if value == 0 {
            return Err(Error::zero_amount("transfer"));
        }
        if to.is_zero() {
            return Err(Error::InvalidRecipient("zero address".into()));
        }
        self.check_holder(from)?;
        self.check_debit(from, value)?;
        self.spend_allowance(from, spender, value)?;
        self.update(from, to, value)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRIVILEGED OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Mint `amount` to `to`. Only the minter may call.
    pub fn mint_to(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<()> {
        self.only_minter(caller)?;
        if amount == 0 {
            return Err(Error::zero_amount("mint"));
        }
        if to.is_zero() || self.resolve(to) == BalanceSource::ComputedFromVault {
            return Err(Error::InvalidRecipient(to.to_hex()));
        }
        self.update(&Address::ZERO, to, amount)
    }

    /// Burn `amount` from `from` using the minter's allowance. Only the minter may call.
    pub fn burn_from(&mut self, caller: &Address, from: &Address, amount: u128) -> Result<()> {
        self.only_minter(caller)?;
        if amount == 0 {
            return Err(Error::zero_amount("burn"));
        }
        self.check_debit(from, amount)?;
        self.spend_allowance(from, caller, amount)?;
        self.update(from, &Address::ZERO, amount)
    }

    /// Pay `value` out of the vault's computed balance to `to`. Only the
    /// designated vault may call.
    pub(crate) fn release_from_vault(
        &mut self,
        caller: &Address,
        to: &Address,
        value: u128,
    ) -> Result<()> {
        if self.vault.as_ref() != Some(caller) {
            return Err(Error::NotAuthorized(format!(
                "{} is not the ledger vault",
                caller.to_hex()
            )));
        }
        if to.is_zero() || self.resolve(to) == BalanceSource::ComputedFromVault {
            return Err(Error::InvalidRecipient(to.to_hex()));
        }
        self.update(caller, to, value)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn only_minter(&self, caller: &Address) -> Result<()> {
        if *caller != self.minter {
            return Err(Error::NotAuthorized(format!(
                "{} is not the ledger minter",
                caller.to_hex()
            )));
        }
        Ok(())
    }

    /// User operations may only debit a stored balance. Debiting the zero
    /// address or the vault through `update` would mint.
    fn check_holder(&self, account: &Address) -> Result<()> {
        if account.is_zero() || self.resolve(account) == BalanceSource::ComputedFromVault {
            return Err(Error::NotAuthorized(format!(
                "{} cannot send from its own ledger balance",
                account.to_hex()
            )));
        }
        Ok(())
    }

    fn check_debit(&self, from: &Address, value: u128) -> Result<()> {
        if self.resolve(from) == BalanceSource::ComputedFromVault {
            return Ok(());
        }
        let available = self.stored_balance_of(from);
        if available < value {
            return Err(Error::InsufficientBalance {
                required: value,
                available,
            });
        }
        Ok(())
    }

    fn spend_allowance(&mut self, owner: &Address, spender: &Address, value: u128) -> Result<()> {
        let current = self.allowance(owner, spender);
        if current == u128::MAX {
            return Ok(());
        }
        if current < value {
            return Err(Error::InsufficientAllowance {
                required: value,
                available: current,
            });
        }
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, current - value);
        Ok(())
    }

    fn set_balance(&mut self, account: Address, value: u128) {
        if value == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, value);
        }
    }
}

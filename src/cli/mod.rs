//! VNDT Command Line Interface support.
//!
//! The binary keeps the protocol as a snapshot in the data directory; a
//! [`Workspace`] loads it, runs operations on the logical clock and saves it
//! back after every successful call.

pub mod config;
pub mod output;

pub use config::*;
pub use output::*;

use std::path::Path;

use crate::core::config::ProtocolParams;
use crate::error::{Error, Result};
use crate::protocol::operations::Operation;
use crate::protocol::state_machine::{OperationResult, Protocol};
use crate::storage::backend::FileStore;
use crate::storage::state::StateStore;
use crate::utils::address::Address;
use crate::utils::math::parse_wad;

// ═══════════════════════════════════════════════════════════════════════════════
// ARGUMENT PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// An account given as a 0x-hex address or as a label ("alice")
pub fn parse_account(input: &str) -> Result<Address> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidParameter {
            name: "account".into(),
            reason: "cannot be empty".into(),
        });
    }
    if input.starts_with("0x") {
        Address::from_hex(input)
    } else {
        Ok(Address::from_label(input))
    }
}

/// A decimal amount ("1.5") or the literal "max"
pub fn parse_amount(input: &str) -> Result<u128> {
    if input.eq_ignore_ascii_case("max") {
        return Ok(u128::MAX);
    }
    parse_wad(input)
}

// ═══════════════════════════════════════════════════════════════════════════════
// WORKSPACE
// ═══════════════════════════════════════════════════════════════════════════════

/// A protocol snapshot persisted in a data directory
pub struct Workspace {
    store: StateStore<FileStore>,
    protocol: Protocol,
}

impl Workspace {
    /// Create a fresh protocol in `data_dir`
    pub fn init(
        data_dir: &Path,
        admin: Address,
        params: ProtocolParams,
        now: u64,
        force: bool,
    ) -> Result<Self> {
        let store = StateStore::new(FileStore::new(data_dir)?);
        if store.is_initialized()? && !force {
            return Err(Error::Storage(format!(
                "{} already holds a protocol; use --force to replace it",
                data_dir.display()
            )));
        }

        let protocol = Protocol::new(admin, params, now)?;
        store.save(&protocol)?;
        Ok(Self { store, protocol })
    }

    /// Open the protocol saved in `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self> {
        let store = StateStore::new(FileStore::new(data_dir)?);
        let protocol = store.load()?.ok_or_else(|| {
            Error::Storage(format!(
                "no protocol in {}; run `vndt init` first",
                data_dir.display()
            ))
        })?;
        Ok(Self { store, protocol })
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Execute `op` at the current logical time and persist the result
    pub fn execute(&mut self, caller: &Address, op: Operation) -> Result<OperationResult> {
        let now = self.protocol.clock();
        let result = self.protocol.execute(caller, op, now)?;
        self.save()?;
        Ok(result)
    }

    /// Credit reserve asset to `account` and persist
    pub fn faucet(&mut self, account: &Address, amount: u128) -> Result<()> {
        self.protocol.faucet(account, amount)?;
        self.save()
    }

    /// Advance the logical clock, accrue both pools and persist
    pub fn advance_time(&mut self, seconds: u64) -> Result<u64> {
        let now = self.protocol.advance_clock(seconds)?;
        let admin = self.protocol.addresses().admin;
        self.protocol.execute(&admin, Operation::Accrue, now)?;
        self.save()?;
        Ok(now)
    }

    /// Persist the current snapshot
    pub fn save(&self) -> Result<()> {
        self.store.save(&self.protocol)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

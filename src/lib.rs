//! # VNDT Protocol
//!
//! A collateral-backed stable-value ledger. Users lock a reserve asset and
//! borrow VNDT against it, or deposit VNDT into a vault that accrues yield.
//!
//! ## Architecture
//!
//! - **Core**: the share-based accounting engine
//!   - `DebtEngine`: collateral positions, debt shares, liquidation
//!   - `StakingVault`: deposit shares with an accruing pool value
//!   - `Ledger`: VNDT balances, with the vault's balance computed from its shares
//! - **Oracle**, **RateController**, **SwapPool**: collaborators at the edge
//! - **Protocol**: the transactional boundary running every operation atomically
//! - **Storage** / **CLI**: snapshot persistence and the `vndt` binary
//!
//! ## Example
//!
//! ```rust,ignore
//! use vndt::prelude::*;
//!
//! let admin = Address::from_label("admin");
//! let alice = Address::from_label("alice");
//! let mut protocol = Protocol::new(admin, ProtocolParams::default(), 0)?;
//!
//! protocol.faucet(&alice, 10 * PRECISION)?;
//! protocol.execute(&alice, Operation::AddCollateral { amount: PRECISION }, 0)?;
//! protocol.execute(&alice, Operation::MintVndt { amount: 1_000 * PRECISION }, 0)?;
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, trivial_casts, unused_lifetimes)]

pub mod cli;
pub mod core;
pub mod error;
pub mod oracle;
pub mod protocol;
pub mod storage;
pub mod swap;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::ProtocolParams,
        engine::{CollateralPosition, DebtEngine, LiquidationResult, PositionStatus, SystemStats},
        ledger::{BalanceSource, Ledger, VirtualBalance},
        rates::RateController,
        reserve::{NativeAsset, NativeBank},
        staking::StakingVault,
    };
    pub use crate::error::{Error, Result};
    pub use crate::oracle::Oracle;
    pub use crate::protocol::{
        events::{EventLog, ProtocolEvent},
        operations::Operation,
        state_machine::{OperationResult, Protocol},
    };
    pub use crate::swap::SwapPool;
    pub use crate::utils::{
        address::Address,
        constants::PRECISION,
        math::{format_wad, parse_wad},
    };
}

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "VNDT";

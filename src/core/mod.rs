//! Core modules for the VNDT protocol.
//!
//! This module contains the accounting core:
//! - Configuration and protocol parameters
//! - The shared interest accrual primitive
//! - The pegged-unit ledger with the vault's virtual balance
//! - The staking vault
//! - The debt engine (collateral, debt shares, liquidation)
//! - Reserve-asset transfers and the rate controller

pub mod accrual;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod rates;
pub mod reserve;
pub mod staking;

pub use accrual::*;
pub use config::*;
pub use engine::*;
pub use ledger::*;
pub use rates::*;
pub use reserve::*;
pub use staking::*;

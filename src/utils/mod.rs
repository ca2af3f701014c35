//! Utility modules for the VNDT protocol.
//!
//! Shared pieces used across the accounting core:
//! - Account addresses
//! - Fixed-point arithmetic
//! - Constants

pub mod address;
pub mod constants;
pub mod math;

pub use address::*;
pub use constants::*;
pub use math::*;

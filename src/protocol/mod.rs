//! Protocol module - state machine and orchestration.
//!
//! This module provides the transactional boundary that runs every
//! VNDT operation atomically, plus the events those operations emit.

pub mod events;
pub mod operations;
pub mod state_machine;

pub use events::*;
pub use operations::*;
pub use state_machine::*;

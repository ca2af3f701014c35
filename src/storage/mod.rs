//! Storage module for persistent data management.
//!
//! The whole protocol is persisted as one bincode snapshot.
//!
//! ## Backends
//!
//! - **InMemoryStore**: Fast, ephemeral storage for testing
//! - **FileStore**: JSON file persistence, atomically replaced on flush
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vndt::storage::{FileStore, StateStore};
//!
//! let store = StateStore::new(FileStore::new("/path/to/data")?);
//! if let Some(protocol) = store.load()? {
//!     // ...
//!     store.save(&protocol)?;
//! }
//! ```

pub mod backend;
pub mod state;

pub use backend::*;
pub use state::*;

//! Protocol snapshot persistence.

use tracing::{debug, info};

use crate::error::Result;
use crate::protocol::state_machine::Protocol;
use crate::storage::backend::{StorageBackend, TypedStore};

/// Key under which the protocol snapshot is stored
pub const PROTOCOL_STATE_KEY: &[u8] = b"protocol/state";

/// Saves and loads whole-protocol snapshots
pub struct StateStore<B: StorageBackend> {
    store: TypedStore<B>,
}

impl<B: StorageBackend> StateStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            store: TypedStore::new(backend),
        }
    }

    /// Check if a snapshot has been saved
    pub fn is_initialized(&self) -> Result<bool> {
        self.store.exists(PROTOCOL_STATE_KEY)
    }

    /// Load the saved snapshot, if any
    pub fn load(&self) -> Result<Option<Protocol>> {
        let protocol: Option<Protocol> = self.store.get(PROTOCOL_STATE_KEY)?;
        if let Some(p) = &protocol {
            debug!(clock = p.clock(), "protocol snapshot loaded");
        }
        Ok(protocol)
    }

    /// Store `protocol` and flush it to the backend
    pub fn save(&self, protocol: &Protocol) -> Result<()> {
        self.store.set(PROTOCOL_STATE_KEY, protocol)?;
        self.store.flush()?;
        info!(clock = protocol.clock(), "protocol snapshot saved");
        Ok(())
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &B {
        self.store.backend()
    }
}

//! Connection registry implementation
//!
//! The central map of live connections shared by the acceptor, every
//! connection handler and the broadcast engine.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::entry::{ConnectionEntry, ConnectionId};
use super::error::RegistryError;

/// Central registry for all live connections
///
/// Thread-safe via `RwLock`. Mutations take the write lock, snapshots and
/// lookups the read lock. The lock is never held across network I/O.
pub struct ConnectionRegistry {
    /// Map of connection handle to entry
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a newly accepted connection
    pub async fn insert(
        &self,
        id: ConnectionId,
        entry: ConnectionEntry,
    ) -> Result<(), RegistryError> {
        let mut connections = self.connections.write().await;

        if connections.contains_key(&id) {
            return Err(RegistryError::DuplicateHandle(id));
        }

        tracing::debug!(
            connection_id = %id,
            peer = %entry.meta.peer_addr,
            total = connections.len() + 1,
            "Connection registered"
        );
        connections.insert(id, entry);

        Ok(())
    }

    /// Remove a connection, returning its entry if it was still registered
    ///
    /// Safe to call more than once for the same handle; only the first call
    /// observes the entry.
    pub async fn remove(&self, id: ConnectionId) -> Option<ConnectionEntry> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&id);

        if removed.is_some() {
            tracing::debug!(
                connection_id = %id,
                remaining = connections.len(),
                "Connection unregistered"
            );
        }

        removed
    }

    /// Set the display name of a registered connection
    ///
    /// An empty name clears it, leaving the connection unnamed.
    pub async fn update_name(
        &self,
        id: ConnectionId,
        name: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let mut connections = self.connections.write().await;

        let entry = connections
            .get_mut(&id)
            .ok_or(RegistryError::NotFound(id))?;
        let name = name.into();
        entry.meta.display_name = (!name.is_empty()).then_some(name);

        Ok(())
    }

    /// Point-in-time copy of every entry
    pub async fn snapshot(&self) -> Vec<(ConnectionId, ConnectionEntry)> {
        let connections = self.connections.read().await;

        connections
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    }

    /// Display name of a connection (None if unnamed or not registered)
    pub async fn display_name(&self, id: ConnectionId) -> Option<String> {
        let connections = self.connections.read().await;
        connections
            .get(&id)
            .and_then(|entry| entry.meta.display_name.clone())
    }

    /// Check if a connection is registered
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Check if no connections are registered
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Remove and return every entry in one step
    pub async fn drain(&self) -> Vec<(ConnectionId, ConnectionEntry)> {
        let mut connections = self.connections.write().await;
        connections.drain().collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

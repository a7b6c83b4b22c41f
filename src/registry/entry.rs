//! Connection entry types
//!
//! This module defines the per-connection state stored in the registry.

use std::net::SocketAddr;

use super::link::PeerLink;

/// Unique identifier for one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata for a live connection
#[derive(Debug, Clone)]
pub struct ConnectionMeta {
    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Display name set by `/join` (None until the peer joins)
    pub display_name: Option<String>,
}

impl ConnectionMeta {
    /// Metadata for a freshly accepted connection
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            display_name: None,
        }
    }
}

/// Entry for a single connection in the registry
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    /// Connection metadata
    pub meta: ConnectionMeta,

    /// Handle used to write to and close the connection
    pub link: PeerLink,
}

impl ConnectionEntry {
    /// Create a new entry with no display name
    pub fn new(peer_addr: SocketAddr, link: PeerLink) -> Self {
        Self {
            meta: ConnectionMeta::new(peer_addr),
            link,
        }
    }

    /// Display name, if the peer has joined
    pub fn display_name(&self) -> Option<&str> {
        self.meta.display_name.as_deref()
    }
}

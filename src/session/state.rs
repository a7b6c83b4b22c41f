//! Session state machine
//!
//! Tracks one connection from accept to close.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::registry::ConnectionId;

/// Session lifecycle state
///
/// Joining is metadata, not a phase: a connection may chat before it ever
/// joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Accepted, nothing read yet
    AwaitingFirstRead,
    /// At least one chunk received
    Active,
    /// Stream ended, errored, or was closed by the server
    Closed,
}

/// Handler-local session state
#[derive(Debug)]
pub struct SessionState {
    /// Connection handle
    pub id: ConnectionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Bytes read from the peer
    pub bytes_received: u64,

    /// Number of reads that returned data
    pub chunks_received: u64,

    /// Chat chunks relayed to other peers
    pub messages_relayed: u64,

    /// Join messages processed
    pub joins: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::AwaitingFirstRead,
            connected_at: Instant::now(),
            bytes_received: 0,
            chunks_received: 0,
            messages_relayed: 0,
            joins: 0,
        }
    }

    /// Record a non-empty read
    ///
    /// Ignored once the session is closed.
    pub fn on_read(&mut self, len: usize) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        self.phase = SessionPhase::Active;
        self.bytes_received += len as u64;
        self.chunks_received += 1;
    }

    /// Record a relayed chat chunk
    pub fn on_relay(&mut self) {
        self.messages_relayed += 1;
    }

    /// Record a processed join
    pub fn on_join(&mut self) {
        self.joins += 1;
    }

    /// Close the session
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Check if the session is closed
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

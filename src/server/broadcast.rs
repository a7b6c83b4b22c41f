//! Broadcast engine
//!
//! Fans one payload out to every registered connection except an optional
//! excluded one. A failed delivery removes and closes that peer only; the
//! remaining peers still receive the payload and the caller never sees the
//! failure.
//!
//! Delivery is sequential and unbuffered: a peer that stops reading stalls the
//! broadcasting task for as long as its write blocks, unless
//! [`ServerConfig::write_timeout`](super::ServerConfig::write_timeout) is set.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::registry::{ConnectionId, ConnectionRegistry, PeerLink};

/// Outcome of one broadcast call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers that received the full payload
    pub delivered: usize,
    /// Peers removed because delivery failed
    pub dropped: usize,
}

/// Fan-out delivery over the connection registry
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    write_timeout: Option<Duration>,
}

impl Broadcaster {
    /// Create a broadcaster with unbounded peer writes
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            write_timeout: None,
        }
    }

    /// Bound each peer write; a timeout counts as a failed delivery
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Deliver `payload` to every registered connection except `exclude`
    ///
    /// Every connection present when the snapshot is taken either receives
    /// the whole payload or is removed from the registry by this call.
    pub async fn broadcast(&self, payload: Bytes, exclude: Option<ConnectionId>) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (id, entry) in self.registry.snapshot().await {
            if Some(id) == exclude {
                continue;
            }

            match self.deliver(&entry.link, &payload).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.dropped += 1;

                    if self.registry.remove(id).await.is_some() {
                        tracing::debug!(
                            connection_id = %id,
                            peer = %entry.meta.peer_addr,
                            error = %e,
                            "Delivery failed, dropping connection"
                        );
                    }
                    entry.link.close().await;
                }
            }
        }

        tracing::trace!(
            bytes = payload.len(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Broadcast complete"
        );

        report
    }

    async fn deliver(&self, link: &PeerLink, payload: &[u8]) -> std::io::Result<()> {
        match self.write_timeout {
            Some(limit) => tokio::time::timeout(limit, link.send(payload))
                .await
                .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "peer write timed out"))?,
            None => link.send(payload).await,
        }
    }
}

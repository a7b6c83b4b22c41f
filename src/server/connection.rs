//! Per-connection handler
//!
//! Reads chunks from one client, applies `/join`, relays everything else and
//! cleans up after itself when the stream ends.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Result;
use crate::protocol::message::{chat_line, join_announcement, leave_announcement};
use crate::protocol::Inbound;
use crate::registry::{ConnectionId, PeerLink};
use crate::session::SessionState;

use super::ServerContext;

/// Handler for one accepted connection
pub struct Connection<R> {
    state: SessionState,
    reader: R,
    link: PeerLink,
    ctx: ServerContext,
}

impl<R> Connection<R>
where
    R: AsyncRead + Unpin,
{
    /// Create a handler. The connection must already be registered.
    pub fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        reader: R,
        link: PeerLink,
        ctx: ServerContext,
    ) -> Self {
        Self {
            state: SessionState::new(id, peer_addr),
            reader,
            link,
            ctx,
        }
    }

    /// Session state (phase and counters)
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run until the peer disconnects, the read fails, or the server closes
    /// the connection. Cleanup runs in every case; a read error is returned
    /// afterwards for logging.
    pub async fn run(&mut self) -> Result<()> {
        let result = self.read_loop().await;
        self.close().await;
        result
    }

    async fn read_loop(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.ctx.read_buffer_size.max(1)];

        loop {
            let n = tokio::select! {
                biased;
                _ = self.link.closed() => {
                    tracing::debug!(connection_id = %self.state.id, "Closed by server");
                    return Ok(());
                }
                read = self.reader.read(&mut buf) => read?,
            };

            if n == 0 {
                return Ok(());
            }

            self.state.on_read(n);
            self.handle_chunk(&buf[..n]).await;
        }
    }

    async fn handle_chunk(&mut self, chunk: &[u8]) {
        match Inbound::parse(chunk) {
            Inbound::Join(name) => self.handle_join(name).await,
            Inbound::Chat(data) => self.relay(data).await,
        }
    }

    async fn handle_join(&mut self, name: String) {
        let id = self.state.id;

        if let Err(e) = self.ctx.registry.update_name(id, name.clone()).await {
            // Removed concurrently; the connection is on its way out
            tracing::debug!(connection_id = %id, error = %e, "Join after removal");
            return;
        }

        self.state.on_join();
        tracing::info!(
            connection_id = %id,
            peer = %self.state.peer_addr,
            name = %name,
            "Peer joined"
        );

        let announcement = join_announcement(&name, self.state.peer_addr);
        self.ctx.broadcaster.broadcast(announcement, Some(id)).await;
    }

    async fn relay(&mut self, data: &[u8]) {
        let id = self.state.id;

        let payload = match self.ctx.registry.display_name(id).await {
            Some(name) => chat_line(&name, data),
            None => Bytes::copy_from_slice(data),
        };

        self.ctx.broadcaster.broadcast(payload, Some(id)).await;
        self.state.on_relay();
    }

    async fn close(&mut self) {
        let id = self.state.id;
        self.state.close();

        // Only the first remover sees the entry, so the departure is
        // announced at most once.
        let removed = self.ctx.registry.remove(id).await;
        if let Some(name) = removed.and_then(|entry| entry.meta.display_name) {
            self.ctx
                .broadcaster
                .broadcast(leave_announcement(&name), None)
                .await;
        }

        self.link.close().await;

        tracing::info!(
            connection_id = %id,
            peer = %self.state.peer_addr,
            duration_ms = self.state.duration().as_millis() as u64,
            bytes_received = self.state.bytes_received,
            messages_relayed = self.state.messages_relayed,
            "Connection closed"
        );
    }
}

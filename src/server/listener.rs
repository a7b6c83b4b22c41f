//! Chat server listener
//!
//! Handles the TCP accept loop, spawns connection handlers and performs the
//! server-wide shutdown.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::error::Result;
use crate::registry::{ConnectionEntry, ConnectionId, ConnectionRegistry, PeerLink};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::ServerContext;

/// Back-off after the process runs out of file descriptors
const FD_EXHAUSTED_BACKOFF: Duration = Duration::from_millis(100);

/// Chat server
///
/// Binding happens in [`ChatServer::bind`] so that bind failures surface
/// before the accept loop starts and so that an ephemeral port can be read
/// back with [`ChatServer::local_addr`].
pub struct ChatServer {
    config: ServerConfig,
    listener: TcpListener,
    ctx: ServerContext,
    next_connection_id: AtomicU64,
}

impl ChatServer {
    /// Bind the listening socket with a fresh registry
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::bind_with_registry(config, Arc::new(ConnectionRegistry::new())).await
    }

    /// Bind the listening socket over an existing registry
    pub async fn bind_with_registry(
        config: ServerConfig,
        registry: Arc<ConnectionRegistry>,
    ) -> Result<Self> {
        let socket = if config.bind_addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(config.reuse_addr)?;
        socket.bind(config.bind_addr)?;
        let listener = socket.listen(config.backlog)?;

        tracing::info!(addr = %listener.local_addr()?, "Chat server listening");

        Ok(Self {
            ctx: ServerContext::new(registry, &config),
            config,
            listener,
            next_connection_id: AtomicU64::new(1),
        })
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.ctx.registry
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server until a fatal accept error
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// When `shutdown` resolves (or the accept loop fails) every live
    /// connection is closed, the registry is cleared and the listener is
    /// dropped.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop() => result,
        };

        self.shutdown().await;

        result
    }

    async fn accept_loop(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) if is_transient_accept_error(&e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    if is_fd_exhaustion(&e) {
                        tokio::time::sleep(FD_EXHAUSTED_BACKOFF).await;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed, stopping server");
                    return Err(e.into());
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));

        tracing::info!(connection_id = %id, peer = %peer_addr, "Accepted connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(connection_id = %id, error = %e, "Failed to configure socket");
            return;
        }

        let (reader, writer) = socket.into_split();
        let link = PeerLink::new(writer);

        // Registered before the handler runs, so the connection can receive
        // broadcasts before its first read.
        let entry = ConnectionEntry::new(peer_addr, link.clone());
        if let Err(e) = self.ctx.registry.insert(id, entry).await {
            tracing::error!(connection_id = %id, error = %e, "Failed to register connection");
            return;
        }

        let ctx = self.ctx.clone();

        tokio::spawn(async move {
            let mut connection = Connection::new(id, peer_addr, reader, link, ctx);

            if let Err(e) = connection.run().await {
                tracing::debug!(connection_id = %id, error = %e, "Connection error");
            }
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }

    async fn shutdown(self) {
        tracing::info!("Shutting down server and closing connections");

        let drained = self.ctx.registry.drain().await;
        let count = drained.len();

        for (id, entry) in drained {
            entry.link.close().await;
            tracing::debug!(connection_id = %id, peer = %entry.meta.peer_addr, "Connection closed by shutdown");
        }

        drop(self.listener);

        tracing::info!(closed = count, "Server stopped");
    }
}

/// Accept errors that concern a single pending connection or a temporary
/// resource shortage rather than the listening socket itself
fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    ) || is_fd_exhaustion(e)
}

/// EMFILE / ENFILE
fn is_fd_exhaustion(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(23) | Some(24))
}

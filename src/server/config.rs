//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Enable SO_REUSEADDR on the listening socket
    pub reuse_addr: bool,

    /// Listen backlog
    pub backlog: u32,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Size of a single read from a client
    pub read_buffer_size: usize,

    /// Upper bound for one write to one peer (None = wait indefinitely)
    ///
    /// A peer whose write times out is treated like a failed delivery.
    pub write_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            reuse_addr: true,
            backlog: 1024,
            tcp_nodelay: true,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_timeout: None,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Resolve `host:port` and build a config bound to the first address found
    pub async fn resolve(host: &str, port: u16) -> Result<Self> {
        let addr = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| Error::AddressResolution {
                host: host.to_string(),
                port,
            })?;

        Ok(Self::with_addr(addr))
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the read buffer size (minimum 1 byte)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Bound each peer write
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Toggle TCP_NODELAY on accepted sockets
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

//! Chat server
//!
//! - [`ChatServer`]: accept loop and shutdown
//! - [`Connection`]: per-connection read loop
//! - [`Broadcaster`]: fan-out delivery over the registry

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod listener;

use std::sync::Arc;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::ChatServer;

use crate::registry::ConnectionRegistry;

/// Shared state handed to every connection handler
#[derive(Clone)]
pub struct ServerContext {
    /// Registry of live connections
    pub registry: Arc<ConnectionRegistry>,

    /// Broadcast engine over `registry`
    pub broadcaster: Broadcaster,

    /// Size of a single read from a client
    pub read_buffer_size: usize,
}

impl ServerContext {
    /// Build a context over `registry` using the settings in `config`
    pub fn new(registry: Arc<ConnectionRegistry>, config: &ServerConfig) -> Self {
        let broadcaster =
            Broadcaster::new(Arc::clone(&registry)).with_write_timeout(config.write_timeout);

        Self {
            registry,
            broadcaster,
            read_buffer_size: config.read_buffer_size,
        }
    }
}

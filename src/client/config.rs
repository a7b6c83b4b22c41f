//! Client configuration

use crate::protocol::constants::*;

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name or address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Display name sent as `/join {name}` right after connecting
    pub username: Option<String>,

    /// Size of a single read from the server
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CONNECT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a config for `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Join with this display name after connecting
    pub fn username(mut self, name: impl Into<String>) -> Self {
        self.username = Some(name.into());
        self
    }
}

//! Crate-wide error type

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the server and client entry points
///
/// Per-connection transport failures never show up here; they are absorbed
/// by the connection handler and the broadcast engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket-level failure (bind, listen, connect, fatal accept)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host/port pair did not resolve to any socket address
    #[error("Could not resolve address {host}:{port}")]
    AddressResolution { host: String, port: u16 },

    /// Operation attempted on a client whose connection is already gone
    #[error("Connection closed")]
    ConnectionClosed,
}

//! relay-chat: a TCP text-broadcast chat server and client
//!
//! The server accepts many concurrent connections and relays every chunk it
//! receives to every other connected peer. A peer may register a display name
//! with the in-band `/join {name}` message; its later messages are then
//! prefixed with `"{name}: "`.
//!
//! # Architecture
//!
//! ```text
//!   ChatServer (accept loop)
//!        │ insert entry, spawn
//!        ▼
//!   Connection ──update_name/remove──► ConnectionRegistry
//!        │                                   ▲
//!        └──broadcast()──► Broadcaster ──snapshot()
//!                               │
//!                               └──► PeerLink::send ──► TCP
//! ```
//!
//! There is no framing: one read on the server is relayed as one write to each
//! peer, whatever the transport happened to deliver.

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use client::{ChatClient, ClientConfig, ClientEvent};
pub use error::{Error, Result};
pub use registry::{ConnectionId, ConnectionRegistry};
pub use server::{Broadcaster, ChatServer, ServerConfig};

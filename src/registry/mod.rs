//! Connection registry
//!
//! The registry is the single shared record of live connections. The acceptor
//! inserts an entry for every accepted socket; connection handlers and the
//! broadcast engine remove, rename and snapshot entries concurrently.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<ConnectionRegistry>
//!                   ┌────────────────────────────┐
//!                   │ connections: HashMap<Id,   │
//!                   │   ConnectionEntry {        │
//!                   │     meta: peer, name,      │
//!                   │     link: PeerLink,        │
//!                   │   }                        │
//!                   │ >                          │
//!                   └─────────────┬──────────────┘
//!                                 │ snapshot()
//!                                 ▼
//!                     Broadcaster ──► link.send() ──► TCP
//! ```
//!
//! The lock only ever guards map operations. Snapshots clone the entries
//! (the link is reference-counted) so that writes to peers happen after the
//! lock has been released.

pub mod entry;
pub mod error;
pub mod link;
pub mod store;

pub use entry::{ConnectionEntry, ConnectionId, ConnectionMeta};
pub use error::RegistryError;
pub use link::PeerLink;
pub use store::ConnectionRegistry;

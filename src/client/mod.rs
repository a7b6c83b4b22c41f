//! Chat client
//!
//! Provides the client side of the chat protocol:
//! - Connecting and optionally joining with a display name
//! - Sending input lines verbatim
//! - A background receive loop that reports [`ClientEvent`]s

pub mod config;
pub mod connector;
pub mod input;

pub use config::ClientConfig;
pub use connector::{ChatClient, ClientEvent};
pub use input::{classify_input, render_incoming, InputAction};

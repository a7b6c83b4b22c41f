//! Chat wire protocol
//!
//! The wire format is a raw byte stream. The only in-band control message is
//! `/join {name}`; everything else is an ordinary chat chunk.

pub mod constants;
pub mod message;

pub use message::{decode, Decoded, Inbound};

//! Per-connection session tracking
//!
//! Holds the handler-local phase machine and counters for one connection.
//! Nothing here is shared; the registry owns the shared metadata.

pub mod state;

pub use state::{SessionPhase, SessionState};

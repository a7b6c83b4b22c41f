//! Registry error types

use thiserror::Error;

use super::entry::ConnectionId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Handle is already registered
    #[error("Connection already registered: {0}")]
    DuplicateHandle(ConnectionId),
    /// Handle is not (or no longer) registered
    #[error("Connection not found: {0}")]
    NotFound(ConnectionId),
}

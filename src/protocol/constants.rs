//! Protocol constants

/// Prefix of the join control message (case-sensitive)
pub const JOIN_PREFIX: &[u8] = b"/join ";

/// Local-only client command that closes the connection
pub const QUIT_COMMAND: &str = "/quit";

/// Default TCP port for both server and client
pub const DEFAULT_PORT: u16 = 12345;

/// Default server bind host (all interfaces)
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default host the client connects to
pub const DEFAULT_CONNECT_HOST: &str = "localhost";

/// Size of a single transport read
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Placeholder shown by the client for chunks that are not valid UTF-8
pub const BINARY_PLACEHOLDER: &str = "<binary data received>";

//! Local input handling and display of received chunks

use crate::protocol::constants::{BINARY_PLACEHOLDER, QUIT_COMMAND};
use crate::protocol::{decode, Decoded};

/// What to do with one line of user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction<'a> {
    /// Empty line, nothing to send
    Ignore,
    /// Close the connection
    Quit,
    /// Send the line verbatim
    Send(&'a str),
}

/// Classify a line of input (already stripped of its line terminator)
pub fn classify_input(line: &str) -> InputAction<'_> {
    if line.is_empty() {
        InputAction::Ignore
    } else if line.trim() == QUIT_COMMAND {
        InputAction::Quit
    } else {
        InputAction::Send(line)
    }
}

/// Text to show for a chunk received from the server
pub fn render_incoming(chunk: &[u8]) -> String {
    match decode(chunk) {
        Decoded::Text(text) => text.to_string(),
        Decoded::Raw(_) => BINARY_PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_empty() {
        assert_eq!(classify_input(""), InputAction::Ignore);
    }

    #[test]
    fn test_classify_quit() {
        assert_eq!(classify_input("/quit"), InputAction::Quit);
        assert_eq!(classify_input("  /quit "), InputAction::Quit);
    }

    #[test]
    fn test_classify_send_verbatim() {
        assert_eq!(classify_input("hello"), InputAction::Send("hello"));
        assert_eq!(classify_input("  spaced  "), InputAction::Send("  spaced  "));
        assert_eq!(classify_input("/quit now"), InputAction::Send("/quit now"));
        assert_eq!(classify_input("/join Bob"), InputAction::Send("/join Bob"));
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render_incoming(b"Alice: hi"), "Alice: hi");
    }

    #[test]
    fn test_render_binary() {
        assert_eq!(render_incoming(&[0xC3, 0x28]), "<binary data received>");
    }
}

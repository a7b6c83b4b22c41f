//! Inbound message interpretation and outbound line formatting

use std::borrow::Cow;
use std::net::SocketAddr;

use bytes::Bytes;

use super::constants::JOIN_PREFIX;

/// Result of best-effort text decoding of one chunk
///
/// Decoding never fails: bytes that are not valid UTF-8 are carried as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// The chunk is valid UTF-8
    Text(&'a str),
    /// The chunk is not valid UTF-8
    Raw(&'a [u8]),
}

impl<'a> Decoded<'a> {
    /// Text view of the chunk, with invalid sequences replaced by U+FFFD
    pub fn to_text_lossy(&self) -> Cow<'a, str> {
        match *self {
            Decoded::Text(text) => Cow::Borrowed(text),
            Decoded::Raw(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

/// Decode a chunk as UTF-8, falling back to the raw bytes
pub fn decode(chunk: &[u8]) -> Decoded<'_> {
    match std::str::from_utf8(chunk) {
        Ok(text) => Decoded::Text(text),
        Err(_) => Decoded::Raw(chunk),
    }
}

/// A chunk received from a client, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// `/join {name}`; the name is trimmed and may be empty
    Join(String),
    /// Anything else, relayed to the other peers
    Chat(&'a [u8]),
}

impl<'a> Inbound<'a> {
    /// Classify a chunk.
    ///
    /// The prefix is ASCII, so a byte-prefix match is the same as a text
    /// prefix match on the decoded chunk. The remainder is decoded lossily.
    pub fn parse(chunk: &'a [u8]) -> Self {
        match chunk.strip_prefix(JOIN_PREFIX) {
            Some(rest) => {
                let name = decode(rest).to_text_lossy();
                Inbound::Join(name.trim().to_string())
            }
            None => Inbound::Chat(chunk),
        }
    }
}

/// `-- {name} joined from {peer} --`
pub fn join_announcement(name: &str, peer_addr: SocketAddr) -> Bytes {
    Bytes::from(format!("-- {} joined from {} --", name, peer_addr))
}

/// `-- {name} left --`
pub fn leave_announcement(name: &str) -> Bytes {
    Bytes::from(format!("-- {} left --", name))
}

/// `{name}: {text}` with the chunk decoded best-effort
pub fn chat_line(name: &str, chunk: &[u8]) -> Bytes {
    Bytes::from(format!("{}: {}", name, decode(chunk).to_text_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_utf8() {
        assert_eq!(decode("héllo".as_bytes()), Decoded::Text("héllo"));
    }

    #[test]
    fn test_decode_invalid_utf8_falls_back() {
        let chunk = [0x68, 0x69, 0xFF, 0xFE];
        let decoded = decode(&chunk);

        assert_eq!(decoded, Decoded::Raw(&chunk));
        assert_eq!(decoded.to_text_lossy(), "hi\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_parse_join() {
        assert_eq!(
            Inbound::parse(b"/join Alice"),
            Inbound::Join("Alice".to_string())
        );
    }

    #[test]
    fn test_parse_join_trims_name() {
        assert_eq!(
            Inbound::parse(b"/join   Bob Smith \r\n"),
            Inbound::Join("Bob Smith".to_string())
        );
    }

    #[test]
    fn test_parse_join_empty_name() {
        assert_eq!(Inbound::parse(b"/join    "), Inbound::Join(String::new()));
    }

    #[test]
    fn test_parse_join_is_case_sensitive() {
        assert_eq!(Inbound::parse(b"/JOIN Alice"), Inbound::Chat(b"/JOIN Alice"));
    }

    #[test]
    fn test_parse_join_requires_space() {
        assert_eq!(Inbound::parse(b"/join"), Inbound::Chat(b"/join"));
        assert_eq!(Inbound::parse(b"/joinAlice"), Inbound::Chat(b"/joinAlice"));
    }

    #[test]
    fn test_parse_join_not_at_start() {
        assert_eq!(
            Inbound::parse(b"hello /join Alice"),
            Inbound::Chat(b"hello /join Alice")
        );
    }

    #[test]
    fn test_parse_join_with_invalid_utf8_name() {
        let mut chunk = b"/join Al".to_vec();
        chunk.push(0xFF);

        assert_eq!(
            Inbound::parse(&chunk),
            Inbound::Join("Al\u{FFFD}".to_string())
        );
    }

    #[test]
    fn test_announcements() {
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        assert_eq!(
            join_announcement("Alice", addr),
            Bytes::from_static(b"-- Alice joined from 127.0.0.1:40000 --")
        );
        assert_eq!(leave_announcement("Bob"), Bytes::from_static(b"-- Bob left --"));
    }

    #[test]
    fn test_chat_line() {
        assert_eq!(chat_line("Alice", b"hi"), Bytes::from_static(b"Alice: hi"));
        assert_eq!(
            chat_line("Alice", &[b'o', b'k', 0xFF]),
            Bytes::from("Alice: ok\u{FFFD}")
        );
    }
}

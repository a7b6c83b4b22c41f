//! Chat client connection
//!
//! High-level API for talking to a chat server: send lines, receive events.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

use super::config::ClientConfig;
use super::input::render_incoming;

/// Events from the background receive loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A chunk received from the server, rendered as text
    Message(String),

    /// The server closed the connection
    ServerClosed,

    /// Reading from the server failed
    ConnectionLost(String),
}

/// Connected chat client
///
/// # Example
/// ```no_run
/// use relay_chat::client::{ChatClient, ClientConfig, ClientEvent};
///
/// # async fn example() -> relay_chat::Result<()> {
/// let config = ClientConfig::new("localhost", 12345).username("Alice");
/// let (mut client, mut events) = ChatClient::connect(config).await?;
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// client.send("hello").await?;
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct ChatClient {
    writer: Option<OwnedWriteHalf>,
    local_addr: SocketAddr,
    receiver: JoinHandle<()>,
}

impl ChatClient {
    /// Connect to the server and start the receive loop.
    ///
    /// If the config carries a username, `/join {name}` is sent right away.
    /// Returns the client and a receiver for events.
    pub async fn connect(config: ClientConfig) -> Result<(Self, mpsc::Receiver<ClientEvent>)> {
        let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
        let local_addr = stream.local_addr()?;

        tracing::debug!(
            host = %config.host,
            port = config.port,
            local = %local_addr,
            "Connected to chat server"
        );

        let (reader, writer) = stream.into_split();
        let (tx, rx) = mpsc::channel(256);
        let receiver = tokio::spawn(receive_loop(reader, tx, config.read_buffer_size));

        let mut client = Self {
            writer: Some(writer),
            local_addr,
            receiver,
        };

        if let Some(name) = config.username.as_deref() {
            if let Err(e) = client.join(name).await {
                // The receive loop reports the broken connection
                tracing::debug!(error = %e, "Failed to send join");
            }
        }

        Ok((client, rx))
    }

    /// Local address of the connection
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Send `/join {name}`
    pub async fn join(&mut self, name: &str) -> Result<()> {
        self.send(&format!("/join {}", name)).await
    }

    /// Send a message verbatim (no newline appended)
    pub async fn send(&mut self, message: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::ConnectionClosed)?;

        if let Err(e) = writer.write_all(message.as_bytes()).await {
            self.writer = None;
            return Err(e.into());
        }

        Ok(())
    }

    /// Close the connection and stop the receive loop
    pub async fn close(mut self) {
        if let Some(mut writer) = self.writer.take() {
            // Peer may already be gone
            let _ = writer.shutdown().await;
        }
        self.receiver.abort();
    }
}

/// Read chunks until EOF or error, forwarding them as events
async fn receive_loop<R>(mut reader: R, events: mpsc::Sender<ClientEvent>, buffer_size: usize)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; buffer_size.max(1)];

    loop {
        let event = match reader.read(&mut buf).await {
            Ok(0) => {
                let _ = events.send(ClientEvent::ServerClosed).await;
                break;
            }
            Ok(n) => ClientEvent::Message(render_incoming(&buf[..n])),
            Err(e) => {
                let _ = events.send(ClientEvent::ConnectionLost(e.to_string())).await;
                break;
            }
        };

        if events.send(event).await.is_err() {
            // Nobody is listening anymore
            break;
        }
    }
}

//! Shared write/close handle for a connection

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Mutex};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Cloneable handle to the outbound half of a connection
///
/// The write half sits behind an async mutex so that two broadcasts never
/// interleave partial writes to the same peer. Closing the link aborts any
/// write in flight, shuts down the write half and wakes the connection's
/// handler, which then drops the read half during its normal cleanup.
#[derive(Clone)]
pub struct PeerLink {
    writer: Arc<Mutex<BoxedWriter>>,
    closed: Arc<watch::Sender<bool>>,
}

impl PeerLink {
    /// Wrap the write half of a connection
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (closed, _) = watch::channel(false);

        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            closed: Arc::new(closed),
        }
    }

    /// Write the full payload to the peer
    ///
    /// Fails with `ConnectionAborted` if the link is closed before or while
    /// the write is in progress.
    pub async fn send(&self, payload: &[u8]) -> std::io::Result<()> {
        tokio::select! {
            biased;
            _ = self.closed() => Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "connection closed",
            )),
            result = async {
                let mut writer = self.writer.lock().await;
                writer.write_all(payload).await?;
                writer.flush().await
            } => result,
        }
    }

    /// Close the connection, best-effort.
    ///
    /// Wakes every waiter, which also cancels writes blocked on a peer that
    /// stopped reading, then shuts down the write half.
    pub async fn close(&self) {
        self.closed.send_replace(true);

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::trace!(error = %e, "Ignoring error while closing connection");
        }
    }

    /// Check if `close` has been called
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives as long as `self`, so this only returns on close
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("handles", &Arc::strong_count(&self.writer))
            .finish()
    }
}

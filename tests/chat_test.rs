//! End-to-end tests over loopback TCP: relay, join, departure, client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relay_chat::{ChatClient, ChatServer, ClientConfig, ClientEvent, ConnectionRegistry, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(150);

/// Server running on an ephemeral loopback port
struct TestServer {
    addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<relay_chat::Result<()>>,
}

async fn start_test_server() -> TestServer {
    let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap());
    let server = ChatServer::bind(config).await.expect("Failed to bind");
    let addr = server.local_addr().unwrap();
    let registry = Arc::clone(server.registry());
    let (stop, stop_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));

    TestServer {
        addr,
        registry,
        stop,
        task,
    }
}

impl TestServer {
    /// Wait until exactly `count` connections are registered
    async fn wait_for_connections(&self, count: usize) {
        for _ in 0..200 {
            if self.registry.len().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} connections, registry has {}",
            count,
            self.registry.len().await
        );
    }

    /// Wait until the connection from `peer` carries `name`
    async fn wait_for_name(&self, peer: SocketAddr, name: &str) {
        for _ in 0..200 {
            let snapshot = self.registry.snapshot().await;
            let joined = snapshot
                .iter()
                .any(|(_, e)| e.meta.peer_addr == peer && e.display_name() == Some(name));
            if joined {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} never joined as {}", peer, name);
    }

    async fn stop(self) {
        let _ = self.stop.send(());
        self.task.await.unwrap().unwrap();
    }
}

/// Raw TCP participant that buffers whatever it receives
struct Peer {
    stream: TcpStream,
    pending: Vec<u8>,
}

impl Peer {
    async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.expect("Failed to connect"),
            pending: Vec::new(),
        }
    }

    fn addr(&self) -> SocketAddr {
        self.stream.local_addr().unwrap()
    }

    async fn send(&mut self, message: &str) {
        self.stream.write_all(message.as_bytes()).await.unwrap();
    }

    /// Consume exactly `expected` from the received bytes
    async fn expect(&mut self, expected: &str) {
        let mut buf = [0u8; 1024];
        while self.pending.len() < expected.len() {
            let n = tokio::time::timeout(RECV_TIMEOUT, self.stream.read(&mut buf))
                .await
                .unwrap_or_else(|_| {
                    panic!(
                        "timed out waiting for {:?}, have {:?}",
                        expected,
                        String::from_utf8_lossy(&self.pending)
                    )
                })
                .unwrap();
            assert!(n > 0, "connection closed while waiting for {:?}", expected);
            self.pending.extend_from_slice(&buf[..n]);
        }

        let head: Vec<u8> = self.pending.drain(..expected.len()).collect();
        assert_eq!(String::from_utf8_lossy(&head), expected);
    }

    /// Nothing buffered and nothing arrives for a short while
    async fn expect_silence(&mut self) {
        assert!(
            self.pending.is_empty(),
            "unexpected data: {:?}",
            String::from_utf8_lossy(&self.pending)
        );
        let mut buf = [0u8; 1024];
        if let Ok(read) = tokio::time::timeout(SILENCE_WINDOW, self.stream.read(&mut buf)).await {
            let n = read.unwrap();
            panic!("unexpected data: {:?}", String::from_utf8_lossy(&buf[..n]));
        }
    }
}

fn joined(name: &str, peer: &Peer) -> String {
    format!("-- {} joined from {} --", name, peer.addr())
}

/// Send `/join {name}` and wait until every other peer has the announcement
async fn join(server: &TestServer, peer: &mut Peer, name: &str, others: &mut [&mut Peer]) {
    peer.send(&format!("/join {}", name)).await;
    server.wait_for_name(peer.addr(), name).await;
    let announcement = joined(name, peer);
    for other in others.iter_mut() {
        other.expect(&announcement).await;
    }
}

#[tokio::test]
async fn test_unjoined_message_relayed_unprefixed() {
    let server = start_test_server().await;
    let mut c1 = Peer::connect(server.addr).await;
    let mut c2 = Peer::connect(server.addr).await;
    server.wait_for_connections(2).await;

    join(&server, &mut c1, "Alice", &mut [&mut c2]).await;

    c2.send("hello").await;
    c1.expect("hello").await;
    c2.expect_silence().await;

    server.stop().await;
}

#[tokio::test]
async fn test_joined_chat_and_departure() {
    let server = start_test_server().await;
    let mut c1 = Peer::connect(server.addr).await;
    let mut c2 = Peer::connect(server.addr).await;
    server.wait_for_connections(2).await;

    join(&server, &mut c1, "Alice", &mut [&mut c2]).await;
    join(&server, &mut c2, "Bob", &mut [&mut c1]).await;

    c1.send("hi").await;
    c2.expect("Alice: hi").await;

    let bob = c2.addr();
    drop(c2);

    c1.expect("-- Bob left --").await;
    server.wait_for_connections(1).await;
    let snapshot = server.registry.snapshot().await;
    assert!(snapshot.iter().all(|(_, e)| e.meta.peer_addr != bob));

    // Exactly one departure announcement
    c1.expect_silence().await;

    server.stop().await;
}

#[tokio::test]
async fn test_three_clients_no_prefix() {
    let server = start_test_server().await;
    let mut a = Peer::connect(server.addr).await;
    let mut b = Peer::connect(server.addr).await;
    let mut c = Peer::connect(server.addr).await;
    server.wait_for_connections(3).await;

    a.send("ping").await;

    b.expect("ping").await;
    c.expect("ping").await;
    a.expect_silence().await;
    b.expect_silence().await;
    c.expect_silence().await;

    server.stop().await;
}

#[tokio::test]
async fn test_every_message_reaches_every_other_client() {
    let server = start_test_server().await;
    let mut peers = Vec::new();
    for _ in 0..5 {
        peers.push(Peer::connect(server.addr).await);
    }
    server.wait_for_connections(5).await;

    // Peers 0, 2 and 4 join; 1 and 3 stay anonymous
    for i in (0..5).step_by(2) {
        let name = format!("user{}", i);
        let (before, rest) = peers.split_at_mut(i);
        let (sender, after) = rest.split_first_mut().unwrap();
        let mut others: Vec<&mut Peer> = before.iter_mut().chain(after.iter_mut()).collect();
        join(&server, sender, &name, &mut others).await;
    }

    for i in 0..5 {
        let body = format!("message from {}", i);
        peers[i].send(&body).await;

        let expected = if i % 2 == 0 {
            format!("user{}: {}", i, body)
        } else {
            body.clone()
        };
        for (j, peer) in peers.iter_mut().enumerate() {
            if j != i {
                peer.expect(&expected).await;
            }
        }
    }

    for peer in peers.iter_mut() {
        peer.expect_silence().await;
    }

    server.stop().await;
}

#[tokio::test]
async fn test_latest_join_wins() {
    let server = start_test_server().await;
    let mut c1 = Peer::connect(server.addr).await;
    let mut c2 = Peer::connect(server.addr).await;
    server.wait_for_connections(2).await;

    join(&server, &mut c1, "A", &mut [&mut c2]).await;
    join(&server, &mut c1, "B", &mut [&mut c2]).await;

    c1.send("after").await;
    c2.expect("B: after").await;

    // The /join lines themselves were never relayed
    c2.expect_silence().await;

    server.stop().await;
}

#[tokio::test]
async fn test_unjoined_departure_is_silent() {
    let server = start_test_server().await;
    let mut c1 = Peer::connect(server.addr).await;
    let c2 = Peer::connect(server.addr).await;
    server.wait_for_connections(2).await;

    drop(c2);
    server.wait_for_connections(1).await;

    c1.expect_silence().await;

    server.stop().await;
}

#[tokio::test]
async fn test_client_round_trip() {
    let server = start_test_server().await;
    let mut peer = Peer::connect(server.addr).await;
    server.wait_for_connections(1).await;

    let config = ClientConfig::new("127.0.0.1", server.addr.port()).username("Alice");
    let (mut client, mut events) = ChatClient::connect(config).await.unwrap();

    peer.expect(&format!("-- Alice joined from {} --", client.local_addr()))
        .await;

    client.send("hi there").await.unwrap();
    peer.expect("Alice: hi there").await;

    peer.send("welcome").await;
    let event = tokio::time::timeout(RECV_TIMEOUT, events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, ClientEvent::Message("welcome".to_string()));

    client.close().await;
    peer.expect("-- Alice left --").await;

    server.stop().await;
}

#[tokio::test]
async fn test_client_sees_server_shutdown() {
    let server = start_test_server().await;

    let config = ClientConfig::new("127.0.0.1", server.addr.port());
    let (_client, mut events) = ChatClient::connect(config).await.unwrap();
    server.wait_for_connections(1).await;

    let registry = Arc::clone(&server.registry);
    server.stop().await;
    assert!(registry.is_empty().await);

    let event = tokio::time::timeout(RECV_TIMEOUT, events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, ClientEvent::ServerClosed);
}

/// Read until the server closes the connection
async fn drain_to_eof(stream: &mut TcpStream) -> bool {
    let mut buf = vec![0u8; 64 * 1024];
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;
    drained.is_ok()
}

#[tokio::test]
async fn test_shutdown_closes_stalled_peer() {
    let server = start_test_server().await;

    // Never reads, with a small receive window so relayed data backs up
    let socket = TcpSocket::new_v4().unwrap();
    socket.set_recv_buffer_size(4096).unwrap();
    let mut stalled = socket.connect(server.addr).await.unwrap();
    let mut idle = TcpStream::connect(server.addr).await.unwrap();
    let mut flooder = TcpStream::connect(server.addr).await.unwrap();
    server.wait_for_connections(3).await;

    let flood = tokio::spawn(async move {
        let chunk = [b'x'; 4096];
        for _ in 0..16 * 1024 {
            if flooder.write_all(&chunk).await.is_err() {
                break;
            }
        }
    });

    // Let the relay to the stalled peer block mid-write
    tokio::time::sleep(Duration::from_millis(500)).await;

    tokio::time::timeout(Duration::from_secs(5), server.stop())
        .await
        .expect("shutdown should not wait on the stalled peer");

    // Whatever was buffered, then end of stream
    assert!(drain_to_eof(&mut stalled).await, "stalled peer was never closed");
    assert!(drain_to_eof(&mut idle).await, "idle peer was never closed");

    flood.abort();
}

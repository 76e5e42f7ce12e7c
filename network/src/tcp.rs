//! TCP transport.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::peer::{Direction, NewPeer, PeerHandle, PeerReader};
use crate::NetworkError;

/// Timeout for an outbound TCP connect.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Listens for inbound connections and dials outbound ones. Both kinds are
/// delivered to the node on the same `NewPeer` channel.
pub struct TcpTransport {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    peer_tx: mpsc::Sender<NewPeer>,
}

impl TcpTransport {
    /// Bind the listener. Use port 0 to let the OS pick one.
    pub async fn bind(addr: &str, peer_tx: mpsc::Sender<NewPeer>) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "P2P listener bound");
        Ok(Self {
            listener: Some(listener),
            local_addr,
            peer_tx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A dial-only handle sharing this transport's peer channel.
    pub fn dialer(&self) -> TcpTransport {
        TcpTransport {
            listener: None,
            local_addr: self.local_addr,
            peer_tx: self.peer_tx.clone(),
        }
    }

    /// Start accepting. Returns `None` if this handle has no listener (a
    /// dialer, or `start` was already called).
    pub fn start(&mut self, mut shutdown: broadcast::Receiver<()>) -> Option<JoinHandle<()>> {
        let listener = self.listener.take()?;
        let peer_tx = self.peer_tx.clone();
        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        tracing::info!("P2P listener shutting down");
                        break;
                    }
                    accepted = listener.accept() => match accepted {
                        Ok((stream, addr)) => {
                            tracing::debug!(peer = %addr, "accepted inbound connection");
                            if peer_tx.send(split(stream, addr, Direction::Inbound)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to accept connection"),
                    },
                }
            }
        }))
    }

    /// Dial `addr` and hand the connection to the node.
    pub async fn connect(&self, addr: &str) -> Result<SocketAddr, NetworkError> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| NetworkError::ConnectionFailed(format!("connection timed out to {addr}")))?
            .map_err(|e| NetworkError::ConnectionFailed(format!("TCP connect to {addr} failed: {e}")))?;
        let peer_addr = stream.peer_addr()?;
        self.peer_tx
            .send(split(stream, peer_addr, Direction::Outbound))
            .await
            .map_err(|_| NetworkError::ConnectionFailed("node is not accepting peers".into()))?;
        tracing::info!(peer = %peer_addr, "connected to peer");
        Ok(peer_addr)
    }
}

fn split(stream: TcpStream, addr: SocketAddr, direction: Direction) -> NewPeer {
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();
    NewPeer {
        handle: PeerHandle::tcp(addr, direction, write_half),
        reader: PeerReader::Tcp(read_half),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_loop::spawn_read_loop;
    use meridian_messages::{Message, MessageType};

    #[tokio::test]
    async fn dial_and_exchange_over_loopback() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (a_peers_tx, mut a_peers) = mpsc::channel(8);
        let (b_peers_tx, mut b_peers) = mpsc::channel(8);

        let mut a = TcpTransport::bind("127.0.0.1:0", a_peers_tx).await.unwrap();
        a.start(shutdown_tx.subscribe()).unwrap();
        let b = TcpTransport::bind("127.0.0.1:0", b_peers_tx).await.unwrap();

        b.connect(&a.local_addr().to_string()).await.unwrap();
        let inbound = a_peers.recv().await.unwrap();
        let outbound = b_peers.recv().await.unwrap();
        assert_eq!(inbound.handle.direction(), Direction::Inbound);
        assert_eq!(outbound.handle.direction(), Direction::Outbound);

        let (rpc_tx, mut rpc_rx) = mpsc::channel(8);
        let (dc_tx, mut dc_rx) = mpsc::channel(8);
        spawn_read_loop(inbound.handle.addr(), inbound.reader, rpc_tx, dc_tx);

        let msg = Message::new(MessageType::GetStatus, vec![]);
        outbound.handle.send(msg.clone()).unwrap();
        let rpc = rpc_rx.recv().await.unwrap();
        assert_eq!(rpc.message, msg);
        assert_eq!(rpc.from, inbound.handle.addr());

        drop(outbound);
        assert_eq!(dc_rx.recv().await, Some(inbound.handle.addr()));
        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn send_to_unread_socket_fills_queue_without_blocking() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (a_peers_tx, mut a_peers) = mpsc::channel(8);
        let (b_peers_tx, mut b_peers) = mpsc::channel(8);
        let mut a = TcpTransport::bind("127.0.0.1:0", a_peers_tx).await.unwrap();
        a.start(shutdown_tx.subscribe()).unwrap();
        let b = TcpTransport::bind("127.0.0.1:0", b_peers_tx).await.unwrap();

        b.connect(&a.local_addr().to_string()).await.unwrap();
        // Held open but never read.
        let _inbound = a_peers.recv().await.unwrap();
        let outbound = b_peers.recv().await.unwrap();

        let msg = Message::new(MessageType::Tx, vec![0; 64 * 1024]);
        let mut queued = 0;
        let err = loop {
            match outbound.handle.send(msg.clone()) {
                Ok(()) => queued += 1,
                Err(e) => break e,
            }
        };
        assert!(matches!(err, NetworkError::QueueFull(addr) if addr == a.local_addr()));
        assert_eq!(queued, crate::OUTBOUND_QUEUE);
        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn large_envelopes_hit_the_byte_bound_first() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (a_peers_tx, mut a_peers) = mpsc::channel(8);
        let (b_peers_tx, mut b_peers) = mpsc::channel(8);
        let mut a = TcpTransport::bind("127.0.0.1:0", a_peers_tx).await.unwrap();
        a.start(shutdown_tx.subscribe()).unwrap();
        let b = TcpTransport::bind("127.0.0.1:0", b_peers_tx).await.unwrap();

        b.connect(&a.local_addr().to_string()).await.unwrap();
        let _inbound = a_peers.recv().await.unwrap();
        let outbound = b_peers.recv().await.unwrap();

        let chunk = 4 * 1024 * 1024;
        let msg = Message::new(MessageType::Blocks, vec![0; chunk]);
        let mut queued = 0;
        while outbound.handle.send(msg.clone()).is_ok() {
            queued += 1;
        }
        assert_eq!(queued, crate::MAX_QUEUED_BYTES / chunk);
        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let (tx, _rx) = mpsc::channel(1);
        let t = TcpTransport::bind("127.0.0.1:0", tx).await.unwrap();
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let err = t.connect(&format!("127.0.0.1:{port}")).await.unwrap_err();
        assert!(matches!(err, NetworkError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn dialer_cannot_listen() {
        let (tx, _rx) = mpsc::channel(1);
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let t = TcpTransport::bind("127.0.0.1:0", tx).await.unwrap();
        let mut d = t.dialer();
        assert!(d.start(shutdown_tx.subscribe()).is_none());
        assert_eq!(d.local_addr(), t.local_addr());
    }
}

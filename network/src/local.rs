//! In-memory transport for deterministic tests.
//!
//! Peers are wired with channels instead of sockets but surface through the
//! same `NewPeer` channel and `PeerHandle` type as TCP peers, so the node
//! cannot tell them apart.

use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::peer::{Direction, NewPeer, PeerHandle, PeerReader};
use crate::NetworkError;

/// Buffered envelopes per direction per link.
const LINK_CAPACITY: usize = crate::peer::OUTBOUND_QUEUE;

#[derive(Clone)]
pub struct LocalTransport {
    addr: SocketAddr,
    peer_tx: mpsc::Sender<NewPeer>,
}

impl LocalTransport {
    pub fn new(addr: SocketAddr, peer_tx: mpsc::Sender<NewPeer>) -> Self {
        Self { addr, peer_tx }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Link `self` (outbound) to `other` (inbound). Each side receives a
    /// `NewPeer` naming the other's address.
    pub async fn connect(&self, other: &LocalTransport) -> Result<(), NetworkError> {
        let (to_other, other_inbox) = mpsc::channel(LINK_CAPACITY);
        let (to_self, self_inbox) = mpsc::channel(LINK_CAPACITY);

        let ours = NewPeer {
            handle: PeerHandle::local(other.addr, Direction::Outbound, to_other),
            reader: PeerReader::Local(self_inbox),
        };
        let theirs = NewPeer {
            handle: PeerHandle::local(self.addr, Direction::Inbound, to_self),
            reader: PeerReader::Local(other_inbox),
        };

        other
            .peer_tx
            .send(theirs)
            .await
            .map_err(|_| NetworkError::ConnectionFailed(format!("{} is not accepting peers", other.addr)))?;
        self.peer_tx
            .send(ours)
            .await
            .map_err(|_| NetworkError::ConnectionFailed(format!("{} is not accepting peers", self.addr)))?;
        Ok(())
    }
}

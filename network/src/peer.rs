//! Peer handles.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use meridian_messages::Message;
use meridian_protocol::write_frame;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::NetworkError;

/// Envelopes buffered per peer before sends start failing with
/// [`NetworkError::QueueFull`].
pub const OUTBOUND_QUEUE: usize = 256;

/// Payload bytes a TCP peer may have queued. A single envelope is always
/// accepted into an empty queue.
pub const MAX_QUEUED_BYTES: usize = 32 * 1024 * 1024;

/// A single frame write that takes longer than this closes the connection.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Who opened the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Sync progress with one peer, as tracked by the node.
///
/// `Connected → StatusExchanged → Syncing → Synced`; a peer that reports a
/// height at or below ours goes straight from `StatusExchanged` to `Synced`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerState {
    /// Socket is up, no `Status` received yet.
    Connected,
    StatusExchanged,
    /// Block requests are in flight.
    Syncing,
    Synced,
}

/// Write side of a connection. Cheap to clone.
///
/// Sending only enqueues: TCP frames are written by a per-peer writer task,
/// so a slow or stalled peer fills its own queue and never blocks the caller.
#[derive(Clone)]
pub struct PeerHandle {
    addr: SocketAddr,
    direction: Direction,
    outbound: mpsc::Sender<Message>,
    /// Payload bytes waiting on the writer task; TCP only.
    queued_bytes: Option<Arc<AtomicUsize>>,
}

impl PeerHandle {
    pub(crate) fn tcp(addr: SocketAddr, direction: Direction, writer: OwnedWriteHalf) -> Self {
        let (outbound, queue) = mpsc::channel(OUTBOUND_QUEUE);
        let queued_bytes = Arc::new(AtomicUsize::new(0));
        tokio::spawn(write_loop(addr, writer, queue, queued_bytes.clone()));
        Self {
            addr,
            direction,
            outbound,
            queued_bytes: Some(queued_bytes),
        }
    }

    pub(crate) fn local(addr: SocketAddr, direction: Direction, tx: mpsc::Sender<Message>) -> Self {
        Self {
            addr,
            direction,
            outbound: tx,
            queued_bytes: None,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Queue one envelope without waiting.
    ///
    /// Fails with `QueueFull` when the peer is not draining its queue
    /// (by envelope count, or for TCP by [`MAX_QUEUED_BYTES`]) and with
    /// `PeerDisconnected` once the writer side is gone.
    pub fn send(&self, message: Message) -> Result<(), NetworkError> {
        let size = message.data.len();
        if let Some(queued) = &self.queued_bytes {
            let before = queued.fetch_add(size, Ordering::AcqRel);
            if before > 0 && before + size > MAX_QUEUED_BYTES {
                queued.fetch_sub(size, Ordering::AcqRel);
                return Err(NetworkError::QueueFull(self.addr));
            }
        }
        self.outbound.try_send(message).map_err(|e| {
            if let Some(queued) = &self.queued_bytes {
                queued.fetch_sub(size, Ordering::AcqRel);
            }
            match e {
                TrySendError::Full(_) => NetworkError::QueueFull(self.addr),
                TrySendError::Closed(_) => NetworkError::PeerDisconnected(self.addr),
            }
        })
    }
}

impl std::fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerHandle")
            .field("addr", &self.addr)
            .field("direction", &self.direction)
            .finish()
    }
}

/// Drain `queue` onto the socket. Ends when every handle is dropped, on a
/// write error, or when a write stalls past [`WRITE_TIMEOUT`]; dropping the
/// write half then closes our side of the stream.
async fn write_loop(
    addr: SocketAddr,
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::Receiver<Message>,
    queued_bytes: Arc<AtomicUsize>,
) {
    while let Some(message) = queue.recv().await {
        let written = tokio::time::timeout(WRITE_TIMEOUT, write_frame(&mut writer, &message)).await;
        queued_bytes.fetch_sub(message.data.len(), Ordering::AcqRel);
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(peer = %addr, error = %e, "peer write failed");
                return;
            }
            Err(_) => {
                tracing::warn!(peer = %addr, "peer write timed out, closing");
                return;
            }
        }
    }
}

/// Read side of a connection, consumed by [`crate::spawn_read_loop`].
pub enum PeerReader {
    Tcp(OwnedReadHalf),
    Local(mpsc::Receiver<Message>),
}

/// A freshly established connection.
pub struct NewPeer {
    pub handle: PeerHandle,
    pub reader: PeerReader,
}

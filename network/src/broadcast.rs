//! Flood broadcasting to a snapshot of peers.

use std::net::SocketAddr;

use meridian_messages::Message;

use crate::peer::PeerHandle;

/// Outcome of a broadcast attempt.
#[derive(Clone, Debug, Default)]
pub struct BroadcastResult {
    /// Number of peers the message was queued for.
    pub sent: usize,
    /// Peers whose write failed; the caller should drop them.
    pub failed: Vec<SocketAddr>,
}

/// Queue `message` on every peer. Never waits on a slow peer; one whose
/// queue is full is reported as failed.
pub fn broadcast(peers: &[PeerHandle], message: &Message) -> BroadcastResult {
    let mut result = BroadcastResult::default();
    for peer in peers {
        match peer.send(message.clone()) {
            Ok(()) => result.sent += 1,
            Err(e) => {
                tracing::debug!(peer = %peer.addr(), error = %e, "broadcast send failed");
                result.failed.push(peer.addr());
            }
        }
    }
    result
}

//! Peer registry: the event loop's view of connected peers.
//!
//! Owned by the [`crate::Server`] task alone, so it needs no lock.

use std::collections::HashMap;
use std::net::SocketAddr;

use meridian_network::{PeerHandle, PeerState};
use tokio::task::JoinHandle;

pub struct PeerEntry {
    pub handle: PeerHandle,
    pub state: PeerState,
    /// Highest height the peer has claimed, via `Status` or a relayed block.
    pub reported_height: u64,
    /// Catch-up task requesting blocks from this peer.
    pub sync_task: Option<JoinHandle<()>>,
}

impl PeerEntry {
    /// Whether a catch-up task is still running against this peer.
    pub fn is_syncing(&self) -> bool {
        self.sync_task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

#[derive(Default)]
pub struct PeerRegistry {
    peers: HashMap<SocketAddr, PeerEntry>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer in `Connected` state. A previous entry for the same
    /// address is replaced (its writer is dropped, closing that half).
    pub fn insert(&mut self, handle: PeerHandle) {
        self.peers.insert(
            handle.addr(),
            PeerEntry {
                handle,
                state: PeerState::Connected,
                reported_height: 0,
                sync_task: None,
            },
        );
    }

    /// Drop a peer, stopping its catch-up task.
    pub fn remove(&mut self, addr: &SocketAddr) -> Option<PeerEntry> {
        let entry = self.peers.remove(addr)?;
        if let Some(task) = &entry.sync_task {
            task.abort();
        }
        Some(entry)
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&PeerEntry> {
        self.peers.get(addr)
    }

    pub fn get_mut(&mut self, addr: &SocketAddr) -> Option<&mut PeerEntry> {
        self.peers.get_mut(addr)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Handles of every peer except `skip`, for relaying.
    pub fn handles_except(&self, skip: Option<SocketAddr>) -> Vec<PeerHandle> {
        self.peers
            .values()
            .filter(|e| Some(e.handle.addr()) != skip)
            .map(|e| e.handle.clone())
            .collect()
    }
}

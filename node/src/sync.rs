//! Catch-up block requests.

use std::sync::Arc;
use std::time::Duration;

use meridian_ledger::Blockchain;
use meridian_messages::{GetBlocksMessage, Payload};
use meridian_network::{NetworkError, PeerHandle};
use meridian_protocol::encode_payload;
use tokio::task::JoinHandle;

use crate::shutdown::ShutdownController;

/// Ask `peer` for everything past our tip once per `interval` until the
/// ledger reaches `target`, a send fails, or shutdown.
///
/// Replies arrive through the normal RPC path; this task only requests.
pub fn spawn_sync_loop(
    peer: PeerHandle,
    ledger: Arc<Blockchain>,
    target: u64,
    interval: Duration,
    shutdown: ShutdownController,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let height = ledger.height();
            if height >= target {
                tracing::debug!(peer = %peer.addr(), height, "sync target reached");
                break;
            }

            let request = Payload::GetBlocks(GetBlocksMessage {
                from: height + 1,
                to: 0,
            });
            let message = match encode_payload(&request) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(peer = %peer.addr(), error = %e, "cannot encode sync request");
                    break;
                }
            };
            match peer.send(message) {
                Ok(()) => {}
                // Backlogged peer; try again next tick.
                Err(NetworkError::QueueFull(_)) => {
                    tracing::debug!(peer = %peer.addr(), "sync request deferred, queue full");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(peer = %peer.addr(), error = %e, "sync request failed");
                    break;
                }
            }
            tracing::debug!(peer = %peer.addr(), from = height + 1, target, "requested blocks");
        }
    })
}

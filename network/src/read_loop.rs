//! Per-peer read loops.

use std::net::SocketAddr;

use meridian_messages::Message;
use meridian_protocol::read_frame;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::peer::PeerReader;
use crate::NetworkError;

/// An envelope received from a peer.
#[derive(Clone, Debug)]
pub struct Rpc {
    pub from: SocketAddr,
    pub message: Message,
}

/// Spawn a task that forwards every envelope from `reader` to `rpc_tx`.
///
/// The loop ends on clean close, read error, malformed frame, or when the
/// node drops `rpc_tx`. Its last act is to report `addr` on `disconnect_tx`.
pub fn spawn_read_loop(
    addr: SocketAddr,
    reader: PeerReader,
    rpc_tx: mpsc::Sender<Rpc>,
    disconnect_tx: mpsc::Sender<SocketAddr>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = match reader {
            PeerReader::Tcp(mut half) => {
                tcp_read_loop(addr, &mut half, &rpc_tx).await
            }
            PeerReader::Local(mut rx) => {
                while let Some(message) = rx.recv().await {
                    if rpc_tx.send(Rpc { from: addr, message }).await.is_err() {
                        break;
                    }
                }
                Ok(())
            }
        };
        match &result {
            Ok(()) => tracing::info!(peer = %addr, "peer disconnected (clean close)"),
            Err(e) => tracing::warn!(peer = %addr, error = %e, "peer disconnected with error"),
        }
        let _ = disconnect_tx.send(addr).await;
    })
}

async fn tcp_read_loop(
    addr: SocketAddr,
    reader: &mut tokio::net::tcp::OwnedReadHalf,
    rpc_tx: &mpsc::Sender<Rpc>,
) -> Result<(), NetworkError> {
    while let Some(message) = read_frame(reader).await? {
        tracing::trace!(peer = %addr, msg_type = %message.header, "frame received");
        if rpc_tx.send(Rpc { from: addr, message }).await.is_err() {
            // Node is gone.
            break;
        }
    }
    Ok(())
}

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("peer {0} disconnected")]
    PeerDisconnected(SocketAddr),

    #[error("outbound queue for {0} is full")]
    QueueFull(SocketAddr),

    #[error("protocol error: {0}")]
    Protocol(#[from] meridian_protocol::ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! P2P networking layer for Meridian.
//!
//! Transports hand every new connection to the node as a [`NewPeer`]: a
//! cloneable [`PeerHandle`] for writing and a [`PeerReader`] that the node
//! turns into a read loop with [`spawn_read_loop`]. Read loops forward
//! decoded envelopes as [`Rpc`]s on a shared channel and report the peer's
//! address on a disconnect channel when they end.

pub mod broadcast;
pub mod error;
pub mod local;
pub mod peer;
pub mod read_loop;
pub mod tcp;

pub use broadcast::{broadcast, BroadcastResult};
pub use error::NetworkError;
pub use local::LocalTransport;
pub use peer::{
    Direction, NewPeer, PeerHandle, PeerReader, PeerState, MAX_QUEUED_BYTES, OUTBOUND_QUEUE,
};
pub use read_loop::{spawn_read_loop, Rpc};
pub use tcp::TcpTransport;

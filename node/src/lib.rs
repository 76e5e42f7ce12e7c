//! Meridian full node.
//!
//! [`MeridianNode`] assembles the ledger, mempool, stake registry and
//! proposer selector from a [`NodeConfig`], then [`MeridianNode::start`]
//! binds the P2P transport and REST server and spawns the [`Server`] event
//! loop that:
//! - exchanges `Status` with every new peer and catches up from taller ones
//! - validates, pools and relays transactions
//! - appends and relays blocks from peers and the REST API
//! - produces a block every `block_time_secs` when holding a validator key

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod peers;
pub mod server;
pub mod shutdown;
pub mod sync;

pub use bootstrap::dial_seeds;
pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{MeridianNode, RunningNode};
pub use peers::{PeerEntry, PeerRegistry};
pub use server::{Server, ServerChannels, ServerConfig, ServerContext};
pub use shutdown::ShutdownController;
pub use sync::spawn_sync_loop;

//! REST API for the Meridian node.
//!
//! Provides endpoints for:
//! - Transaction submission and the pending pool
//! - Block submission and lookup by height
//! - Stake registration and queries
//! - Node status and Prometheus metrics
//!
//! Reads go straight to the shared ledger, mempool and stake registry.
//! Writes that touch the ledger or mempool are forwarded to the node's event
//! loop as a [`LocalSubmission`] and answered over a oneshot channel.

pub mod error;
pub mod handlers;
pub mod server;
pub mod submission;

pub use error::RpcError;
pub use server::{router, RpcServer, RpcState};
pub use submission::{LocalSubmission, TxSubmitted};

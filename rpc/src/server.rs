//! Axum-based RPC server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use meridian_consensus::StakeRegistry;
use meridian_ledger::Blockchain;
use meridian_mempool::TxPool;
use prometheus::Registry;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use crate::error::RpcError;
use crate::handlers;
use crate::submission::LocalSubmission;

/// Everything the handlers share.
#[derive(Clone)]
pub struct RpcState {
    pub node_id: Arc<str>,
    pub submissions: mpsc::Sender<LocalSubmission>,
    pub mempool: Arc<TxPool>,
    pub stakes: Arc<StakeRegistry>,
    pub ledger: Arc<Blockchain>,
    pub registry: Registry,
}

pub fn router(state: RpcState) -> Router {
    Router::new()
        .route("/transactions", post(handlers::submit_transaction))
        .route("/transactions/pending", get(handlers::pending_transactions))
        .route("/blocks", post(handlers::submit_block))
        .route("/blocks/:height", get(handlers::block_by_height))
        .route("/stake", post(handlers::add_stake))
        .route("/stake/:address", get(handlers::get_stake))
        .route("/status", get(handlers::status))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

pub struct RpcServer {
    listener: TcpListener,
    state: RpcState,
}

impl RpcServer {
    pub async fn bind(addr: &str, state: RpcState) -> Result<Self, RpcError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {addr}: {e}")))?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        self.listener
            .local_addr()
            .map_err(|e| RpcError::Server(e.to_string()))
    }

    /// Serve until `shutdown` fires.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), RpcError> {
        let addr = self.local_addr()?;
        tracing::info!(addr = %addr, "RPC server listening");
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}

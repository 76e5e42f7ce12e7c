//! RPC request handlers.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use meridian_ledger::Block;
use meridian_transactions::Transaction;
use meridian_types::Address;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::RpcError;
use crate::server::RpcState;
use crate::submission::LocalSubmission;

// ── Transactions ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTransactionResponse {
    pub hash: String,
    /// `false` when the node already had it.
    pub accepted: bool,
}

pub async fn submit_transaction(
    State(state): State<RpcState>,
    Json(tx): Json<Transaction>,
) -> Result<(StatusCode, Json<SubmitTransactionResponse>), RpcError> {
    let (reply, rx) = oneshot::channel();
    state
        .submissions
        .send(LocalSubmission::Transaction { tx, reply })
        .await
        .map_err(|_| RpcError::NodeUnavailable)?;
    let submitted = rx
        .await
        .map_err(|_| RpcError::NodeUnavailable)?
        .map_err(RpcError::Rejected)?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitTransactionResponse {
            hash: submitted.hash.to_string(),
            accepted: submitted.new,
        }),
    ))
}

pub async fn pending_transactions(State(state): State<RpcState>) -> Json<Vec<Transaction>> {
    Json(state.mempool.pending())
}

// ── Blocks ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitBlockResponse {
    pub hash: String,
}

pub async fn submit_block(
    State(state): State<RpcState>,
    Json(block): Json<Block>,
) -> Result<(StatusCode, Json<SubmitBlockResponse>), RpcError> {
    let (reply, rx) = oneshot::channel();
    state
        .submissions
        .send(LocalSubmission::Block { block, reply })
        .await
        .map_err(|_| RpcError::NodeUnavailable)?;
    let hash = rx
        .await
        .map_err(|_| RpcError::NodeUnavailable)?
        .map_err(RpcError::Rejected)?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitBlockResponse {
            hash: hash.to_string(),
        }),
    ))
}

pub async fn block_by_height(
    State(state): State<RpcState>,
    Path(height): Path<u64>,
) -> Result<Json<Block>, RpcError> {
    Ok(Json(state.ledger.get_block(height)?))
}

// ── Stake ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    pub address: String,
    pub amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StakeResponse {
    pub address: String,
    pub amount: u64,
}

pub async fn add_stake(
    State(state): State<RpcState>,
    Json(req): Json<StakeRequest>,
) -> Result<Json<StakeResponse>, RpcError> {
    let address: Address = req.address.parse()?;
    let total = state.stakes.add_stake(address, req.amount);
    tracing::info!(address = %address, added = req.amount, total, "stake added");
    Ok(Json(StakeResponse {
        address: address.to_string(),
        amount: total,
    }))
}

pub async fn get_stake(
    State(state): State<RpcState>,
    Path(address): Path<String>,
) -> Result<Json<StakeResponse>, RpcError> {
    let address: Address = address.parse()?;
    let amount = state.stakes.get_stake(&address)?;
    Ok(Json(StakeResponse {
        address: address.to_string(),
        amount,
    }))
}

// ── Node ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub id: String,
    pub version: u32,
    pub height: u64,
    pub current_hash: String,
    pub pending: usize,
}

pub async fn status(State(state): State<RpcState>) -> Json<StatusResponse> {
    let summary = state.ledger.summary();
    Json(StatusResponse {
        id: state.node_id.to_string(),
        version: meridian_protocol::PROTOCOL_VERSION,
        height: summary.height,
        current_hash: summary.current_hash.to_string(),
        pending: state.mempool.pending_count(),
    })
}

pub async fn metrics(State(state): State<RpcState>) -> Result<impl IntoResponse, RpcError> {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&state.registry.gather(), &mut buf)
        .map_err(|e| RpcError::Server(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buf,
    ))
}

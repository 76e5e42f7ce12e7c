//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("node not available")]
    NodeUnavailable,

    #[error("server error: {0}")]
    Server(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::InvalidRequest(_) | RpcError::Rejected(_) => StatusCode::BAD_REQUEST,
            RpcError::NodeUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<meridian_ledger::LedgerError> for RpcError {
    fn from(e: meridian_ledger::LedgerError) -> Self {
        use meridian_ledger::LedgerError;
        match e {
            LedgerError::NotFound(_) | LedgerError::OutOfRange { .. } => {
                RpcError::NotFound(e.to_string())
            }
            other => RpcError::Server(other.to_string()),
        }
    }
}

impl From<meridian_consensus::ConsensusError> for RpcError {
    fn from(e: meridian_consensus::ConsensusError) -> Self {
        use meridian_consensus::ConsensusError;
        match e {
            ConsensusError::NotFound(_) => RpcError::NotFound(e.to_string()),
            other => RpcError::InvalidRequest(other.to_string()),
        }
    }
}

impl From<meridian_types::ParseError> for RpcError {
    fn from(e: meridian_types::ParseError) -> Self {
        RpcError::InvalidRequest(e.to_string())
    }
}

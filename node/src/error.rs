use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] meridian_ledger::LedgerError),

    #[error("transaction error: {0}")]
    Transaction(#[from] meridian_transactions::TransactionError),

    #[error("consensus error: {0}")]
    Consensus(#[from] meridian_consensus::ConsensusError),

    #[error("network error: {0}")]
    Network(#[from] meridian_network::NetworkError),

    #[error("protocol error: {0}")]
    Protocol(#[from] meridian_protocol::ProtocolError),

    #[error("store error: {0}")]
    Store(#[from] meridian_store::StoreError),

    #[error("RPC server error: {0}")]
    Rpc(#[from] meridian_rpc::RpcError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Duplicate deliveries that need no log noise.
    pub fn is_benign(&self) -> bool {
        matches!(self, NodeError::Ledger(e) if e.is_benign())
    }
}

//! Node assembly: builds the shared components from a [`NodeConfig`] and
//! wires them to the transport, the REST server and the event loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use meridian_consensus::{StakeRegistry, ValidatorSelector};
use meridian_crypto::derive_address;
use meridian_ledger::{create_genesis_block, Blockchain};
use meridian_mempool::TxPool;
use meridian_network::TcpTransport;
use meridian_rpc::{RpcServer, RpcState};
use meridian_store::BlockStore;
use meridian_types::KeyPair;
use tokio::task::JoinHandle;

use crate::bootstrap::dial_seeds;
use crate::config::NodeConfig;
use crate::metrics::NodeMetrics;
use crate::server::{Server, ServerConfig, ServerContext};
use crate::shutdown::ShutdownController;
use crate::NodeError;

/// A configured but not yet running node.
pub struct MeridianNode {
    pub config: NodeConfig,
    pub ledger: Arc<Blockchain>,
    pub mempool: Arc<TxPool>,
    pub stakes: Arc<StakeRegistry>,
    pub selector: Arc<ValidatorSelector>,
    pub metrics: Arc<NodeMetrics>,
    pub shutdown: ShutdownController,
    validator: Option<KeyPair>,
}

impl MeridianNode {
    /// Build the ledger over `store` and the in-memory components. A
    /// validator key registers `validator_stake` for its own address.
    pub fn new(config: NodeConfig, store: Arc<dyn BlockStore>) -> Result<Self, NodeError> {
        let genesis = create_genesis_block(&config.genesis()?);
        let ledger = Arc::new(Blockchain::new(genesis, store)?);
        let stakes = Arc::new(StakeRegistry::new());
        let validator = config.validator_keypair()?;

        if let Some(kp) = &validator {
            let address = derive_address(&kp.public);
            stakes.add_stake(address, config.validator_stake);
            tracing::info!(address = %address, stake = config.validator_stake, "validator key loaded");
        }

        Ok(Self {
            mempool: Arc::new(TxPool::new(config.mempool_capacity)),
            selector: Arc::new(ValidatorSelector::new(stakes.clone())),
            metrics: Arc::new(NodeMetrics::new()),
            shutdown: ShutdownController::new(),
            config,
            ledger,
            stakes,
            validator,
        })
    }

    pub fn is_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// Bind P2P (and REST if enabled), dial seeds and spawn the event loop.
    pub async fn start(self) -> Result<RunningNode, NodeError> {
        tracing::info!(
            id = %self.config.id,
            listen = %self.config.listen_address,
            height = self.ledger.height(),
            "Meridian node starting"
        );

        let server_config = ServerConfig {
            id: self.config.id.clone(),
            block_time: Duration::from_secs(self.config.block_time_secs.max(1)),
            sync_interval: Duration::from_secs(self.config.sync_interval_secs.max(1)),
        };
        let ctx = ServerContext {
            ledger: self.ledger.clone(),
            mempool: self.mempool.clone(),
            proposer: self.selector.clone(),
            metrics: self.metrics.clone(),
            shutdown: self.shutdown.clone(),
        };
        let (server, channels) = Server::with_channels(server_config, self.validator, ctx);

        let mut transport = TcpTransport::bind(&self.config.listen_address, channels.peers).await?;
        let p2p_addr = transport.local_addr();
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        if let Some(handle) = transport.start(self.shutdown.subscribe()) {
            tasks.push(handle);
        }

        let rpc_addr = if self.config.rpc_enabled {
            let state = RpcState {
                node_id: self.config.id.as_str().into(),
                submissions: channels.submissions,
                mempool: self.mempool.clone(),
                stakes: self.stakes.clone(),
                ledger: self.ledger.clone(),
                registry: self.metrics.registry.clone(),
            };
            let rpc = RpcServer::bind(&self.config.rpc_address, state).await?;
            let addr = rpc.local_addr()?;
            let shutdown = self.shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = rpc.serve(shutdown).await {
                    tracing::error!(error = %e, "RPC server failed");
                }
            }));
            Some(addr)
        } else {
            None
        };

        if !self.config.seed_nodes.is_empty() {
            // Join handle dropped: bootstrap runs detached.
            drop(dial_seeds(transport.dialer(), self.config.seed_nodes.clone()));
        }

        tasks.push(tokio::spawn(server.run()));

        Ok(RunningNode {
            p2p_addr,
            rpc_addr,
            ledger: self.ledger,
            mempool: self.mempool,
            stakes: self.stakes,
            dialer: transport,
            shutdown: self.shutdown,
            tasks,
        })
    }
}

/// A started node.
pub struct RunningNode {
    pub p2p_addr: SocketAddr,
    pub rpc_addr: Option<SocketAddr>,
    pub ledger: Arc<Blockchain>,
    pub mempool: Arc<TxPool>,
    pub stakes: Arc<StakeRegistry>,
    dialer: TcpTransport,
    shutdown: ShutdownController,
    tasks: Vec<JoinHandle<()>>,
}

impl RunningNode {
    /// Dial another node after startup.
    pub async fn connect(&self, addr: &str) -> Result<SocketAddr, NodeError> {
        Ok(self.dialer.connect(addr).await?)
    }

    pub fn shutdown_controller(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    /// Signal shutdown and wait for every task to finish.
    pub async fn stop(self) {
        self.shutdown.shutdown();
        for task in self.tasks {
            let _ = task.await;
        }
        tracing::info!("Meridian node stopped");
    }

    /// Wait for an external shutdown (e.g. the controller's signal handler).
    pub async fn wait(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

//! The node event loop.
//!
//! One task owns the peer registry and is the only caller of
//! `Blockchain::add_block` and mempool mutation for network and REST input.
//! Every external event (new connection, inbound RPC, REST submission,
//! disconnect, block-production tick, shutdown) is an arm of a single
//! `select!`, so those mutations are totally ordered.
//!
//! The loop never waits on a socket. Every outbound envelope goes onto the
//! peer's bounded queue; a peer whose queue is full or closed is dropped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use meridian_consensus::ProposerSelector;
use meridian_ledger::{fill_within_budget, Block, Blockchain, LedgerError, MAX_BLOCK_SIZE};
use meridian_mempool::TxPool;
use meridian_messages::{BlocksMessage, GetBlocksMessage, Message, Payload, StatusMessage};
use meridian_network::{broadcast, spawn_read_loop, NewPeer, PeerState, Rpc};
use meridian_protocol::{decode_payload, encode_payload, is_compatible, PROTOCOL_VERSION};
use meridian_rpc::{LocalSubmission, TxSubmitted};
use meridian_transactions::{validate_transaction, Transaction};
use meridian_types::{Hash, KeyPair};
use tokio::sync::{broadcast as bcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};

use crate::metrics::NodeMetrics;
use crate::peers::PeerRegistry;
use crate::shutdown::ShutdownController;
use crate::sync::spawn_sync_loop;
use crate::NodeError;

/// Inbound RPC and disconnect channel depth.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Advertised in `Status`.
    pub id: String,
    pub block_time: Duration,
    pub sync_interval: Duration,
}

/// Shared components the loop drives.
#[derive(Clone)]
pub struct ServerContext {
    pub ledger: Arc<Blockchain>,
    pub mempool: Arc<TxPool>,
    pub proposer: Arc<dyn ProposerSelector>,
    pub metrics: Arc<NodeMetrics>,
    pub shutdown: ShutdownController,
}

/// Senders that feed a [`Server`], for wiring transports and REST.
pub struct ServerChannels {
    pub peers: mpsc::Sender<NewPeer>,
    pub submissions: mpsc::Sender<LocalSubmission>,
}

pub struct Server {
    config: ServerConfig,
    /// Present on validator nodes; enables the production arm.
    validator: Option<KeyPair>,
    ctx: ServerContext,
    peers: PeerRegistry,
    new_peers: mpsc::Receiver<NewPeer>,
    submissions: mpsc::Receiver<LocalSubmission>,
    rpc_tx: mpsc::Sender<Rpc>,
    rpc_rx: mpsc::Receiver<Rpc>,
    disconnect_tx: mpsc::Sender<SocketAddr>,
    disconnect_rx: mpsc::Receiver<SocketAddr>,
    shutdown_rx: bcast::Receiver<()>,
}

impl Server {
    pub fn new(
        config: ServerConfig,
        validator: Option<KeyPair>,
        ctx: ServerContext,
        new_peers: mpsc::Receiver<NewPeer>,
        submissions: mpsc::Receiver<LocalSubmission>,
    ) -> Self {
        let (rpc_tx, rpc_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (disconnect_tx, disconnect_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let shutdown_rx = ctx.shutdown.subscribe();
        Self {
            config,
            validator,
            ctx,
            peers: PeerRegistry::new(),
            new_peers,
            submissions,
            rpc_tx,
            rpc_rx,
            disconnect_tx,
            disconnect_rx,
            shutdown_rx,
        }
    }

    /// Build a server along with the senders that feed it.
    pub fn with_channels(
        config: ServerConfig,
        validator: Option<KeyPair>,
        ctx: ServerContext,
    ) -> (Self, ServerChannels) {
        let (peer_tx, peer_rx) = mpsc::channel(64);
        let (sub_tx, sub_rx) = mpsc::channel(256);
        let server = Self::new(config, validator, ctx, peer_rx, sub_rx);
        (
            server,
            ServerChannels {
                peers: peer_tx,
                submissions: sub_tx,
            },
        )
    }

    /// Run until shutdown.
    pub async fn run(mut self) {
        let block_time = self.config.block_time;
        let mut block_timer = tokio::time::interval_at(Instant::now() + block_time, block_time);
        block_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let producing = self.validator.is_some();

        tracing::info!(
            id = %self.config.id,
            producing,
            height = self.ctx.ledger.height(),
            "event loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    tracing::info!("event loop shutting down");
                    break;
                }
                Some(peer) = self.new_peers.recv() => self.on_new_peer(peer),
                Some(addr) = self.disconnect_rx.recv() => self.on_disconnect(addr),
                Some(submission) = self.submissions.recv() => self.on_submission(submission),
                Some(rpc) = self.rpc_rx.recv() => self.on_rpc(rpc),
                _ = block_timer.tick(), if producing => self.produce_block(),
            }
        }
    }

    // ── Peers ───────────────────────────────────────────────────────────

    fn on_new_peer(&mut self, peer: NewPeer) {
        let NewPeer { handle, reader } = peer;
        let addr = handle.addr();
        tracing::info!(peer = %addr, direction = ?handle.direction(), "new peer");

        spawn_read_loop(addr, reader, self.rpc_tx.clone(), self.disconnect_tx.clone());
        self.peers.insert(handle);
        self.ctx.metrics.peer_count.set(self.peers.len() as i64);

        self.send_to(addr, &Payload::GetStatus);
    }

    fn on_disconnect(&mut self, addr: SocketAddr) {
        if self.peers.remove(&addr).is_some() {
            tracing::info!(peer = %addr, "peer removed");
            self.ctx.metrics.peer_count.set(self.peers.len() as i64);
        }
    }

    /// Direct reply. Only enqueues; a peer that cannot take it is dropped.
    fn send_to(&mut self, addr: SocketAddr, payload: &Payload) {
        let Some(entry) = self.peers.get(&addr) else {
            return;
        };
        let result = match encode_payload(payload) {
            Ok(message) => entry.handle.send(message).map_err(NodeError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(peer = %addr, msg_type = %payload.message_type(), error = %e, "send failed");
            self.on_disconnect(addr);
        }
    }

    /// Fan out to every peer except `origin`, dropping peers that fail.
    fn relay(&mut self, payload: &Payload, origin: Option<SocketAddr>) {
        let peers = self.peers.handles_except(origin);
        if peers.is_empty() {
            return;
        }
        let message: Message = match encode_payload(payload) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode relay payload");
                return;
            }
        };
        let result = broadcast(&peers, &message);
        tracing::debug!(msg_type = %message.header, sent = result.sent, failed = result.failed.len(), "relayed");
        for addr in result.failed {
            self.on_disconnect(addr);
        }
    }

    // ── Inbound ─────────────────────────────────────────────────────────

    fn on_rpc(&mut self, rpc: Rpc) {
        let Rpc { from, message } = rpc;
        let payload = match decode_payload(&message) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(peer = %from, msg_type = %message.header, error = %e, "undecodable message");
                return;
            }
        };

        match payload {
            Payload::Transaction(tx) => {
                if let Err(e) = self.process_transaction(tx, Some(from)) {
                    tracing::warn!(peer = %from, error = %e, "rejected transaction");
                }
            }
            Payload::Block(block) => match self.process_block(block, Some(from)) {
                Ok(()) => {}
                // A relayed block from past our tip means we missed some.
                Err(NodeError::Ledger(LedgerError::HeightMismatch { expected, actual }))
                    if actual > expected =>
                {
                    tracing::debug!(peer = %from, expected, actual, "block ahead of tip");
                    self.start_sync(from, actual - 1);
                }
                Err(e) => log_block_rejection(from, &e),
            },
            Payload::GetStatus => {
                let status = StatusMessage {
                    id: self.config.id.clone(),
                    version: PROTOCOL_VERSION,
                    current_height: self.ctx.ledger.height(),
                };
                self.send_to(from, &Payload::Status(status));
            }
            Payload::Status(status) => self.on_status(from, status),
            Payload::GetBlocks(req) => self.on_get_blocks(from, req),
            Payload::Blocks(batch) => self.on_blocks(from, batch),
        }
    }

    fn on_status(&mut self, from: SocketAddr, status: StatusMessage) {
        if !is_compatible(status.version) {
            tracing::warn!(peer = %from, version = status.version, "incompatible protocol version");
            return;
        }
        tracing::debug!(peer = %from, id = %status.id, height = status.current_height, "status");
        if let Some(entry) = self.peers.get_mut(&from) {
            if entry.state == PeerState::Connected {
                entry.state = PeerState::StatusExchanged;
            }
        }
        self.start_sync(from, status.current_height);
    }

    /// Record `theirs` for the peer and start a sync loop if it is ahead
    /// and none is running.
    fn start_sync(&mut self, from: SocketAddr, theirs: u64) {
        let ours = self.ctx.ledger.height();
        let Some(entry) = self.peers.get_mut(&from) else {
            return;
        };
        let already_syncing = entry.is_syncing();
        entry.reported_height = entry.reported_height.max(theirs);

        if entry.reported_height <= ours {
            if !already_syncing {
                entry.state = PeerState::Synced;
            }
            return;
        }
        entry.state = PeerState::Syncing;
        if already_syncing {
            return;
        }
        tracing::info!(peer = %from, ours, theirs = entry.reported_height, "starting sync");
        entry.sync_task = Some(spawn_sync_loop(
            entry.handle.clone(),
            self.ctx.ledger.clone(),
            entry.reported_height,
            self.config.sync_interval,
            self.ctx.shutdown.clone(),
        ));
    }

    /// Serve as much of the range as fits one frame; the requester asks
    /// again from its new tip for the rest.
    fn on_get_blocks(&mut self, from: SocketAddr, req: GetBlocksMessage) {
        match self.ctx.ledger.get_blocks_capped(req.from, req.to, MAX_BLOCK_SIZE) {
            Ok(blocks) => {
                tracing::debug!(peer = %from, from = req.from, count = blocks.len(), "serving blocks");
                self.send_to(from, &Payload::Blocks(BlocksMessage { blocks }));
            }
            Err(e) => tracing::debug!(peer = %from, error = %e, "cannot serve block range"),
        }
    }

    /// Apply a sync batch in order. Stops at the first real failure since
    /// every later block depends on it.
    fn on_blocks(&mut self, from: SocketAddr, batch: BlocksMessage) {
        let total = batch.blocks.len();
        let mut applied = 0usize;
        for block in batch.blocks {
            match self.accept_block(block) {
                Ok(()) => applied += 1,
                Err(e) if e.is_benign() => {}
                Err(e) => {
                    log_block_rejection(from, &e);
                    break;
                }
            }
        }
        tracing::debug!(peer = %from, applied, total, height = self.ctx.ledger.height(), "applied block batch");

        let height = self.ctx.ledger.height();
        let Some(entry) = self.peers.get_mut(&from) else {
            return;
        };
        if entry.state != PeerState::Syncing {
            return;
        }
        if height >= entry.reported_height {
            tracing::info!(peer = %from, height, "synced");
            entry.state = PeerState::Synced;
        } else if applied > 0 {
            // A capped reply; pull the next slice now rather than on the
            // next sync tick.
            let next = GetBlocksMessage {
                from: height + 1,
                to: 0,
            };
            self.send_to(from, &Payload::GetBlocks(next));
        }
    }

    // ── Local ───────────────────────────────────────────────────────────

    fn on_submission(&mut self, submission: LocalSubmission) {
        match submission {
            LocalSubmission::Transaction { tx, reply } => {
                let hash = tx.hash();
                let result = self
                    .process_transaction(tx, None)
                    .map(|new| TxSubmitted { hash, new })
                    .map_err(|e| e.to_string());
                let _ = reply.send(result);
            }
            LocalSubmission::Block { block, reply } => {
                let hash = block.hash();
                let result = self
                    .process_block(block, None)
                    .map(|()| hash)
                    .map_err(|e| e.to_string());
                let _ = reply.send(result);
            }
        }
    }

    // ── Processing ──────────────────────────────────────────────────────

    /// Verify, pool, and relay when new. Returns whether the pool was
    /// missing it; a transaction already in the chain is never pooled.
    fn process_transaction(
        &mut self,
        tx: Transaction,
        origin: Option<SocketAddr>,
    ) -> Result<bool, NodeError> {
        self.ctx.metrics.transactions_received.inc();
        validate_transaction(&tx)?;

        let hash = tx.hash();
        if self.ctx.ledger.has_transaction(&hash) {
            tracing::debug!(tx = %hash, "transaction already in chain");
            return Ok(false);
        }
        let new = self.ctx.mempool.add(tx.clone());
        self.ctx.metrics.mempool_size.set(self.ctx.mempool.count() as i64);
        if new {
            tracing::debug!(tx = %hash, "transaction added to mempool");
            self.relay(&Payload::Transaction(tx), origin);
        }
        Ok(new)
    }

    /// Append and relay.
    fn process_block(&mut self, block: Block, origin: Option<SocketAddr>) -> Result<(), NodeError> {
        let relay = block.clone();
        self.accept_block(block)?;
        self.relay(&Payload::Block(relay), origin);
        Ok(())
    }

    /// Append, then drop the block's transactions from `pending` so they
    /// are not proposed again.
    fn accept_block(&mut self, block: Block) -> Result<(), NodeError> {
        let included: Vec<Hash> = block.transactions.iter().map(Transaction::hash).collect();
        self.ctx.ledger.add_block(block)?;
        self.ctx.mempool.remove_pending(&included);
        self.ctx.metrics.blocks_accepted.inc();
        self.ctx.metrics.block_height.set(self.ctx.ledger.height() as i64);
        Ok(())
    }

    /// One production slot: pending → block → proposer → sign → append.
    /// Takes pending transactions in arrival order up to the block size
    /// budget; the rest wait for a later slot.
    fn produce_block(&mut self) {
        let Some(key) = &self.validator else {
            return;
        };

        let (stale, candidates): (Vec<Transaction>, Vec<Transaction>) = self
            .ctx
            .mempool
            .pending()
            .into_iter()
            .partition(|tx| self.ctx.ledger.has_transaction(&tx.hash()));
        if !stale.is_empty() {
            let stale: Vec<Hash> = stale.iter().map(Transaction::hash).collect();
            self.ctx.mempool.remove_pending(&stale);
        }
        let txs = fill_within_budget(candidates);
        let included: Vec<Hash> = txs.iter().map(Transaction::hash).collect();
        let mut block = Block::from_prev_header(&self.ctx.ledger.current_header(), txs);
        let proposer = match self.ctx.proposer.select_proposer(&mut block) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(height = block.height(), error = %e, "no proposer, skipping slot");
                return;
            }
        };
        block.sign(&key.private);

        let hash: Hash = block.hash();
        let height = block.height();
        let tx_count = block.transactions.len();
        if let Err(e) = self.ctx.ledger.add_block(block.clone()) {
            tracing::warn!(height, error = %e, "produced block rejected by own ledger");
            return;
        }
        self.ctx.mempool.remove_pending(&included);
        self.ctx.metrics.mempool_size.set(self.ctx.mempool.count() as i64);

        self.ctx.metrics.blocks_produced.inc();
        self.ctx.metrics.block_height.set(height as i64);
        tracing::info!(
            hash = %hash,
            height,
            transactions = tx_count,
            proposer = %proposer.address,
            "produced block"
        );
        self.relay(&Payload::Block(block), None);
    }
}

fn log_block_rejection(from: SocketAddr, e: &NodeError) {
    if e.is_benign() {
        tracing::debug!(peer = %from, error = %e, "block already known");
    } else {
        tracing::warn!(peer = %from, error = %e, "rejected block");
    }
}

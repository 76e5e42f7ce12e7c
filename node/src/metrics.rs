//! Prometheus metrics for the Meridian node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] that the REST `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks this node produced and appended.
    pub blocks_produced: IntCounter,
    /// Blocks from peers or REST that the ledger accepted.
    pub blocks_accepted: IntCounter,
    /// Transactions received from peers or REST, valid or not.
    pub transactions_received: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub block_height: IntGauge,
    pub peer_count: IntGauge,
    /// Size of the mempool's `all` set.
    pub mempool_size: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let blocks_produced = register_int_counter_with_registry!(
            Opts::new("meridian_blocks_produced_total", "Blocks produced by this node"),
            registry
        )
        .expect("failed to register blocks_produced counter");

        let blocks_accepted = register_int_counter_with_registry!(
            Opts::new(
                "meridian_blocks_accepted_total",
                "Blocks received and accepted by the ledger"
            ),
            registry
        )
        .expect("failed to register blocks_accepted counter");

        let transactions_received = register_int_counter_with_registry!(
            Opts::new(
                "meridian_transactions_received_total",
                "Transactions received from peers or the REST API"
            ),
            registry
        )
        .expect("failed to register transactions_received counter");

        let block_height = register_int_gauge_with_registry!(
            Opts::new("meridian_block_height", "Current ledger height"),
            registry
        )
        .expect("failed to register block_height gauge");

        let peer_count = register_int_gauge_with_registry!(
            Opts::new("meridian_peer_count", "Connected peers"),
            registry
        )
        .expect("failed to register peer_count gauge");

        let mempool_size = register_int_gauge_with_registry!(
            Opts::new("meridian_mempool_size", "Transactions known to the mempool"),
            registry
        )
        .expect("failed to register mempool_size gauge");

        Self {
            registry,
            blocks_produced,
            blocks_accepted,
            transactions_received,
            block_height,
            peer_count,
            mempool_size,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

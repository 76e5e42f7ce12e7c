//! Seed dialing at startup.

use meridian_network::TcpTransport;
use tokio::task::JoinHandle;

/// Dial every seed once, in order. Failures are logged and skipped; there is
/// no retry.
pub fn dial_seeds(transport: TcpTransport, seeds: Vec<String>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut connected = 0;
        for seed in &seeds {
            match transport.connect(seed).await {
                Ok(addr) => {
                    tracing::info!(seed = %seed, peer = %addr, "connected to seed node");
                    connected += 1;
                }
                Err(e) => tracing::warn!(seed = %seed, error = %e, "failed to dial seed node"),
            }
        }
        tracing::info!(connected, total = seeds.len(), "bootstrap finished");
        connected
    })
}

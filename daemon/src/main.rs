//! Meridian daemon: entry point for running a Meridian node.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use meridian_node::{init_logging, MeridianNode, NodeConfig};
use meridian_nullables::NullStore;
use meridian_store::BlockStore;
use meridian_store_lmdb::LmdbBlockStore;

#[derive(Parser)]
#[command(name = "meridian-daemon", about = "Meridian proof-of-stake node daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base; CLI
    /// flags and env vars override them.
    #[arg(long, env = "MERIDIAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Print a fresh validator key pair.
    Keygen,
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT/SIGTERM.
    Run(RunArgs),
    /// Print the effective configuration as TOML.
    Config(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Node identifier advertised to peers.
    #[arg(long, env = "MERIDIAN_ID")]
    id: Option<String>,

    /// P2P listen address, e.g. "0.0.0.0:3000".
    #[arg(long, env = "MERIDIAN_LISTEN")]
    listen: Option<String>,

    /// Seed peers (comma-separated: "1.2.3.4:3000,5.6.7.8:3000").
    #[arg(long, env = "MERIDIAN_SEEDS", value_delimiter = ',')]
    seeds: Vec<String>,

    /// REST listen address.
    #[arg(long, env = "MERIDIAN_RPC_ADDRESS")]
    rpc_address: Option<String>,

    /// Disable the REST server.
    #[arg(long, env = "MERIDIAN_DISABLE_RPC")]
    disable_rpc: bool,

    /// Hex-encoded validator private key. Enables block production.
    #[arg(long, env = "MERIDIAN_VALIDATOR_SEED")]
    validator_seed: Option<String>,

    /// Seconds between block-production attempts.
    #[arg(long, env = "MERIDIAN_BLOCK_TIME")]
    block_time: Option<u64>,

    /// LMDB directory. In-memory when unset.
    #[arg(long, env = "MERIDIAN_DATA_DIR")]
    data_dir: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "MERIDIAN_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "MERIDIAN_LOG_LEVEL")]
    log_level: Option<String>,
}

impl RunArgs {
    fn apply(self, mut config: NodeConfig) -> NodeConfig {
        if let Some(id) = self.id {
            config.id = id;
        }
        if let Some(listen) = self.listen {
            config.listen_address = listen;
        }
        if !self.seeds.is_empty() {
            config.seed_nodes = self.seeds;
        }
        if let Some(addr) = self.rpc_address {
            config.rpc_address = addr;
        }
        if self.disable_rpc {
            config.rpc_enabled = false;
        }
        if self.validator_seed.is_some() {
            config.validator_seed = self.validator_seed;
        }
        if let Some(secs) = self.block_time {
            config.block_time_secs = secs;
        }
        if self.data_dir.is_some() {
            config.store_path = self.data_dir;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        config
    }
}

fn load_config(path: Option<&PathBuf>, args: RunArgs) -> anyhow::Result<NodeConfig> {
    let base = match path {
        Some(path) => {
            let path_str = path.to_string_lossy();
            NodeConfig::from_toml_file(&path_str)
                .with_context(|| format!("loading config from {}", path.display()))?
        }
        None => NodeConfig::default(),
    };
    Ok(args.apply(base))
}

fn open_store(config: &NodeConfig) -> anyhow::Result<Arc<dyn BlockStore>> {
    match &config.store_path {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {dir}"))?;
            let store = LmdbBlockStore::open(std::path::Path::new(dir))
                .with_context(|| format!("opening LMDB store at {dir}"))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(NullStore::new())),
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    init_logging(config.log_format()?, &config.log_level);

    tracing::info!(
        id = %config.id,
        p2p = %config.listen_address,
        rpc = if config.rpc_enabled { config.rpc_address.as_str() } else { "off" },
        store = config.store_path.as_deref().unwrap_or("memory"),
        "starting Meridian node"
    );
    if !config.seed_nodes.is_empty() {
        tracing::info!("seed nodes: {}", config.seed_nodes.join(", "));
    }

    let store = open_store(&config)?;
    let node = MeridianNode::new(config, store)?;
    let running = node.start().await?;

    let shutdown = running.shutdown_controller();
    shutdown.wait_for_signal().await;
    tracing::info!("shutdown signal received, stopping node");
    running.stop().await;

    tracing::info!("Meridian daemon exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Run(args) => run(load_config(cli.config.as_ref(), args)?).await?,
            NodeAction::Config(args) => {
                let config = load_config(cli.config.as_ref(), args)?;
                print!("{}", config.to_toml_string()?);
            }
        },
        Command::Keygen => {
            let kp = meridian_crypto::generate_keypair();
            println!("public:  {}", kp.public);
            println!("address: {}", meridian_crypto::derive_address(&kp.public));
            println!("private: {}", hex::encode(kp.private.0));
        }
    }

    Ok(())
}

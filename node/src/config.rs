//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};

use meridian_crypto::keypair_from_private;
use meridian_ledger::GenesisConfig;
use meridian_types::{KeyPair, PrivateKey, PublicKey};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a Meridian node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identifier advertised in `Status` replies.
    #[serde(default = "default_id")]
    pub id: String,

    /// P2P listen address.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Peers dialed at startup.
    #[serde(default)]
    pub seed_nodes: Vec<String>,

    /// Whether to enable the REST server.
    #[serde(default = "default_true")]
    pub rpc_enabled: bool,

    #[serde(default = "default_rpc_address")]
    pub rpc_address: String,

    /// Seconds between block-production attempts.
    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: u64,

    /// Seconds between block requests while catching up.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    #[serde(default = "default_mempool_capacity")]
    pub mempool_capacity: usize,

    /// Hex-encoded 32-byte private key seed. When set the node produces
    /// blocks.
    #[serde(default)]
    pub validator_seed: Option<String>,

    /// Stake registered for the validator key at startup.
    #[serde(default = "default_validator_stake")]
    pub validator_stake: u64,

    /// Hex-encoded public key credited by genesis. All-zero if unset.
    #[serde(default)]
    pub genesis_account: Option<String>,

    /// LMDB directory. In-memory store when unset.
    #[serde(default)]
    pub store_path: Option<String>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_id() -> String {
    "meridian-node".to_string()
}

fn default_listen_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_rpc_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_block_time_secs() -> u64 {
    5
}

fn default_sync_interval_secs() -> u64 {
    3
}

fn default_mempool_capacity() -> usize {
    meridian_mempool::DEFAULT_POOL_CAPACITY
}

fn default_validator_stake() -> u64 {
    100
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The block-signing key, if this node is a validator.
    pub fn validator_keypair(&self) -> Result<Option<KeyPair>, NodeError> {
        self.validator_seed
            .as_deref()
            .map(|seed| {
                PrivateKey::from_hex(seed)
                    .map(keypair_from_private)
                    .map_err(|e| NodeError::Config(format!("validator_seed: {e}")))
            })
            .transpose()
    }

    pub fn genesis(&self) -> Result<GenesisConfig, NodeError> {
        let mut genesis = GenesisConfig::default();
        if let Some(account) = &self.genesis_account {
            genesis.account = account
                .parse::<PublicKey>()
                .map_err(|e| NodeError::Config(format!("genesis_account: {e}")))?;
        }
        Ok(genesis)
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: default_id(),
            listen_address: default_listen_address(),
            seed_nodes: Vec::new(),
            rpc_enabled: default_true(),
            rpc_address: default_rpc_address(),
            block_time_secs: default_block_time_secs(),
            sync_interval_secs: default_sync_interval_secs(),
            mempool_capacity: default_mempool_capacity(),
            validator_seed: None,
            validator_stake: default_validator_stake(),
            genesis_account: None,
            store_path: None,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.listen_address, config.listen_address);
        assert_eq!(parsed.mempool_capacity, config.mempool_capacity);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.block_time_secs, 5);
        assert_eq!(config.sync_interval_secs, 3);
        assert_eq!(config.mempool_capacity, 1000);
        assert_eq!(config.validator_stake, 100);
        assert_eq!(config.log_format, "human");
        assert!(config.rpc_enabled);
        assert!(config.validator_keypair().unwrap().is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            id = "alpha"
            seed_nodes = ["127.0.0.1:4000"]
            block_time_secs = 1
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.id, "alpha");
        assert_eq!(config.seed_nodes, vec!["127.0.0.1:4000".to_string()]);
        assert_eq!(config.block_time_secs, 1);
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn validator_seed_derives_key() {
        let config = NodeConfig {
            validator_seed: Some("01".repeat(32)),
            ..NodeConfig::default()
        };
        let kp = config.validator_keypair().unwrap().unwrap();
        assert_eq!(kp.public, meridian_crypto::keypair_from_seed(&[1; 32]).public);
    }

    #[test]
    fn bad_seed_and_genesis_are_config_errors() {
        let config = NodeConfig {
            validator_seed: Some("zz".into()),
            genesis_account: Some("1234".into()),
            ..NodeConfig::default()
        };
        assert!(matches!(config.validator_keypair(), Err(NodeError::Config(_))));
        assert!(matches!(config.genesis(), Err(NodeError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/meridian.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}

//! API gateway configuration.
//!
//! Command-line flags (with environment fallbacks) for the HTTP server,
//! mapped onto a [`votechain::ChainConfig`]. Cipher key material is read
//! from the environment by [`votechain::CipherConfig::from_env`].

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use votechain::{ChainConfig, CipherConfig};

/// Configuration for one voting node.
#[derive(Clone, Debug, Parser)]
#[command(name = "votechain-gateway", version, about = "Provincial e-voting ledger node")]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "VOTECHAIN_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// This node's public base URL, as the other nodes know it.
    #[arg(long, env = "NODE_ADDRESS", default_value = "http://127.0.0.1:3000")]
    pub node_address: String,

    /// Comma-separated base URLs of every node in the network.
    #[arg(long, env = "VOTECHAIN_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// RocksDB directory.
    #[arg(long, env = "VOTECHAIN_DATA_DIR", default_value = "data/votechain-db")]
    pub data_dir: String,

    /// Keep everything in memory instead of RocksDB.
    #[arg(long, env = "VOTECHAIN_IN_MEMORY")]
    pub in_memory: bool,

    /// Include internal error text in API responses.
    #[arg(long, env = "VOTECHAIN_DEV_MODE")]
    pub dev_mode: bool,

    /// Background tally period in seconds; 0 disables it.
    #[arg(long, env = "VOTECHAIN_TALLY_INTERVAL_SECS", default_value_t = 30)]
    pub tally_interval_secs: u64,

    /// Per-peer request timeout in milliseconds.
    #[arg(long, env = "VOTECHAIN_PEER_TIMEOUT_MS", default_value_t = 5_000)]
    pub peer_timeout_ms: u64,

    /// Leading zero hex digits required of a block hash. Must be the same
    /// on every node of the network.
    #[arg(long, env = "VOTECHAIN_MINING_DIFFICULTY", default_value_t = 2)]
    pub mining_difficulty: usize,
}

impl ApiConfig {
    /// Builds the library configuration, reading cipher keys from the
    /// environment.
    pub fn chain_config(&self) -> ChainConfig {
        self.chain_config_with(CipherConfig::from_env())
    }

    pub fn chain_config_with(&self, cipher: CipherConfig) -> ChainConfig {
        let mut cfg = ChainConfig {
            cipher,
            ..ChainConfig::default()
        };
        cfg.ledger.mining_difficulty = self.mining_difficulty;
        cfg.storage.path = self.data_dir.clone();
        cfg.peers.node_address = self.node_address.clone();
        cfg.peers.peers = self.peers.clone();
        cfg.peers.request_timeout = Duration::from_millis(self.peer_timeout_ms);
        cfg.tally.refresh_interval = Duration::from_secs(self.tally_interval_secs);
        cfg
    }
}

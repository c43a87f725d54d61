//! Top-level configuration for a voting node.
//!
//! This module aggregates configuration for:
//!
//! - ledger parameters (`LedgerConfig`),
//! - storage (RocksDB path and creation flags),
//! - the two cipher domains (identifier / votes key material),
//! - peer nodes used by the consensus coordinator,
//! - the tally engine (known provinces, sentinel identifiers),
//! - metrics.
//!
//! Every section has a `Default`. Secrets are the only values read from
//! the environment here; everything else is wired by the binary.

use std::time::Duration;

use crate::ledger::LedgerConfig;
use crate::storage::RocksDbConfig;

/// Environment variable holding the identifier-domain key.
pub const ENV_KEY_IDENTIFIER: &str = "SECRET_KEY_IDENTIFIER";
/// Environment variable holding the identifier-domain IV.
pub const ENV_IV_IDENTIFIER: &str = "SECRET_IV_IDENTIFIER";
/// Environment variable holding the vote-domain key.
pub const ENV_KEY_VOTES: &str = "SECRET_KEY_VOTES";
/// Environment variable holding the vote-domain IV.
pub const ENV_IV_VOTES: &str = "SECRET_IV_VOTES";

/// Provinces of Angola, the default electoral regions.
pub const ANGOLA_PROVINCES: [&str; 18] = [
    "Bengo",
    "Benguela",
    "Bié",
    "Cabinda",
    "Cuando Cubango",
    "Cuanza Norte",
    "Cuanza Sul",
    "Cunene",
    "Huambo",
    "Huíla",
    "Luanda",
    "Lunda Norte",
    "Lunda Sul",
    "Malanje",
    "Moxico",
    "Namibe",
    "Uíge",
    "Zaire",
];

/// Key material for the two cipher domains.
///
/// Empty strings are allowed and fall back to the built-in weak
/// defaults (see [`crate::crypto::Cipher::new`]).
#[derive(Clone, Debug, Default)]
pub struct CipherConfig {
    pub identifier_key: String,
    pub identifier_iv: String,
    pub votes_key: String,
    pub votes_iv: String,
}

impl CipherConfig {
    /// Reads the four `SECRET_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).unwrap_or_default();
        let cfg = Self {
            identifier_key: get(ENV_KEY_IDENTIFIER),
            identifier_iv: get(ENV_IV_IDENTIFIER),
            votes_key: get(ENV_KEY_VOTES),
            votes_iv: get(ENV_IV_VOTES),
        };
        if !cfg.is_complete() {
            tracing::error!("required encryption variables are not all set; weak defaults will be used");
        }
        cfg
    }

    pub fn is_complete(&self) -> bool {
        !(self.identifier_key.is_empty()
            || self.identifier_iv.is_empty()
            || self.votes_key.is_empty()
            || self.votes_iv.is_empty())
    }
}

/// Peer nodes taking part in longest-chain synchronisation.
#[derive(Clone, Debug)]
pub struct PeerConfig {
    /// This node's own base URL; filtered out of `peers`.
    pub node_address: String,
    /// Base URLs of the other nodes, e.g. `"http://10.0.0.2:3000"`.
    pub peers: Vec<String>,
    /// Per-peer request timeout.
    pub request_timeout: Duration,
    /// Maximum number of in-flight peer requests per fan-out.
    pub max_concurrency: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            node_address: "http://127.0.0.1:3000".to_string(),
            peers: Vec::new(),
            request_timeout: Duration::from_secs(5),
            max_concurrency: 8,
        }
    }
}

impl PeerConfig {
    /// Configured peers excluding this node, with trailing slashes removed.
    pub fn remote_peers(&self) -> Vec<String> {
        let own = self.node_address.trim_end_matches('/');
        let mut out: Vec<String> = Vec::new();
        for peer in &self.peers {
            let peer = peer.trim().trim_end_matches('/');
            if peer.is_empty() || peer == own || out.iter().any(|p| p == peer) {
                continue;
            }
            out.push(peer.to_string());
        }
        out
    }
}

/// Tally engine parameters.
#[derive(Clone, Debug)]
pub struct TallyConfig {
    /// Provinces with zero-initialised statistics.
    pub provinces: Vec<String>,
    /// Identifiers reserved for smoke tests; never counted.
    pub sentinel_identifiers: Vec<String>,
    /// How often a node re-runs the tally in the background; zero disables.
    pub refresh_interval: Duration,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            provinces: ANGOLA_PROVINCES.iter().map(|p| p.to_string()).collect(),
            sentinel_identifiers: vec!["00000".to_string(), "20000".to_string()],
            refresh_interval: Duration::from_secs(30),
        }
    }
}

/// Metrics settings.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether the node serves `/metrics`.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Top-level configuration for a voting node.
#[derive(Clone, Debug, Default)]
pub struct ChainConfig {
    pub ledger: LedgerConfig,
    pub storage: RocksDbConfig,
    pub cipher: CipherConfig,
    pub peers: PeerConfig,
    pub tally: TallyConfig,
    pub metrics: MetricsConfig,
}

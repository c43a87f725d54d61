//! Votechain library crate.
//!
//! This crate provides the core of a provincial e-voting node: an
//! append-only ledger of encrypted ballots kept consistent across a small,
//! trusted set of nodes by the longest-chain rule, and a tally engine that
//! replays confirmed ballots into election results.
//!
//! - strongly-typed domain types (`types`),
//! - field encryption and key material (`crypto`),
//! - the ledger with its pending pool and pluggable rules (`ledger`),
//! - block validity predicates (`validation`),
//! - the tally engine and election contract (`tally`),
//! - peer transport and the consensus coordinator (`consensus`),
//! - storage backends (`storage`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! The `votechain-gateway` binary composes these pieces behind an HTTP API.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod tally;
pub mod types;
pub mod validation;

// Re-export top-level configuration types.
pub use config::{ChainConfig, CipherConfig, MetricsConfig, PeerConfig, TallyConfig};

// Re-export "core" ledger types and traits.
pub use ledger::{
    BlockValidator, CombinedValidator, ForkChoice, Ledger, LedgerConfig, LedgerError,
    LongestChainForkChoice, StateError, TxPool, ValidationError, VoteStore,
};

// Re-export consensus plumbing.
pub use consensus::{
    BroadcastReport, ChainSnapshot, ChainSource, Coordinator, Envelope, HttpPeerClient,
    PeerClient, PeerError, RoundOutcome, SyncChainRequest,
};

pub use crypto::{Cipher, CipherSuite, CryptoError};
pub use tally::{ElectionContract, TallyError, TallySnapshot};

// Re-export storage backends.
pub use storage::{InMemoryStore, RocksDbConfig, RocksDbStore, StorageError};

pub use validation::{BaseValidity, LinkValidity};

pub use metrics::{LedgerMetrics, MetricsRegistry};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the default block validator stack used by a node.
///
/// This composes:
///
/// - [`BaseValidity`] for cheap per-block checks, and
/// - [`LinkValidity`] for linkage, hashing and sealing checks.
pub type DefaultBlockValidator = CombinedValidator<BaseValidity, LinkValidity>;

/// Type alias for the default fork-choice rule.
pub type DefaultForkChoice = LongestChainForkChoice;

/// Type alias for the storage handle a node runs on.
///
/// Held behind an `Arc` so one binary can pick RocksDB or memory at startup.
pub type DynVoteStore = dyn VoteStore;

/// Type alias for the default ledger stack.
///
/// This uses:
///
/// - [`DynVoteStore`] (RocksDB or in-memory),
/// - [`DefaultBlockValidator`] (base + link),
/// - [`DefaultForkChoice`] (longest chain).
pub type DefaultLedger = Ledger<DynVoteStore, DefaultBlockValidator, DefaultForkChoice>;

/// Builds the default validator stack from a ledger configuration.
pub fn default_validator(cfg: &LedgerConfig) -> DefaultBlockValidator {
    CombinedValidator::new(BaseValidity::new(cfg), LinkValidity::new(cfg))
}

//! Metrics and instrumentation for the ledger.
//!
//! Typical usage in a node:
//!
//! ```ignore
//! use std::sync::Arc;
//! use votechain::metrics::MetricsRegistry;
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//!
//! // Elsewhere in the code:
//! registry.ledger.blocks_mined.inc();
//! registry.ledger.tally_replay_seconds.observe(duration_secs);
//!
//! // And in the `/metrics` handler:
//! let body = registry.gather_text();
//! ```

pub mod prometheus;

pub use prometheus::{LedgerMetrics, MetricsRegistry};

//! Prometheus-backed ledger metrics.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed ledger metrics. The gateway serves
//! [`MetricsRegistry::gather_text`] at `/metrics`.

use prometheus::{self, Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

/// Ledger-related Prometheus metrics.
///
/// These are registered into a [`Registry`] and updated by the node as it
/// admits transactions, mines, syncs and tallies.
#[derive(Clone)]
pub struct LedgerMetrics {
    pub blocks_mined: IntCounter,
    /// Blocks received from peers and rejected by validation.
    pub blocks_rejected: IntCounter,
    pub transactions_admitted: IntCounter,
    pub transactions_rejected: IntCounter,
    /// Successful `replace_chain` calls.
    pub chain_replacements: IntCounter,
    /// Peer calls that failed or timed out.
    pub peer_failures: IntCounter,
    /// Wall time of a full consensus round, in seconds.
    pub consensus_round_seconds: Histogram,
    /// Wall time of a tally replay, in seconds.
    pub tally_replay_seconds: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let c = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

impl LedgerMetrics {
    /// Registers ledger metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let blocks_mined = counter(
            registry,
            "ledger_blocks_mined_total",
            "Total number of blocks mined by this node",
        )?;
        let blocks_rejected = counter(
            registry,
            "ledger_blocks_rejected_total",
            "Total number of peer blocks rejected by validation",
        )?;
        let transactions_admitted = counter(
            registry,
            "ledger_transactions_admitted_total",
            "Total number of ballots admitted into the pending pool",
        )?;
        let transactions_rejected = counter(
            registry,
            "ledger_transactions_rejected_total",
            "Total number of ballots rejected at admission",
        )?;
        let chain_replacements = counter(
            registry,
            "ledger_chain_replacements_total",
            "Total number of times the local chain was replaced",
        )?;
        let peer_failures = counter(
            registry,
            "consensus_peer_failures_total",
            "Total number of failed or timed-out peer calls",
        )?;

        // Consensus rounds are dominated by peer round trips.
        let consensus_round_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consensus_round_seconds",
                "Time to fetch peer chains, select the longest and sync it, in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(consensus_round_seconds.clone()))?;

        let tally_replay_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "tally_replay_seconds",
                "Time to replay all confirmed votes into results, in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )?;
        registry.register(Box::new(tally_replay_seconds.clone()))?;

        Ok(Self {
            blocks_mined,
            blocks_rejected,
            transactions_admitted,
            transactions_rejected,
            chain_replacements,
            peer_failures,
            consensus_round_seconds,
            tally_replay_seconds,
        })
    }
}

/// Wrapper around a Prometheus registry and the ledger metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`](std::sync::Arc) and shared across tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub ledger: LedgerMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the ledger metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("votechain".to_string()), None)?;
        let ledger = LedgerMetrics::register(&registry)?;
        Ok(Self { registry, ledger })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

//! Shared application state.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use votechain::{
    ChainConfig, CipherSuite, Coordinator, DefaultForkChoice, DefaultLedger, DynVoteStore,
    ElectionContract, HttpPeerClient, LedgerError, MetricsRegistry, default_validator,
};

/// Shared state held by the API and background tasks.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via Axum's
/// `State` extractor. The ledger mutex serialises every chain and pool
/// mutation; it is never held across a peer call.
pub struct AppState {
    /// Chain, pending pool and election contract.
    pub ledger: Mutex<DefaultLedger>,
    /// Outbound gossip to the other nodes.
    pub coordinator: Coordinator<HttpPeerClient>,
    pub fork_choice: DefaultForkChoice,
    /// Metrics registry shared between the handlers and the tally loop.
    pub metrics: Arc<MetricsRegistry>,
    /// Expose internal error text in responses.
    pub dev_mode: bool,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Opens the ledger on `store` and wires the HTTP coordinator.
    pub fn build(
        cfg: &ChainConfig,
        store: Arc<DynVoteStore>,
        metrics: Arc<MetricsRegistry>,
        dev_mode: bool,
    ) -> Result<Self, LedgerError> {
        let contract = ElectionContract::new(
            store.clone(),
            CipherSuite::from_config(&cfg.cipher),
            cfg.tally.clone(),
        );
        let ledger = DefaultLedger::open(
            cfg.ledger.clone(),
            store,
            default_validator(&cfg.ledger),
            DefaultForkChoice::default(),
            contract,
        )?;
        let client = HttpPeerClient::new(cfg.peers.request_timeout)?;

        Ok(Self {
            ledger: Mutex::new(ledger),
            coordinator: Coordinator::new(client, &cfg.peers),
            fork_choice: DefaultForkChoice::default(),
            metrics,
            dev_mode,
        })
    }
}

/// Returns the current wall-clock time as milliseconds since Unix epoch.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

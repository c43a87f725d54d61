//! Voting node binary.
//!
//! Serves the blockchain API under `/api/blockchain` on top of the
//! `votechain` crate:
//!
//! - vote submission, relay and mining,
//! - longest-chain synchronisation with the configured peers,
//! - tally results and election reference data,
//! - `GET /health` and a Prometheus `/metrics` endpoint.
//!
//! A background task re-runs the tally every `--tally-interval-secs`.

mod config;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use votechain::{DynVoteStore, InMemoryStore, LedgerError, MetricsRegistry, RocksDbStore};

use config::ApiConfig;
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("votechain_gateway=info,votechain=info")),
        )
        .init();

    let api_cfg = ApiConfig::parse();
    if let Err(e) = run(api_cfg).await {
        tracing::error!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(api_cfg: ApiConfig) -> Result<(), String> {
    let chain_cfg = api_cfg.chain_config();

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    // ---------------------------
    // Storage + ledger
    // ---------------------------

    let store: Arc<DynVoteStore> = if api_cfg.in_memory {
        tracing::warn!("running with in-memory storage; nothing survives a restart");
        Arc::new(InMemoryStore::new())
    } else {
        let store = RocksDbStore::open(&chain_cfg.storage).map_err(|e| {
            format!(
                "failed to open RocksDB store at {}: {e}",
                chain_cfg.storage.path
            )
        })?;
        Arc::new(store)
    };

    let app_state: SharedState = Arc::new(
        AppState::build(&chain_cfg, store, metrics, api_cfg.dev_mode)
            .map_err(|e| format!("failed to open ledger: {e}"))?,
    );

    tracing::info!(
        node = %chain_cfg.peers.node_address,
        peers = app_state.coordinator.peers().len(),
        difficulty = chain_cfg.ledger.mining_difficulty,
        "node initialised"
    );

    // ---------------------------
    // Background tally loop
    // ---------------------------

    let interval = chain_cfg.tally.refresh_interval;
    if !interval.is_zero() {
        let tally_state = app_state.clone();
        tokio::spawn(async move {
            run_tally_loop(tally_state, interval).await;
        });
    }

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = routes::router(app_state, chain_cfg.metrics.enabled);

    tracing::info!("voting node listening on http://{}", api_cfg.listen);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Periodically replays the chain into fresh results.
async fn run_tally_loop(state: SharedState, interval: Duration) {
    tracing::info!("tally loop running with interval {}s", interval.as_secs());

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        match routes::results::compute_results(&state).await {
            Ok(results) => {
                tracing::debug!(
                    votes = results.total_votes_received,
                    "background tally refreshed"
                );
            }
            Err(LedgerError::NotFound(what)) => {
                tracing::debug!("skipping tally: {what} not found");
            }
            Err(e) => {
                tracing::warn!("background tally failed: {e}");
            }
        }
    }
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

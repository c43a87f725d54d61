//! Tally and election reference-data routes under `/api/blockchain`.

use std::time::Instant;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;

use votechain::{Candidate, LedgerError, Results, Voter};

use super::response::{ApiError, ApiResult, Reply, reply};
use crate::state::{AppState, SharedState};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/get-results", get(get_results))
        .route("/get-results-computed", get(get_results_computed))
        .route("/voters", get(voters))
        .route("/candidates", get(candidates))
        .route("/clear-voters", get(clear_voters))
        .route("/clear-results", get(clear_results))
}

/// Replays every confirmed vote and persists the results.
///
/// Shared by the route and the background tally loop.
pub async fn compute_results(state: &AppState) -> Result<Results, LedgerError> {
    let started = Instant::now();
    let results = state
        .ledger
        .lock()
        .await
        .contract_mut()
        .get_results(Utc::now());
    state
        .metrics
        .ledger
        .tally_replay_seconds
        .observe(started.elapsed().as_secs_f64());
    results.map_err(LedgerError::from)
}

async fn get_results(State(state): State<SharedState>) -> ApiResult<Results> {
    let results = compute_results(&state)
        .await
        .map_err(|e| ApiError::from_ledger(e, state.dev_mode))?;
    Ok(reply(StatusCode::OK, "Results computed successfully", results))
}

async fn get_results_computed(State(state): State<SharedState>) -> ApiResult<Results> {
    let stored = state.ledger.lock().await.contract_mut().get_results_computed();
    let results = stored.ok_or_else(|| ApiError::not_found("No computed results found"))?;
    Ok(reply(StatusCode::OK, "Results retrieved successfully", results))
}

async fn voters(State(state): State<SharedState>) -> Reply<Vec<Voter>> {
    let voters = state.ledger.lock().await.contract().get_voters();
    reply(StatusCode::OK, "Voters retrieved successfully", voters)
}

async fn candidates(State(state): State<SharedState>) -> Reply<Vec<Candidate>> {
    let candidates = state.ledger.lock().await.contract().get_candidates();
    reply(StatusCode::OK, "Candidates retrieved successfully", candidates)
}

async fn clear_voters(State(state): State<SharedState>) -> ApiResult<bool> {
    let erased = state.ledger.lock().await.contract_mut().erase_voters();
    erased.map_err(|e| ApiError::from_ledger(e.into(), state.dev_mode))?;
    Ok(reply(StatusCode::OK, "Voters cleared successfully", true))
}

async fn clear_results(State(state): State<SharedState>) -> ApiResult<bool> {
    let erased = state.ledger.lock().await.contract_mut().erase_results();
    erased.map_err(|e| ApiError::from_ledger(e.into(), state.dev_mode))?;
    Ok(reply(StatusCode::OK, "Results cleared successfully", true))
}

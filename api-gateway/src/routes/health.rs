use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::SharedState;

/// Simple health-check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Number of blocks in the local chain, genesis included.
    pub height: usize,
    pub pending: usize,
    pub peers: usize,
}

/// `GET /health`
///
/// Returns a basic JSON document indicating liveness and chain progress.
pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let (height, pending) = {
        let ledger = state.ledger.lock().await;
        (
            ledger.get_length_chain(),
            ledger.get_pending_transactions().len(),
        )
    };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            height,
            pending,
            peers: state.coordinator.peers().len(),
        }),
    )
}

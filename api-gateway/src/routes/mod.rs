//! HTTP routes.
//!
//! The blockchain API is mounted under [`API_PREFIX`]; `/health` and
//! `/metrics` sit at the root.

use axum::{Router, routing::get};

use votechain::consensus::API_PREFIX;

use crate::state::SharedState;

pub mod blockchain;
pub mod health;
pub mod metrics;
pub mod response;
pub mod results;

/// Builds the full router around `state`.
pub fn router(state: SharedState, metrics_enabled: bool) -> Router {
    let api = blockchain::router().merge(results::router());

    let mut app = Router::new()
        .route("/health", get(health::health))
        .nest(API_PREFIX, api);
    if metrics_enabled {
        app = app.route("/metrics", get(metrics::metrics));
    }
    app.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chrono::{Duration, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use votechain::{
        Announcement, Candidate, ChainConfig, DynVoteStore, InMemoryStore, MetricsRegistry,
        VoteStore,
    };

    use crate::state::AppState;

    fn dummy_state() -> SharedState {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        store
            .write_announcement(&Announcement {
                start_time_voting: now - Duration::hours(1),
                end_time_voting: now + Duration::hours(1),
                num_of_voters: 2,
                num_of_candidates: 1,
                date_created: now - Duration::days(1),
            })
            .expect("announcement");
        store
            .write_candidates(&[Candidate {
                code: "1".to_string(),
                name: "Ana".to_string(),
                party: "MPLA".to_string(),
                acronym: "MPLA".to_string(),
                status: "active".to_string(),
                num_votes: 0,
            }])
            .expect("candidates");
        store
            .write_voter_citizen_relation("AO-1", "voter-0001")
            .expect("relation");

        let mut cfg = ChainConfig::default();
        cfg.ledger.mining_difficulty = 1;
        let store: Arc<DynVoteStore> = store;
        let metrics = Arc::new(MetricsRegistry::new().expect("metrics"));
        Arc::new(AppState::build(&cfg, store, metrics, false).expect("state"))
    }

    async fn call(state: &SharedState, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router(state.clone(), true)
            .oneshot(req)
            .await
            .expect("response");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn fetch(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health_reports_genesis_height() {
        let state = dummy_state();
        let (status, body) = call(&state, fetch("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["height"], 1);
    }

    #[tokio::test]
    async fn blockchain_root_returns_envelope_with_chain() {
        let state = dummy_state();
        let (status, body) = call(&state, fetch("/api/blockchain")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["chain"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["data"]["chain"][0]["blockHeader"]["previousBlockHash"], "-");
    }

    #[tokio::test]
    async fn transaction_validation_statuses() {
        let state = dummy_state();

        let (status, body) = call(
            &state,
            post("/api/blockchain/transaction", json!({ "choiceCode": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Missing required field: identifier");

        let (status, _) = call(
            &state,
            post(
                "/api/blockchain/transaction",
                json!({ "identifier": "AO-1", "choiceCode": "abc" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &state,
            post(
                "/api/blockchain/transaction",
                json!({ "identifier": "AO-404", "choiceCode": 1 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn vote_mine_and_tally_round_trip() {
        let state = dummy_state();

        let (status, body) = call(
            &state,
            post(
                "/api/blockchain/transaction",
                json!({ "identifier": "AO-1", "choiceCode": 1, "secret": "pin" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["data"]["identifier"], "voter-0001");

        let (status, _) = call(
            &state,
            post(
                "/api/blockchain/transaction",
                json!({ "identifier": "AO-1", "choiceCode": 1 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&state, fetch("/api/blockchain/mine")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["consensus"]["source"], "local");
        let hash = body["data"]["block"]["blockHeader"]["blockHash"]
            .as_str()
            .expect("hash")
            .to_string();

        let (status, body) = call(&state, fetch("/api/blockchain/blocks")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

        let (status, body) =
            call(&state, fetch(&format!("/api/blockchain/block-detail/{hash}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["blockIndex"], 1);

        let (status, _) = call(&state, fetch("/api/blockchain/block-detail/unknown")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&state, fetch("/api/blockchain/get-results-computed")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&state, fetch("/api/blockchain/get-results")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["totalVotesReceived"], 1);

        let (status, body) = call(&state, fetch("/api/blockchain/get-results-computed")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["totalVotesReceived"], 1);

        let (_, body) = call(&state, fetch("/api/blockchain/voters")).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn gossip_endpoints_reject_bad_payloads() {
        let state = dummy_state();

        let (status, body) = call(
            &state,
            post("/api/blockchain/receive-new-block", json!({ "hash": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid block data");

        let (status, _) = call(&state, post("/api/blockchain/synchronize-chain", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Same length as the local chain: not preferred.
        let chain = state.ledger.lock().await.get_chain().to_vec();
        let (status, body) = call(
            &state,
            post("/api/blockchain/synchronize-chain", json!({ "chain": chain })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Failed to synchronize chain");
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_ledger_counters() {
        let state = dummy_state();
        call(&state, fetch("/api/blockchain/mine")).await;

        let resp = router(state.clone(), true)
            .oneshot(fetch("/metrics"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(text.contains("votechain_ledger_blocks_mined_total 1"));
    }
}

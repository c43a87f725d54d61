//! Chain, pool and gossip routes under `/api/blockchain`.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use votechain::{
    Block, BlockSummary, BroadcastReport, ChainSnapshot, ChainSource, RoundOutcome,
    SyncChainRequest, Transaction, VoteData,
};

use super::response::{ApiError, ApiResult, Reply, reply};
use crate::state::{AppState, SharedState, now_ms};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_blockchain))
        .route("/chain", get(get_chain))
        .route("/pending-transactions", get(pending_transactions))
        .route("/transactions", get(transactions))
        .route("/blocks", get(blocks))
        .route("/block-detail/{hash}", get(block_detail))
        .route("/transaction", post(add_transaction))
        .route("/transaction/broadcast", post(broadcast_transaction))
        .route("/transaction/receive", post(receive_transaction))
        .route("/receive-new-block", post(receive_new_block))
        .route("/synchronize-chain", post(synchronize_chain))
        .route("/mine", get(mine))
        .route("/clear-chains", get(clear_chains))
}

/// Body of `POST /transaction`.
///
/// `identifier` is the citizen's electoral ID; the on-chain pseudonym is
/// looked up from it. `choiceCode` may be a JSON string or number.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub identifier: Option<String>,
    pub choice_code: Option<Value>,
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionBroadcast {
    pub transaction: Transaction,
    pub broadcast: BroadcastReport,
}

/// Consensus round as reported to API clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusSummary {
    /// `"local"` or the winning peer's base URL.
    pub source: String,
    pub chain_length: usize,
    pub responded: usize,
    pub sync: BroadcastReport,
}

impl From<&RoundOutcome> for ConsensusSummary {
    fn from(outcome: &RoundOutcome) -> Self {
        let source = match &outcome.source {
            ChainSource::Local => "local".to_string(),
            ChainSource::Peer(peer) => peer.clone(),
        };
        Self {
            source,
            chain_length: outcome.chain.len(),
            responded: outcome.responded,
            sync: outcome.sync.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlockReceipt {
    pub block: Block,
    pub consensus: ConsensusSummary,
}

#[derive(Debug, Serialize)]
pub struct MinedBlock {
    pub block: Block,
    pub broadcast: BroadcastReport,
    pub consensus: ConsensusSummary,
}

/// Runs a longest-chain round and adopts a longer peer chain locally.
///
/// The ledger lock is released while peers are contacted.
async fn run_consensus(state: &AppState) -> RoundOutcome {
    let local = state.ledger.lock().await.get_chain().to_vec();
    let outcome = state.coordinator.run_round(local, &state.fork_choice).await;

    let metrics = &state.metrics.ledger;
    metrics
        .consensus_round_seconds
        .observe(outcome.elapsed.as_secs_f64());
    let unreachable = state.coordinator.peers().len().saturating_sub(outcome.responded);
    metrics
        .peer_failures
        .inc_by((unreachable + outcome.sync.failed.len()) as u64);

    if let ChainSource::Peer(peer) = &outcome.source {
        let replaced = state
            .ledger
            .lock()
            .await
            .replace_chain(outcome.chain.clone());
        if replaced {
            metrics.chain_replacements.inc();
            tracing::info!(peer = %peer, "adopted longer chain from peer");
        }
    }
    outcome
}

async fn get_blockchain(State(state): State<SharedState>) -> Reply<ChainSnapshot> {
    let snapshot = state.ledger.lock().await.snapshot();
    reply(StatusCode::OK, "Blockchain retrieved successfully", snapshot)
}

async fn get_chain(State(state): State<SharedState>) -> Reply<Vec<Block>> {
    let chain = state.ledger.lock().await.get_chain().to_vec();
    reply(StatusCode::OK, "Chain retrieved successfully", chain)
}

async fn pending_transactions(State(state): State<SharedState>) -> Reply<Vec<Transaction>> {
    let pending = state.ledger.lock().await.get_pending_transactions();
    reply(StatusCode::OK, "Pending transactions retrieved successfully", pending)
}

async fn transactions(State(state): State<SharedState>) -> Reply<Vec<Transaction>> {
    let txs = state.ledger.lock().await.get_transactions();
    reply(StatusCode::OK, "Transactions retrieved successfully", txs)
}

async fn blocks(State(state): State<SharedState>) -> Reply<Vec<BlockSummary>> {
    let blocks = state.ledger.lock().await.get_blocks();
    reply(StatusCode::OK, "Blocks retrieved successfully", blocks)
}

async fn block_detail(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
) -> ApiResult<Block> {
    let ledger = state.ledger.lock().await;
    let block = ledger
        .get_block_details(&hash)
        .map_err(|_| ApiError::not_found("Block not found"))?;
    Ok(reply(StatusCode::OK, "Block retrieved successfully", block.clone()))
}

async fn add_transaction(
    State(state): State<SharedState>,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> ApiResult<Transaction> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let identifier = body
        .identifier
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required field: identifier"))?;
    let choice_code = match body.choice_code {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(ApiError::bad_request("Missing required field: choiceCode")),
    };

    let result = state
        .ledger
        .lock()
        .await
        .cast_vote(&identifier, &choice_code, &body.secret, now_ms());

    match result {
        Ok(tx) => {
            state.metrics.ledger.transactions_admitted.inc();
            Ok(reply(StatusCode::CREATED, "Transaction added successfully", tx))
        }
        Err(e) => {
            state.metrics.ledger.transactions_rejected.inc();
            tracing::info!(reason = %e, "transaction rejected");
            Err(ApiError::from_ledger(e, state.dev_mode))
        }
    }
}

async fn broadcast_transaction(
    State(state): State<SharedState>,
    body: Result<Json<VoteData>, JsonRejection>,
) -> ApiResult<TransactionBroadcast> {
    let Json(data) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let admitted = state
        .ledger
        .lock()
        .await
        .try_add_pending_transaction(data, now_ms());
    let tx = admitted.map_err(|e| {
        state.metrics.ledger.transactions_rejected.inc();
        ApiError::from_ledger(e, state.dev_mode)
    })?;
    state.metrics.ledger.transactions_admitted.inc();

    let broadcast = state.coordinator.broadcast_transaction(&tx).await;
    state
        .metrics
        .ledger
        .peer_failures
        .inc_by(broadcast.failed.len() as u64);

    Ok(reply(
        StatusCode::CREATED,
        "Transaction broadcasted successfully",
        TransactionBroadcast {
            transaction: tx,
            broadcast,
        },
    ))
}

/// Admits a transaction relayed by a peer. Never re-broadcasts.
async fn receive_transaction(
    State(state): State<SharedState>,
    body: Result<Json<Transaction>, JsonRejection>,
) -> ApiResult<Transaction> {
    let Json(tx) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let admitted = state.ledger.lock().await.receive_transaction(tx, now_ms());
    match admitted {
        Ok(tx) => {
            state.metrics.ledger.transactions_admitted.inc();
            Ok(reply(StatusCode::CREATED, "Transaction received", tx))
        }
        Err(e) => {
            state.metrics.ledger.transactions_rejected.inc();
            Err(ApiError::from_ledger(e, state.dev_mode))
        }
    }
}

/// Inbound block from a peer: try to append it, then run a consensus
/// round whatever the outcome.
async fn receive_new_block(
    State(state): State<SharedState>,
    body: Result<Json<Block>, JsonRejection>,
) -> ApiResult<BlockReceipt> {
    let Json(block) = body.map_err(|_| ApiError::bad_request("Invalid block data"))?;

    let accepted = state.ledger.lock().await.add_block(block.clone());
    if !accepted {
        state.metrics.ledger.blocks_rejected.inc();
    }

    let outcome = run_consensus(&state).await;

    if accepted {
        Ok(reply(
            StatusCode::OK,
            "Block accepted and added to chain",
            BlockReceipt {
                block,
                consensus: ConsensusSummary::from(&outcome),
            },
        ))
    } else {
        Err(ApiError::bad_request("Block rejected"))
    }
}

async fn synchronize_chain(
    State(state): State<SharedState>,
    body: Result<Json<SyncChainRequest>, JsonRejection>,
) -> ApiResult<usize> {
    let Json(SyncChainRequest { chain }) =
        body.map_err(|_| ApiError::bad_request("Missing chain data"))?;

    let mut ledger = state.ledger.lock().await;
    if ledger.replace_chain(chain) {
        state.metrics.ledger.chain_replacements.inc();
        Ok(reply(
            StatusCode::OK,
            "Chain synchronized successfully",
            ledger.get_length_chain(),
        ))
    } else {
        Err(ApiError::bad_request("Failed to synchronize chain"))
    }
}

/// Mines the pending pool, announces the block, then runs a consensus
/// round.
async fn mine(State(state): State<SharedState>) -> ApiResult<MinedBlock> {
    let mined = state.ledger.lock().await.mine_block(now_ms());
    let block = mined.map_err(|e| ApiError::from_ledger(e, state.dev_mode))?;
    state.metrics.ledger.blocks_mined.inc();

    let broadcast = state.coordinator.broadcast_block(&block).await;
    state
        .metrics
        .ledger
        .peer_failures
        .inc_by(broadcast.failed.len() as u64);

    let outcome = run_consensus(&state).await;

    Ok(reply(
        StatusCode::OK,
        "New block mined successfully",
        MinedBlock {
            block,
            broadcast,
            consensus: ConsensusSummary::from(&outcome),
        },
    ))
}

async fn clear_chains(State(state): State<SharedState>) -> ApiResult<usize> {
    let mut ledger = state.ledger.lock().await;
    ledger
        .clear_chains_from_storage()
        .map_err(|e| ApiError::from_ledger(e, state.dev_mode))?;
    Ok(reply(
        StatusCode::OK,
        "Chains cleared successfully",
        ledger.get_length_chain(),
    ))
}

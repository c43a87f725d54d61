//! Longest-chain consensus over a static peer list.
//!
//! All outbound calls fan out concurrently, bounded by
//! `PeerConfig::max_concurrency`, and each call is cut off after
//! `PeerConfig::request_timeout`. A failed or timed-out peer is logged and
//! left out of the round; it never fails the local operation.

use std::future::Future;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::config::PeerConfig;
use crate::ledger::ForkChoice;
use crate::types::{Block, Transaction};

use super::peer::{PeerClient, PeerError};

/// Which peers took a broadcast and which did not.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl BroadcastReport {
    fn from_results(results: Vec<(String, Result<(), PeerError>)>) -> Self {
        let mut report = BroadcastReport::default();
        for (peer, result) in results {
            match result {
                Ok(()) => report.succeeded.push(peer),
                Err(_) => report.failed.push(peer),
            }
        }
        report.succeeded.sort();
        report.failed.sort();
        report
    }
}

/// Where the winning chain of a round came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainSource {
    Local,
    Peer(String),
}

/// Outcome of one consensus round.
#[derive(Clone, Debug)]
pub struct RoundOutcome {
    pub source: ChainSource,
    pub chain: Vec<Block>,
    /// Peers that answered with a chain.
    pub responded: usize,
    /// Delivery of the winner to the peers.
    pub sync: BroadcastReport,
    pub elapsed: Duration,
}

pub struct Coordinator<P> {
    client: P,
    peers: Vec<String>,
    timeout: Duration,
    max_concurrency: usize,
}

impl<P> Coordinator<P>
where
    P: PeerClient,
{
    pub fn new(client: P, cfg: &PeerConfig) -> Self {
        Self {
            client,
            peers: cfg.remote_peers(),
            timeout: cfg.request_timeout,
            max_concurrency: cfg.max_concurrency.max(1),
        }
    }

    /// Remote peers, excluding this node.
    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Runs `call` against every peer and collects the results.
    ///
    /// The per-peer futures are built up front so the returned future
    /// holds no closure over borrowed peer names.
    fn fan_out<'a, T, Fut>(
        &'a self,
        op: &'static str,
        call: impl Fn(&'a str) -> Fut,
    ) -> impl Future<Output = Vec<(String, Result<T, PeerError>)>>
    where
        Fut: Future<Output = Result<T, PeerError>>,
    {
        let timeout = self.timeout;
        let calls: Vec<_> = self
            .peers
            .iter()
            .map(|peer| {
                let fut = call(peer.as_str());
                let peer = peer.clone();
                async move {
                    let result = match tokio::time::timeout(timeout, fut).await {
                        Ok(result) => result,
                        Err(_) => Err(PeerError::Timeout {
                            peer: peer.clone(),
                            after: timeout,
                        }),
                    };
                    if let Err(e) = &result {
                        tracing::warn!(peer = %peer, op, error = %e, "peer call failed");
                    }
                    (peer, result)
                }
            })
            .collect();

        stream::iter(calls)
            .buffer_unordered(self.max_concurrency)
            .collect()
    }

    pub async fn broadcast_block(&self, block: &Block) -> BroadcastReport {
        let results = self
            .fan_out("send_block", |peer| self.client.send_block(peer, block))
            .await;
        BroadcastReport::from_results(results)
    }

    pub async fn broadcast_chain(&self, chain: &[Block]) -> BroadcastReport {
        let results = self
            .fan_out("send_chain", |peer| self.client.send_chain(peer, chain))
            .await;
        BroadcastReport::from_results(results)
    }

    pub async fn broadcast_transaction(&self, tx: &Transaction) -> BroadcastReport {
        let results = self
            .fan_out("send_transaction", |peer| self.client.send_transaction(peer, tx))
            .await;
        BroadcastReport::from_results(results)
    }

    /// Fetches every peer's chain, dropping peers that failed.
    ///
    /// The result is ordered like the configured peer list.
    pub async fn collect_chains(&self) -> Vec<(String, Vec<Block>)> {
        let mut chains: Vec<(String, Vec<Block>)> = self
            .fan_out("fetch_chain", |peer| self.client.fetch_chain(peer))
            .await
            .into_iter()
            .filter_map(|(peer, result)| result.ok().map(|chain| (peer, chain)))
            .collect();
        chains.sort_by_key(|(peer, _)| self.peers.iter().position(|p| p == peer));
        chains
    }

    /// One longest-chain round.
    ///
    /// `local` competes with every peer chain under `fork_choice`; local
    /// wins ties. The winner is then offered to every peer. Peers
    /// re-validate it before replacing, so no validity check happens here.
    pub async fn run_round<F>(&self, local: Vec<Block>, fork_choice: &F) -> RoundOutcome
    where
        F: ForkChoice + Sync,
    {
        let start = Instant::now();
        let mut remote = self.collect_chains().await;
        let responded = remote.len();

        let winner = {
            let mut candidates: Vec<&[Block]> = Vec::with_capacity(remote.len() + 1);
            candidates.push(&local);
            candidates.extend(remote.iter().map(|(_, chain)| chain.as_slice()));
            fork_choice.select(&candidates).unwrap_or(0)
        };

        let (source, chain) = if winner == 0 {
            (ChainSource::Local, local)
        } else {
            let (peer, chain) = remote.swap_remove(winner - 1);
            (ChainSource::Peer(peer), chain)
        };

        let sync = self.broadcast_chain(&chain).await;
        let elapsed = start.elapsed();
        tracing::info!(
            source = ?source,
            height = chain.len(),
            responded,
            synced = sync.succeeded.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "consensus round finished"
        );

        RoundOutcome {
            source,
            chain,
            responded,
            sync,
            elapsed,
        }
    }
}

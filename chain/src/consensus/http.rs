//! HTTP peer client.
//!
//! Talks to other nodes' gateways under [`API_PREFIX`]:
//!
//! ```text
//! GET  {peer}/api/blockchain                      -> Envelope<ChainSnapshot>
//! POST {peer}/api/blockchain/receive-new-block    <- Block
//! POST {peer}/api/blockchain/synchronize-chain    <- { "chain": [Block] }
//! POST {peer}/api/blockchain/transaction/receive  <- Transaction
//! ```
//!
//! A `400` reply to a push means the peer received the payload and
//! declined it (stale chain, duplicate block). That is normal during
//! gossip and is not reported as a failure.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::types::{Block, Transaction};

use super::peer::{PeerClient, PeerError};
use super::wire::{ChainSnapshot, Envelope, SyncChainRequest};

/// Route prefix every node mounts its blockchain API under.
pub const API_PREFIX: &str = "/api/blockchain";

/// `reqwest`-based [`PeerClient`].
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct HttpPeerClient {
    client: Client,
    timeout: Duration,
}

impl HttpPeerClient {
    /// Builds a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Transport {
                peer: "-".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, timeout })
    }

    fn endpoint(peer: &str, path: &str) -> String {
        // Avoid accidental double slashes.
        format!(
            "{}{}/{}",
            peer.trim_end_matches('/'),
            API_PREFIX,
            path.trim_start_matches('/')
        )
        .trim_end_matches('/')
        .to_string()
    }

    fn transport(&self, peer: &str, e: reqwest::Error) -> PeerError {
        if e.is_timeout() {
            PeerError::Timeout {
                peer: peer.to_string(),
                after: self.timeout,
            }
        } else {
            PeerError::Transport {
                peer: peer.to_string(),
                message: e.to_string(),
            }
        }
    }

    async fn post_json<B>(&self, peer: &str, path: &str, body: &B) -> Result<(), PeerError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = Self::endpoint(peer, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport(peer, e))?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST {
            tracing::debug!(peer, path, "peer declined payload");
            return Ok(());
        }
        if !status.is_success() {
            return Err(PeerError::Status {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, PeerError> {
        let url = Self::endpoint(peer, "");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport(peer, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .json::<Envelope<ChainSnapshot>>()
            .await
            .map_err(|e| PeerError::Protocol {
                peer: peer.to_string(),
                message: format!("failed to parse chain response: {e}"),
            })?;

        body.data
            .map(|snapshot| snapshot.chain)
            .ok_or_else(|| PeerError::Protocol {
                peer: peer.to_string(),
                message: "chain response carried no data".to_string(),
            })
    }

    async fn send_block(&self, peer: &str, block: &Block) -> Result<(), PeerError> {
        self.post_json(peer, "/receive-new-block", block).await
    }

    async fn send_chain(&self, peer: &str, chain: &[Block]) -> Result<(), PeerError> {
        let body = SyncChainRequest {
            chain: chain.to_vec(),
        };
        self.post_json(peer, "/synchronize-chain", &body).await
    }

    async fn send_transaction(&self, peer: &str, tx: &Transaction) -> Result<(), PeerError> {
        self.post_json(peer, "/transaction/receive", tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_prefix_without_double_slashes() {
        assert_eq!(
            HttpPeerClient::endpoint("http://10.0.0.2:3000/", "/synchronize-chain"),
            "http://10.0.0.2:3000/api/blockchain/synchronize-chain"
        );
        assert_eq!(
            HttpPeerClient::endpoint("http://10.0.0.2:3000", ""),
            "http://10.0.0.2:3000/api/blockchain"
        );
    }

    #[tokio::test]
    async fn unreachable_peer_is_a_transport_error() {
        let client = HttpPeerClient::new(Duration::from_millis(200)).expect("client");
        // Port 9 (discard) is essentially never bound on loopback.
        let err = client
            .fetch_chain("http://127.0.0.1:9")
            .await
            .expect_err("nothing is listening");
        assert_eq!(err.peer(), "http://127.0.0.1:9");
    }
}

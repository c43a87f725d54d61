//! Peer transport abstraction.
//!
//! Consensus talks to other nodes only through [`PeerClient`], so the
//! coordinator can be driven by an in-process mock in tests and by
//! [`HttpPeerClient`](super::http::HttpPeerClient) in the gateway.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::types::{Block, Transaction};

/// Failure talking to a single peer.
///
/// Peer errors never fail the local operation that triggered them; the
/// coordinator logs them and excludes the peer from the round.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer {peer}: transport failure: {message}")]
    Transport { peer: String, message: String },

    #[error("peer {peer}: unexpected HTTP status {status}")]
    Status { peer: String, status: u16 },

    #[error("peer {peer}: protocol error: {message}")]
    Protocol { peer: String, message: String },

    #[error("peer {peer}: no response within {after:?}")]
    Timeout { peer: String, after: Duration },
}

impl PeerError {
    /// Base URL of the peer that failed.
    pub fn peer(&self) -> &str {
        match self {
            PeerError::Transport { peer, .. }
            | PeerError::Status { peer, .. }
            | PeerError::Protocol { peer, .. }
            | PeerError::Timeout { peer, .. } => peer,
        }
    }
}

/// Outbound calls a node makes to another node.
///
/// `peer` is the peer's base URL as listed in
/// [`PeerConfig::peers`](crate::config::PeerConfig::peers).
pub trait PeerClient: Send + Sync {
    /// Fetches the peer's full chain.
    fn fetch_chain(&self, peer: &str)
    -> impl Future<Output = Result<Vec<Block>, PeerError>> + Send;

    /// Announces a newly mined or accepted block.
    fn send_block(
        &self,
        peer: &str,
        block: &Block,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;

    /// Offers a chain for replacement.
    fn send_chain(
        &self,
        peer: &str,
        chain: &[Block],
    ) -> impl Future<Output = Result<(), PeerError>> + Send;

    /// Relays a pre-encrypted transaction for admission.
    fn send_transaction(
        &self,
        peer: &str,
        tx: &Transaction,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_names_its_peer() {
        let errors = [
            PeerError::Transport {
                peer: "http://a".to_string(),
                message: "refused".to_string(),
            },
            PeerError::Status {
                peer: "http://a".to_string(),
                status: 502,
            },
            PeerError::Protocol {
                peer: "http://a".to_string(),
                message: "bad json".to_string(),
            },
            PeerError::Timeout {
                peer: "http://a".to_string(),
                after: Duration::from_millis(10),
            },
        ];

        for e in &errors {
            assert_eq!(e.peer(), "http://a");
            assert!(e.to_string().starts_with("peer http://a"));
        }
    }
}

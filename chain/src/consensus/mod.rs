//! Consensus between nodes.
//!
//! This module provides the gossip side of the ledger:
//!
//! - the peer transport trait ([`peer::PeerClient`]) and its HTTP
//!   implementation ([`http::HttpPeerClient`]),
//! - the JSON bodies nodes exchange ([`wire`]),
//! - the longest-chain round and broadcast fan-out
//!   ([`coordinator::Coordinator`]).

pub mod coordinator;
pub mod http;
pub mod peer;
pub mod wire;

pub use coordinator::{BroadcastReport, ChainSource, Coordinator, RoundOutcome};
pub use http::{API_PREFIX, HttpPeerClient};
pub use peer::{PeerClient, PeerError};
pub use wire::{ChainSnapshot, Envelope, SyncChainRequest};

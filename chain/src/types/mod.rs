//! Core domain types used by the ledger.
//!
//! This module defines strongly-typed hashes, the encrypted payload
//! wrapper, and re-exports the block, transaction and election record
//! types. The goal is to avoid "naked" strings for values that carry an
//! invariant (a SHA-256 digest, a hex ciphertext) in public APIs while
//! keeping the JSON wire format byte-compatible with other nodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Blocks and block hashing.
pub mod block;
/// Election reference data and tally outputs.
pub mod election;
/// Vote transactions.
pub mod tx;

pub use block::{Block, BlockHeader, BlockSummary};
pub use election::{
    Announcement, Candidate, CandidateResult, Citizen, ElectionState, InvalidTransition,
    ProvinceTally, Results, RevealedVoter, Voter, millis_to_utc,
};
pub use tx::{Transaction, VoteData};

/// Length in hex characters of every SHA-256 digest used on-chain.
pub const HASH_HEX_LEN: usize = 64;

/// Placeholder parent hash carried by the genesis block.
pub const GENESIS_PARENT: &str = "-";

/// Computes the lowercase hex SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Returns `true` if `s` is a 64-character lowercase hex string.
///
/// Hash comparisons on the chain are exact string matches, so an
/// uppercase digest is treated as malformed rather than normalised.
pub fn is_sha256(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Strongly-typed block hash.
///
/// Serialized transparently as its hex string so the JSON shape stays
/// `"blockHash": "<hex>"`. The genesis parent is the only non-digest
/// value a `BlockHash` is allowed to hold (see [`GENESIS_PARENT`]).
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(pub String);

impl BlockHash {
    /// The fixed `"-"` parent of the genesis block.
    pub fn genesis_parent() -> Self {
        BlockHash(GENESIS_PARENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the hash is a well-formed SHA-256 digest.
    pub fn is_well_formed(&self) -> bool {
        is_sha256(&self.0)
    }

    /// Returns `true` if the digest starts with `difficulty` zero nibbles.
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        self.0.len() >= difficulty && self.0.bytes().take(difficulty).all(|b| b == b'0')
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strongly-typed transaction hash (hex SHA-256).
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque symmetric-cipher output.
///
/// Both fields are lowercase hex. The upper-case field names are part of
/// the wire format shared with existing clients.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CipherText {
    /// Hex-encoded 16-byte initialisation vector.
    #[serde(rename = "IV")]
    pub iv: String,
    /// Hex-encoded ciphertext.
    #[serde(rename = "CIPHER_TEXT")]
    pub cipher_text: String,
}

impl CipherText {
    pub fn new(iv: impl Into<String>, cipher_text: impl Into<String>) -> Self {
        Self {
            iv: iv.into(),
            cipher_text: cipher_text.into(),
        }
    }
}

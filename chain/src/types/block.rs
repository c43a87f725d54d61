// chain/src/types/block.rs

//! Block types and hashing.
//!
//! This module defines the core block data structures used by the ledger,
//! together with a canonical hashing routine, the transaction Merkle
//! root, and the cheap nonce puzzle used when sealing a block.
//!
//! The hash preimage is encoded with **bincode 2** using the `serde`
//! integration and an explicit `standard()` config, followed by the
//! little-endian nonce. The same preimage is used by the miner and by
//! every validator, so the encoding must remain stable across nodes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{BlockHash, Transaction, sha256_hex};

/// Block header: linking, ordering and sealing fields.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    /// Hash of the previous block, or `"-"` for genesis.
    pub previous_block_hash: BlockHash,

    /// Hash of this block's preimage (see [`Block::compute_hash`]).
    pub block_hash: BlockHash,

    /// Nonce found by the sealing puzzle.
    pub nonce: u64,

    /// SHA-256 Merkle root over the transaction hashes.
    pub merkle_root: Option<String>,

    /// Sealing time in milliseconds since Unix epoch.
    pub timestamp: u64,
}

/// Block = index + header + ordered list of transactions.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain, starting at 0 for genesis.
    pub block_index: u64,
    pub block_header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

/// Header-only view of a block, as listed by block explorers.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub block_index: u64,
    pub block_hash: BlockHash,
    pub previous_block_hash: BlockHash,
    pub timestamp: u64,
    pub transaction_count: usize,
}

/// Everything the block hash commits to, except the nonce.
#[derive(Serialize)]
struct HashPreimage<'a> {
    block_index: u64,
    previous_block_hash: &'a BlockHash,
    timestamp: u64,
    merkle_root: &'a Option<String>,
    transactions: &'a [Transaction],
}

impl Block {
    /// Builds the deterministic genesis block.
    ///
    /// Genesis uses timestamp 0 and nonce 0 so that every node derives
    /// the identical block and chains from different nodes share a root.
    pub fn genesis() -> Self {
        let mut block = Block {
            block_index: 0,
            block_header: BlockHeader {
                previous_block_hash: BlockHash::genesis_parent(),
                block_hash: BlockHash::default(),
                nonce: 0,
                merkle_root: Some(merkle_root(&[])),
                timestamp: 0,
            },
            transactions: Vec::new(),
        };
        block.block_header.block_hash = block.compute_hash();
        block
    }

    /// Assembles a block on top of `parent` and seals it.
    ///
    /// The nonce is searched from zero until the hash has `difficulty`
    /// leading zero hex digits. Difficulty is a small constant; this is
    /// not a proof-of-work scheme.
    pub fn seal(
        parent: &Block,
        transactions: Vec<Transaction>,
        timestamp: u64,
        difficulty: usize,
    ) -> Self {
        let mut block = Block {
            block_index: parent.block_index + 1,
            block_header: BlockHeader {
                previous_block_hash: parent.block_header.block_hash.clone(),
                block_hash: BlockHash::default(),
                nonce: 0,
                merkle_root: Some(merkle_root(&transactions)),
                timestamp,
            },
            transactions,
        };

        let base = block.preimage_hasher();
        let mut nonce: u64 = 0;
        loop {
            let hash = Self::finish_hash(base.clone(), nonce);
            if hash.meets_difficulty(difficulty) {
                block.block_header.nonce = nonce;
                block.block_header.block_hash = hash;
                return block;
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    /// Returns the canonical preimage bytes, excluding the nonce.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails. This is considered a programming
    /// error, because all fields are required to be serializable.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let preimage = HashPreimage {
            block_index: self.block_index,
            previous_block_hash: &self.block_header.previous_block_hash,
            timestamp: self.block_header.timestamp,
            merkle_root: &self.block_header.merkle_root,
            transactions: &self.transactions,
        };
        // Explicit config to avoid relying on any implicit defaults.
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec(&preimage, cfg)
            .expect("Block should always be serializable with bincode 2 + serde")
    }

    fn preimage_hasher(&self) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hasher
    }

    fn finish_hash(mut hasher: Sha256, nonce: u64) -> BlockHash {
        hasher.update(nonce.to_le_bytes());
        BlockHash(hex::encode(hasher.finalize()))
    }

    /// Recomputes this block's hash from its header fields and transactions.
    pub fn compute_hash(&self) -> BlockHash {
        Self::finish_hash(self.preimage_hasher(), self.block_header.nonce)
    }

    /// Recomputes the Merkle root of this block's transactions.
    pub fn compute_merkle_root(&self) -> String {
        merkle_root(&self.transactions)
    }

    pub fn hash(&self) -> &BlockHash {
        &self.block_header.block_hash
    }

    pub fn previous_hash(&self) -> &BlockHash {
        &self.block_header.previous_block_hash
    }

    pub fn is_genesis(&self) -> bool {
        self.block_index == 0
    }

    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            block_index: self.block_index,
            block_hash: self.block_header.block_hash.clone(),
            previous_block_hash: self.block_header.previous_block_hash.clone(),
            timestamp: self.block_header.timestamp,
            transaction_count: self.transactions.len(),
        }
    }

    /// Pseudonymous identifiers voting in this block, in order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.transactions.iter().map(|tx| tx.identifier())
    }
}

/// SHA-256 Merkle root over transaction hashes.
///
/// Each level hashes the concatenated hex of adjacent pairs; an odd node
/// is paired with itself. An empty list hashes the empty string.
pub fn merkle_root(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return sha256_hex(b"");
    }

    let mut level: Vec<String> = transactions
        .iter()
        .map(|tx| tx.transaction_hash.0.clone())
        .collect();

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                sha256_hex(format!("{left}{right}").as_bytes())
            })
            .collect();
    }

    level.remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoteData;

    fn dummy_tx(identifier: &str, timestamp: u64) -> Transaction {
        Transaction::new(
            VoteData {
                identifier: identifier.to_string(),
                electoral_id: "aa".to_string(),
                electoral_id_iv: "bb".to_string(),
                choice_code: "cc".to_string(),
                choice_code_iv: "dd".to_string(),
                secret: String::new(),
            },
            timestamp,
        )
    }

    #[test]
    fn genesis_is_deterministic() {
        let a = Block::genesis();
        let b = Block::genesis();

        assert_eq!(a, b);
        assert_eq!(a.block_index, 0);
        assert_eq!(a.previous_hash().as_str(), "-");
        assert!(a.hash().is_well_formed());
        assert_eq!(a.compute_hash(), *a.hash());
    }

    #[test]
    fn sealed_block_links_to_parent_and_meets_difficulty() {
        let genesis = Block::genesis();
        let block = Block::seal(&genesis, vec![dummy_tx("voter-0001", 5)], 1_000, 2);

        assert_eq!(block.block_index, 1);
        assert_eq!(block.previous_hash(), genesis.hash());
        assert!(block.hash().meets_difficulty(2));
        assert_eq!(block.compute_hash(), *block.hash());
        assert_eq!(
            block.block_header.merkle_root.as_deref(),
            Some(block.compute_merkle_root().as_str())
        );
    }

    #[test]
    fn changing_a_transaction_changes_the_hash() {
        let genesis = Block::genesis();
        let mut block = Block::seal(&genesis, vec![dummy_tx("voter-0001", 5)], 1_000, 1);
        let original = block.hash().clone();

        block.transactions[0] = dummy_tx("voter-0002", 5);
        assert_ne!(block.compute_hash(), original);
    }

    #[test]
    fn merkle_root_handles_odd_leaf_counts() {
        let one = vec![dummy_tx("a-0001", 1)];
        let three = vec![dummy_tx("a-0001", 1), dummy_tx("b-0002", 2), dummy_tx("c-0003", 3)];

        assert_eq!(merkle_root(&one), one[0].transaction_hash.0);
        let root = merkle_root(&three);
        assert_eq!(root.len(), 64);
        assert_ne!(root, merkle_root(&three[..2]));
    }
}

//! Base validity predicate for blocks.
//!
//! This validator enforces cheap, deterministic invariants that only look
//! at the block itself:
//!
//! - block size and transaction count limits,
//! - every transaction hash matches its payload,
//! - no identifier votes twice within a single block.

use std::collections::HashSet;

use crate::ledger::{BlockValidator, LedgerConfig, ValidationError};
use crate::types::Block;

/// Base validity predicate for blocks.
///
/// This struct is configured using [`LedgerConfig`] and performs purely
/// block-local checks that are inexpensive to run.
#[derive(Clone, Debug)]
pub struct BaseValidity {
    max_block_txs: usize,
    max_block_size_bytes: usize,
}

impl BaseValidity {
    /// Constructs a new `BaseValidity` from the ledger configuration.
    pub fn new(cfg: &LedgerConfig) -> Self {
        Self {
            max_block_txs: cfg.max_block_txs,
            max_block_size_bytes: cfg.max_block_size_bytes,
        }
    }

    fn check_tx_count(&self, block: &Block) -> Result<(), ValidationError> {
        let tx_count = block.transactions.len();
        if tx_count > self.max_block_txs {
            return Err(ValidationError::Custom(format!(
                "block has {} txs, exceeds max_block_txs={}",
                tx_count, self.max_block_txs
            )));
        }
        Ok(())
    }

    fn check_block_size(&self, block: &Block) -> Result<(), ValidationError> {
        let size = block.canonical_bytes().len();
        if size > self.max_block_size_bytes {
            return Err(ValidationError::Custom(format!(
                "block size {} bytes exceeds max_block_size_bytes={}",
                size, self.max_block_size_bytes
            )));
        }
        Ok(())
    }

    fn check_tx_hashes(&self, block: &Block) -> Result<(), ValidationError> {
        match block.transactions.iter().find(|tx| !tx.has_consistent_hash()) {
            Some(tx) => Err(ValidationError::Custom(format!(
                "transaction {} does not match its payload",
                tx.transaction_hash
            ))),
            None => Ok(()),
        }
    }

    fn check_duplicate_identifiers(&self, block: &Block) -> Result<(), ValidationError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for id in block.identifiers() {
            if !seen.insert(id) {
                return Err(ValidationError::Custom(format!(
                    "identifier {id} votes twice within the same block"
                )));
            }
        }
        Ok(())
    }
}

impl BlockValidator for BaseValidity {
    fn validate(&self, _parent: &Block, block: &Block) -> Result<(), ValidationError> {
        self.check_tx_count(block)?;
        self.check_block_size(block)?;
        self.check_tx_hashes(block)?;
        self.check_duplicate_identifiers(block)?;
        Ok(())
    }
}

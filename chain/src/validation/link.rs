//! Linkage and sealing predicate.
//!
//! Checks that a block extends `parent` and that its header commits to
//! its content:
//!
//! - `block_index == parent.block_index + 1`,
//! - `previous_block_hash == parent.block_hash`,
//! - `block_hash` is a well-formed digest equal to the recomputed hash,
//!   with the configured number of leading zero hex digits,
//! - `merkle_root`, when present, matches the transactions.

use crate::ledger::{BlockValidator, LedgerConfig, ValidationError};
use crate::types::Block;

#[derive(Clone, Debug)]
pub struct LinkValidity {
    difficulty: usize,
}

impl LinkValidity {
    pub fn new(cfg: &LedgerConfig) -> Self {
        Self {
            difficulty: cfg.mining_difficulty,
        }
    }
}

impl BlockValidator for LinkValidity {
    fn validate(&self, parent: &Block, block: &Block) -> Result<(), ValidationError> {
        if block.block_index != parent.block_index + 1 {
            return Err(ValidationError::Custom(format!(
                "block index {} does not follow parent index {}",
                block.block_index, parent.block_index
            )));
        }

        if block.previous_hash() != parent.hash() {
            return Err(ValidationError::Invalid(
                "previous block hash does not match parent",
            ));
        }

        if !block.hash().is_well_formed() {
            return Err(ValidationError::Invalid("block hash is not a SHA-256 digest"));
        }

        if block.compute_hash() != *block.hash() {
            return Err(ValidationError::Invalid("block hash does not match content"));
        }

        if !block.hash().meets_difficulty(self.difficulty) {
            return Err(ValidationError::Custom(format!(
                "block hash does not have {} leading zeros",
                self.difficulty
            )));
        }

        if let Some(root) = &block.block_header.merkle_root {
            if *root != block.compute_merkle_root() {
                return Err(ValidationError::Invalid("merkle root does not match transactions"));
            }
        }

        Ok(())
    }
}

//! Pending-transaction pool.
//!
//! Admitted transactions wait here, in arrival order, until a block
//! includes them.

use std::collections::{HashSet, VecDeque};

use crate::types::{Block, Transaction};

/// FIFO pool of unconfirmed transactions.
#[derive(Clone, Debug, Default)]
pub struct TxPool {
    queue: VecDeque<Transaction>,
}

impl TxPool {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Enqueues a new transaction to be included in a future block.
    pub fn push(&mut self, tx: Transaction) {
        self.queue.push_back(tx);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains_identifier(&self, identifier: &str) -> bool {
        self.queue.iter().any(|tx| tx.identifier() == identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.queue.iter()
    }

    /// Removes and returns the oldest transactions that fit into a block.
    ///
    /// `max_txs` and `max_bytes` are soft limits. A single transaction
    /// larger than `max_bytes` is still taken on its own so the pool can
    /// never wedge.
    pub fn select_for_block(&mut self, max_txs: usize, max_bytes: usize) -> Vec<Transaction> {
        let mut taken = 0usize;
        let mut bytes = 0usize;

        for tx in self.queue.iter() {
            if taken == max_txs {
                break;
            }
            let size = Transaction::canonical_bytes(&tx.data, tx.timestamp).len()
                + tx.transaction_hash.as_str().len();
            if taken > 0 && bytes + size > max_bytes {
                break;
            }
            taken += 1;
            bytes += size;
        }

        self.queue.drain(..taken).collect()
    }

    /// Puts transactions back at the front, preserving their order.
    pub fn restore(&mut self, txs: Vec<Transaction>) {
        for tx in txs.into_iter().rev() {
            self.queue.push_front(tx);
        }
    }

    /// Drops pending transactions superseded by `block`.
    ///
    /// A transaction is superseded if the block carries the same hash or a
    /// vote from the same identifier.
    pub fn remove_confirmed(&mut self, block: &Block) -> usize {
        let hashes: HashSet<&str> = block
            .transactions
            .iter()
            .map(|tx| tx.transaction_hash.as_str())
            .collect();
        let identifiers: HashSet<&str> = block.identifiers().collect();

        let before = self.queue.len();
        self.queue.retain(|tx| {
            !hashes.contains(tx.transaction_hash.as_str()) && !identifiers.contains(tx.identifier())
        });
        before - self.queue.len()
    }

    /// Keeps only the transactions whose identifier is not in `confirmed`.
    pub fn retain_unconfirmed(&mut self, confirmed: &HashSet<String>) {
        self.queue.retain(|tx| !confirmed.contains(tx.identifier()));
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

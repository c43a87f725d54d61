/// Ledger configuration parameters.
///
/// This includes both protocol-level knobs (e.g. sealing difficulty,
/// identifier shape) and implementation-level limits (e.g. maximum
/// transactions per block).
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Soft limit on the number of transactions per block.
    pub max_block_txs: usize,
    /// Soft limit on the total serialized size of a block, in bytes.
    pub max_block_size_bytes: usize,
    /// Whether mining with an empty pending pool produces a block.
    pub allow_empty_blocks: bool,
    /// Leading zero hex digits required of a block hash.
    ///
    /// Must match on every node. Blocks sealed below the local difficulty
    /// are rejected, and a stored chain sealed under a lower one makes
    /// [`Ledger::open`](super::Ledger::open) fail.
    pub mining_difficulty: usize,
    /// Shortest accepted non-digest identifier.
    pub min_identifier_len: usize,
    /// Longest accepted non-digest identifier.
    pub max_identifier_len: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_block_txs: 10_000,
            max_block_size_bytes: 1_000_000,
            allow_empty_blocks: true,
            mining_difficulty: 2,
            min_identifier_len: 5,
            max_identifier_len: 64,
        }
    }
}

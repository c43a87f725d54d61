//! Persistence boundary used by the ledger and the tally.

use crate::storage::StorageError;
use crate::types::{Announcement, Block, Candidate, Citizen, Results, Voter};

/// Key-value persistence for every collection a node owns.
///
/// Implementations can be backed by in-memory maps, RocksDB, etc. All
/// methods take `&self` so one store can be shared between the ledger,
/// the tally contract and background tasks.
///
/// Writes that replace a collection (`write_chain`, `write_candidates`,
/// `write_citizens`) drop whatever was stored before.
pub trait VoteStore: Send + Sync {
    fn read_chain(&self) -> Result<Vec<Block>, StorageError>;
    fn write_chain(&self, chain: &[Block]) -> Result<(), StorageError>;
    fn clear_chains(&self) -> Result<(), StorageError>;

    fn read_voters(&self) -> Result<Vec<Voter>, StorageError>;
    fn read_voter(&self, identifier: &str) -> Result<Option<Voter>, StorageError>;
    /// Inserts or overwrites the voter stored under `identifier`.
    fn update_voter(&self, identifier: &str, voter: &Voter) -> Result<(), StorageError>;
    fn clear_voters(&self) -> Result<(), StorageError>;

    fn read_candidates(&self) -> Result<Vec<Candidate>, StorageError>;
    fn write_candidates(&self, candidates: &[Candidate]) -> Result<(), StorageError>;

    fn read_citizens(&self) -> Result<Vec<Citizen>, StorageError>;
    fn write_citizens(&self, citizens: &[Citizen]) -> Result<(), StorageError>;

    fn read_announcement(&self) -> Result<Option<Announcement>, StorageError>;
    fn write_announcement(&self, announcement: &Announcement) -> Result<(), StorageError>;

    fn read_results(&self) -> Result<Option<Results>, StorageError>;
    fn write_results(&self, results: &Results) -> Result<(), StorageError>;
    fn clear_results(&self) -> Result<(), StorageError>;

    /// Resolves a citizen's plaintext electoral ID to their voting identifier.
    fn read_voter_citizen_relation(
        &self,
        electoral_id: &str,
    ) -> Result<Option<String>, StorageError>;
    fn write_voter_citizen_relation(
        &self,
        electoral_id: &str,
        identifier: &str,
    ) -> Result<(), StorageError>;
}

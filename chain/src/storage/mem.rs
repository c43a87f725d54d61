//! In-memory vote store.
//!
//! This implementation is useful for unit tests and `--in-memory` nodes.
//! Every collection lives behind a single mutex; nothing survives a
//! restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::ledger::store::VoteStore;
use crate::types::{Announcement, Block, Candidate, Citizen, Results, Voter};

use super::StorageError;

#[derive(Default)]
struct Collections {
    chain: Vec<Block>,
    voters: BTreeMap<String, Voter>,
    candidates: Vec<Candidate>,
    citizens: Vec<Citizen>,
    relations: HashMap<String, String>,
    announcement: Option<Announcement>,
    results: Option<Results>,
}

/// In-memory implementation of [`VoteStore`].
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Collections>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl VoteStore for InMemoryStore {
    fn read_chain(&self) -> Result<Vec<Block>, StorageError> {
        Ok(self.lock()?.chain.clone())
    }

    fn write_chain(&self, chain: &[Block]) -> Result<(), StorageError> {
        self.lock()?.chain = chain.to_vec();
        Ok(())
    }

    fn clear_chains(&self) -> Result<(), StorageError> {
        self.lock()?.chain.clear();
        Ok(())
    }

    fn read_voters(&self) -> Result<Vec<Voter>, StorageError> {
        Ok(self.lock()?.voters.values().cloned().collect())
    }

    fn read_voter(&self, identifier: &str) -> Result<Option<Voter>, StorageError> {
        Ok(self.lock()?.voters.get(identifier).cloned())
    }

    fn update_voter(&self, identifier: &str, voter: &Voter) -> Result<(), StorageError> {
        self.lock()?
            .voters
            .insert(identifier.to_string(), voter.clone());
        Ok(())
    }

    fn clear_voters(&self) -> Result<(), StorageError> {
        self.lock()?.voters.clear();
        Ok(())
    }

    fn read_candidates(&self) -> Result<Vec<Candidate>, StorageError> {
        Ok(self.lock()?.candidates.clone())
    }

    fn write_candidates(&self, candidates: &[Candidate]) -> Result<(), StorageError> {
        self.lock()?.candidates = candidates.to_vec();
        Ok(())
    }

    fn read_citizens(&self) -> Result<Vec<Citizen>, StorageError> {
        Ok(self.lock()?.citizens.clone())
    }

    fn write_citizens(&self, citizens: &[Citizen]) -> Result<(), StorageError> {
        self.lock()?.citizens = citizens.to_vec();
        Ok(())
    }

    fn read_announcement(&self) -> Result<Option<Announcement>, StorageError> {
        Ok(self.lock()?.announcement.clone())
    }

    fn write_announcement(&self, announcement: &Announcement) -> Result<(), StorageError> {
        self.lock()?.announcement = Some(announcement.clone());
        Ok(())
    }

    fn read_results(&self) -> Result<Option<Results>, StorageError> {
        Ok(self.lock()?.results.clone())
    }

    fn write_results(&self, results: &Results) -> Result<(), StorageError> {
        self.lock()?.results = Some(results.clone());
        Ok(())
    }

    fn clear_results(&self) -> Result<(), StorageError> {
        self.lock()?.results = None;
        Ok(())
    }

    fn read_voter_citizen_relation(
        &self,
        electoral_id: &str,
    ) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.relations.get(electoral_id).cloned())
    }

    fn write_voter_citizen_relation(
        &self,
        electoral_id: &str,
        identifier: &str,
    ) -> Result<(), StorageError> {
        self.lock()?
            .relations
            .insert(electoral_id.to_string(), identifier.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dummy_voter(identifier: &str) -> Voter {
        Voter {
            identifier: identifier.to_string(),
            electoral_id: "aa".to_string(),
            electoral_iv: "bb".to_string(),
            choice_code: "cc".to_string(),
            iv: "dd".to_string(),
            state: true,
            vote_time: Utc::now(),
        }
    }

    #[test]
    fn chain_write_replaces_previous_chain() {
        let store = InMemoryStore::new();
        store
            .write_chain(&[Block::genesis(), Block::genesis()])
            .expect("write");
        store.write_chain(&[Block::genesis()]).expect("write");

        assert_eq!(store.read_chain().expect("read").len(), 1);

        store.clear_chains().expect("clear");
        assert!(store.read_chain().expect("read").is_empty());
    }

    #[test]
    fn update_voter_overwrites_by_identifier() {
        let store = InMemoryStore::new();
        let mut voter = dummy_voter("voter-0001");
        store.update_voter("voter-0001", &voter).expect("insert");

        voter.choice_code = "ee".to_string();
        store.update_voter("voter-0001", &voter).expect("update");

        let voters = store.read_voters().expect("read");
        assert_eq!(voters.len(), 1);
        assert_eq!(voters[0].choice_code, "ee");
        assert!(store.read_voter("missing").expect("read").is_none());

        store.clear_voters().expect("clear");
        assert!(store.read_voters().expect("read").is_empty());
    }

    #[test]
    fn relation_lookup_resolves_identifier() {
        let store = InMemoryStore::new();
        store
            .write_voter_citizen_relation("AO-000123", "voter-0001")
            .expect("write");

        assert_eq!(
            store
                .read_voter_citizen_relation("AO-000123")
                .expect("read")
                .as_deref(),
            Some("voter-0001")
        );
        assert!(
            store
                .read_voter_citizen_relation("AO-999999")
                .expect("read")
                .is_none()
        );
    }
}

//! RocksDB-backed vote store.
//!
//! This implementation persists every collection in its own column
//! family:
//!
//! - `"chain"`:      big-endian block index -> block,
//! - `"voters"`:     identifier -> voter,
//! - `"candidates"`: candidate code -> candidate,
//! - `"citizens"`:   electoral ID -> citizen,
//! - `"relations"`:  electoral ID -> identifier (raw UTF-8),
//! - `"election"`:   fixed keys `"announcement"` and `"results"`.
//!
//! Values are encoded with bincode 2 (serde integration, `standard()`
//! config). Replacing a collection is a single atomic `WriteBatch`.

use std::path::Path;

use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ledger::store::VoteStore;
use crate::types::{Announcement, Block, Candidate, Citizen, Results, Voter};

use super::StorageError;

const CF_CHAIN: &str = "chain";
const CF_VOTERS: &str = "voters";
const CF_CANDIDATES: &str = "candidates";
const CF_CITIZENS: &str = "citizens";
const CF_RELATIONS: &str = "relations";
const CF_ELECTION: &str = "election";

const KEY_ANNOUNCEMENT: &[u8] = b"announcement";
const KEY_RESULTS: &[u8] = b"results";

/// Configuration for [`RocksDbStore`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: String,
    /// Whether to create the database and missing column families if they
    /// do not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "data/votechain-db".to_string(),
            create_if_missing: true,
        }
    }
}

/// RocksDB-backed implementation of [`VoteStore`].
pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    /// Opens (or creates) a RocksDB-backed store at the configured path.
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StorageError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = [
            "default",
            CF_CHAIN,
            CF_VOTERS,
            CF_CANDIDATES,
            CF_CITIZENS,
            CF_RELATIONS,
            CF_ELECTION,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        tracing::info!(path = %cfg.path, "opened rocksdb vote store");

        Ok(Self { db })
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or(StorageError::MissingColumnFamily(name))
    }

    fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<Vec<u8>, StorageError> {
        bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|source| StorageError::Encode { what, source })
    }

    fn decode<T: DeserializeOwned>(what: &'static str, bytes: &[u8]) -> Result<T, StorageError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(value, _)| value)
            .map_err(|source| StorageError::Decode { what, source })
    }

    /// Decodes every value of a column family, in key order.
    fn read_all<T: DeserializeOwned>(&self, name: &'static str) -> Result<Vec<T>, StorageError> {
        let cf = self.cf(name)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            out.push(Self::decode(name, &value)?);
        }
        Ok(out)
    }

    fn get<T: DeserializeOwned>(
        &self,
        name: &'static str,
        key: &[u8],
    ) -> Result<Option<T>, StorageError> {
        let cf = self.cf(name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(Self::decode(name, &bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, name: &'static str, key: &[u8], value: &T) -> Result<(), StorageError> {
        let cf = self.cf(name)?;
        let bytes = Self::encode(name, value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    /// Adds a delete for every key of `name` to `batch`.
    fn stage_clear(&self, batch: &mut WriteBatch, name: &'static str) -> Result<(), StorageError> {
        let cf = self.cf(name)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            batch.delete_cf(cf, key);
        }
        Ok(())
    }

    fn clear(&self, name: &'static str) -> Result<(), StorageError> {
        let mut batch = WriteBatch::default();
        self.stage_clear(&mut batch, name)?;
        self.db.write(batch)?;
        Ok(())
    }

    /// Replaces the whole content of `name` with `items` in one batch.
    fn replace_all<'a, T, K>(
        &self,
        name: &'static str,
        items: impl IntoIterator<Item = &'a T>,
        key_of: K,
    ) -> Result<(), StorageError>
    where
        T: Serialize + 'a,
        K: Fn(&T) -> Vec<u8>,
    {
        let mut batch = WriteBatch::default();
        self.stage_clear(&mut batch, name)?;
        let cf = self.cf(name)?;
        for item in items {
            batch.put_cf(cf, key_of(item), Self::encode(name, item)?);
        }
        self.db.write(batch)?;
        Ok(())
    }
}

impl VoteStore for RocksDbStore {
    fn read_chain(&self) -> Result<Vec<Block>, StorageError> {
        // Big-endian keys make iteration order equal to block order.
        self.read_all(CF_CHAIN)
    }

    fn write_chain(&self, chain: &[Block]) -> Result<(), StorageError> {
        self.replace_all(CF_CHAIN, chain, |b: &Block| b.block_index.to_be_bytes().to_vec())
    }

    fn clear_chains(&self) -> Result<(), StorageError> {
        self.clear(CF_CHAIN)
    }

    fn read_voters(&self) -> Result<Vec<Voter>, StorageError> {
        self.read_all(CF_VOTERS)
    }

    fn read_voter(&self, identifier: &str) -> Result<Option<Voter>, StorageError> {
        self.get(CF_VOTERS, identifier.as_bytes())
    }

    fn update_voter(&self, identifier: &str, voter: &Voter) -> Result<(), StorageError> {
        self.put(CF_VOTERS, identifier.as_bytes(), voter)
    }

    fn clear_voters(&self) -> Result<(), StorageError> {
        self.clear(CF_VOTERS)
    }

    fn read_candidates(&self) -> Result<Vec<Candidate>, StorageError> {
        self.read_all(CF_CANDIDATES)
    }

    fn write_candidates(&self, candidates: &[Candidate]) -> Result<(), StorageError> {
        self.replace_all(CF_CANDIDATES, candidates, |c: &Candidate| {
            c.code.as_bytes().to_vec()
        })
    }

    fn read_citizens(&self) -> Result<Vec<Citizen>, StorageError> {
        self.read_all(CF_CITIZENS)
    }

    fn write_citizens(&self, citizens: &[Citizen]) -> Result<(), StorageError> {
        self.replace_all(CF_CITIZENS, citizens, |c: &Citizen| {
            c.electoral_id.as_bytes().to_vec()
        })
    }

    fn read_announcement(&self) -> Result<Option<Announcement>, StorageError> {
        self.get(CF_ELECTION, KEY_ANNOUNCEMENT)
    }

    fn write_announcement(&self, announcement: &Announcement) -> Result<(), StorageError> {
        self.put(CF_ELECTION, KEY_ANNOUNCEMENT, announcement)
    }

    fn read_results(&self) -> Result<Option<Results>, StorageError> {
        self.get(CF_ELECTION, KEY_RESULTS)
    }

    fn write_results(&self, results: &Results) -> Result<(), StorageError> {
        self.put(CF_ELECTION, KEY_RESULTS, results)
    }

    fn clear_results(&self) -> Result<(), StorageError> {
        let cf = self.cf(CF_ELECTION)?;
        self.db.delete_cf(cf, KEY_RESULTS)?;
        Ok(())
    }

    fn read_voter_citizen_relation(
        &self,
        electoral_id: &str,
    ) -> Result<Option<String>, StorageError> {
        let cf = self.cf(CF_RELATIONS)?;
        Ok(self
            .db
            .get_cf(cf, electoral_id.as_bytes())?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn write_voter_citizen_relation(
        &self,
        electoral_id: &str,
        identifier: &str,
    ) -> Result<(), StorageError> {
        let cf = self.cf(CF_RELATIONS)?;
        self.db
            .put_cf(cf, electoral_id.as_bytes(), identifier.as_bytes())?;
        Ok(())
    }
}

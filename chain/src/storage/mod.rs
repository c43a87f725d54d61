//! Storage backends for the voting node.
//!
//! This module provides concrete implementations of the
//! [`crate::ledger::store::VoteStore`] trait:
//!
//! - an in-memory store ([`mem::InMemoryStore`]) suitable for tests and
//!   throwaway nodes,
//! - a RocksDB-backed store ([`rocksdb::RocksDbStore`]) for persistent
//!   provincial nodes.

use thiserror::Error;

pub mod mem;
pub mod rocksdb;

pub use mem::InMemoryStore;
pub use rocksdb::{RocksDbConfig, RocksDbStore};

/// Storage-level error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying RocksDB error.
    #[error("rocksdb: {0}")]
    RocksDb(#[from] ::rocksdb::Error),
    /// Required column family was not found.
    #[error("missing column family {0:?}")]
    MissingColumnFamily(&'static str),
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: bincode::error::EncodeError,
    },
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: bincode::error::DecodeError,
    },
    /// A writer panicked while holding the in-memory store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

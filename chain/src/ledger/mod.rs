//! Ledger: chain state, admission and replacement.
//!
//! - [`engine::Ledger`] owns the chain and the pending pool.
//! - [`validator::BlockValidator`] and [`fork_choice::ForkChoice`] are the
//!   pluggable rules it runs.
//! - [`store::VoteStore`] is the persistence boundary shared with the
//!   tally contract.

pub mod config;
pub mod engine;
pub mod error;
pub mod fork_choice;
pub mod pool;
pub mod store;
pub mod validator;

pub use config::LedgerConfig;
pub use engine::Ledger;
pub use error::{LedgerError, StateError, ValidationError};
pub use fork_choice::{ForkChoice, LongestChainForkChoice};
pub use pool::TxPool;
pub use store::VoteStore;
pub use validator::{BlockValidator, CombinedValidator};

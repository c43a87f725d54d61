//! Block validity predicates for the ledger.
//!
//! This module implements concrete block validators that plug into the
//! ledger via [`crate::ledger::validator::BlockValidator`].
//!
//! It currently provides:
//!
//! - [`base::BaseValidity`]: cheap structural, size and per-block
//!   double-vote checks.
//! - [`link::LinkValidity`]: index continuity, parent linkage, hash
//!   recomputation, sealing difficulty and Merkle root.

pub mod base;
pub mod link;

pub use base::BaseValidity;
pub use link::LinkValidity;

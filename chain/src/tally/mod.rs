//! Tally engine.
//!
//! - [`engine`]: the pure replay function and the winner rule.
//! - [`contract`]: the election lifecycle, store reloads and result
//!   persistence around it.

pub mod contract;
pub mod engine;

pub use contract::ElectionContract;
pub use engine::{TallyError, TallySnapshot, tally, winning_candidate};

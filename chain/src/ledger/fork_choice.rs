//! Fork-choice rule for selecting the best chain.

use crate::types::Block;

/// Abstraction over fork-choice rules.
///
/// Given the current chain and a candidate chain, a fork-choice
/// implementation decides whether the candidate should replace it. It
/// does not check validity; callers validate the winner separately.
pub trait ForkChoice {
    /// Returns `true` if `candidate` should replace `current`.
    fn should_replace(&self, current: &[Block], candidate: &[Block]) -> bool;

    /// Picks the preferred chain among `candidates`, scanning in order.
    ///
    /// Returns the index of the winner, or `None` if `candidates` is empty.
    /// Earlier candidates win ties.
    fn select(&self, candidates: &[&[Block]]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, chain) in candidates.iter().enumerate() {
            match best {
                None => best = Some(i),
                Some(b) if self.should_replace(candidates[b], chain) => best = Some(i),
                Some(_) => {}
            }
        }
        best
    }
}

/// Simple "longest chain" fork choice.
///
/// - A candidate strictly longer than the current chain replaces it.
/// - If the lengths are equal or the candidate is shorter, the current
///   chain remains unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct LongestChainForkChoice;

impl ForkChoice for LongestChainForkChoice {
    fn should_replace(&self, current: &[Block], candidate: &[Block]) -> bool {
        candidate.len() > current.len()
    }
}

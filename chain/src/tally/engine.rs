//! Tally replay.
//!
//! [`tally`] recomputes every derived count from scratch: candidate
//! `num_votes` start at zero, every province starts with an explicit zero
//! for each party, and a per-pass processed set guarantees that each
//! identifier is counted at most once. Running it twice over the same
//! snapshot yields the same numbers.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::TallyConfig;
use crate::crypto::{CipherSuite, CryptoError};
use crate::storage::StorageError;
use crate::types::{
    Announcement, Candidate, CandidateResult, Citizen, ElectionState, ProvinceTally, Results, Voter,
};

/// Errors raised by the tally.
#[derive(Debug, Error)]
pub enum TallyError {
    #[error("no election announcement has been published")]
    MissingAnnouncement,
    #[error("announcement voting window ends before it starts")]
    InvalidWindow,
    #[error("voter record is missing encrypted identity fields")]
    InvalidVoter,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("failed to persist results: {0}")]
    Persistence(#[from] StorageError),
}

/// Immutable inputs of one replay.
#[derive(Clone, Debug, Default)]
pub struct TallySnapshot {
    pub candidates: Vec<Candidate>,
    pub voters: Vec<Voter>,
    pub citizens: Vec<Citizen>,
    pub announcement: Option<Announcement>,
}

/// Why a voter record was not counted.
enum Skip {
    OutsideWindow,
    Undecryptable(CryptoError),
    UnknownCandidate(String),
}

/// Mutable accumulators of one replay.
struct Pass<'a> {
    candidates: Vec<Candidate>,
    by_code: HashMap<String, usize>,
    citizens: HashMap<&'a str, &'a Citizen>,
    provinces: BTreeMap<String, ProvinceTally>,
}

impl Pass<'_> {
    /// Counts one ballot.
    fn place_vote(
        &mut self,
        voter: &Voter,
        announcement: &Announcement,
        state: ElectionState,
        ciphers: &CipherSuite,
    ) -> Result<(), Skip> {
        if !state.is_live() || !announcement.window_contains(voter.vote_time) {
            return Err(Skip::OutsideWindow);
        }

        let choice = ciphers
            .vote
            .decrypt(&voter.choice_cipher())
            .map_err(Skip::Undecryptable)?;
        let code = choice.trim();

        let idx = *self
            .by_code
            .get(code)
            .ok_or_else(|| Skip::UnknownCandidate(code.to_string()))?;
        self.candidates[idx].num_votes += 1;

        self.record_province(voter, idx, ciphers);
        Ok(())
    }

    /// Attributes a counted vote to the voter's province.
    ///
    /// Failures are logged only; the vote itself stays counted.
    fn record_province(&mut self, voter: &Voter, idx: usize, ciphers: &CipherSuite) {
        let electoral_id = match ciphers.identifier.decrypt(&voter.electoral_id_cipher()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(identifier = %voter.identifier, error = %e, "cannot decrypt electoral id");
                return;
            }
        };

        let Some(citizen) = self.citizens.get(electoral_id.as_str()) else {
            tracing::info!(identifier = %voter.identifier, "citizen not found for voter");
            return;
        };

        let party = &self.candidates[idx].party;
        match self.provinces.get_mut(&citizen.province) {
            Some(stats) => {
                if !stats.record(party) {
                    tracing::warn!(party = %party, "party missing from province statistics");
                }
            }
            None => {
                tracing::info!(province = %citizen.province, "vote from unknown province not attributed");
            }
        }
    }
}

/// Replays `snapshot.voters` against the reference data.
///
/// A voter counts when it is confirmed (`state == true`), is not a
/// sentinel, has not been counted earlier in this pass, was cast inside
/// the announced window while the election is live, and decrypts to a
/// known candidate code.
///
/// The window test uses each ballot's recorded `vote_time`, not the time
/// of the replay: a replay after the window closes still counts ballots
/// cast inside it, and a ballot stamped outside it is never counted.
pub fn tally(
    snapshot: &TallySnapshot,
    ciphers: &CipherSuite,
    config: &TallyConfig,
    state: ElectionState,
    now: DateTime<Utc>,
) -> Result<Results, TallyError> {
    let announcement = snapshot
        .announcement
        .as_ref()
        .ok_or(TallyError::MissingAnnouncement)?;
    if !announcement.has_valid_window() {
        return Err(TallyError::InvalidWindow);
    }

    let candidates: Vec<Candidate> = snapshot
        .candidates
        .iter()
        .cloned()
        .map(|mut c| {
            c.num_votes = 0;
            c
        })
        .collect();
    let by_code = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (c.code.clone(), i))
        .collect();

    let parties: BTreeSet<&str> = snapshot.candidates.iter().map(|c| c.party.as_str()).collect();
    let provinces = config
        .provinces
        .iter()
        .map(|p| (p.clone(), ProvinceTally::zeroed(parties.iter().copied())))
        .collect();

    let mut pass = Pass {
        candidates,
        by_code,
        citizens: snapshot
            .citizens
            .iter()
            .map(|c| (c.electoral_id.as_str(), c))
            .collect(),
        provinces,
    };

    let mut processed: HashSet<&str> = HashSet::new();
    let mut counted: u64 = 0;
    let mut sum_minutes: f64 = 0.0;

    for voter in &snapshot.voters {
        let id = voter.identifier.as_str();
        if processed.contains(id) {
            tracing::debug!(identifier = %id, "voter already counted in this pass");
            continue;
        }
        if config.sentinel_identifiers.iter().any(|s| s == id) {
            continue;
        }
        if !voter.state {
            continue;
        }

        match pass.place_vote(voter, announcement, state, ciphers) {
            Ok(()) => {
                processed.insert(id);
                counted += 1;
                let minutes = (voter.vote_time - announcement.start_time_voting).num_milliseconds()
                    as f64
                    / 60_000.0;
                if minutes >= 0.0 {
                    sum_minutes += minutes;
                }
            }
            Err(Skip::Undecryptable(e)) => {
                tracing::warn!(identifier = %id, error = %e, "cannot decrypt ballot; skipped");
            }
            Err(Skip::UnknownCandidate(code)) => {
                tracing::info!(identifier = %id, code = %code, "candidate does not exist; skipped");
            }
            Err(Skip::OutsideWindow) => {
                tracing::debug!(identifier = %id, "ballot outside the voting window; skipped");
            }
        }
    }

    let winner = winning_candidate(&pass.candidates).cloned();

    let num_voters = announcement.num_of_voters;
    let candidates_result = pass
        .candidates
        .iter()
        .map(|c| CandidateResult {
            num_votes: c.num_votes,
            percentage: if num_voters > 0 {
                (c.num_votes as f64 * 100.0) / num_voters as f64
            } else {
                0.0
            },
            candidate: c.clone(),
        })
        .collect();

    let province_sum: u64 = pass.provinces.values().map(|p| p.sum).sum();
    let average_vote_per_province = if config.provinces.is_empty() {
        0.0
    } else {
        province_sum as f64 / config.provinces.len() as f64
    };

    let mut votes_per_party: BTreeMap<String, u64> =
        parties.iter().map(|p| (p.to_string(), 0)).collect();
    for stats in pass.provinces.values() {
        for (party, n) in &stats.parties {
            *votes_per_party.entry(party.clone()).or_default() += n;
        }
    }

    let days = (announcement.end_time_voting.date_naive() - announcement.start_time_voting.date_naive())
        .num_days()
        .max(0)
        + 1;

    Ok(Results {
        start_time: announcement.start_time_voting.timestamp_millis(),
        end_time: announcement.end_time_voting.timestamp_millis(),
        winner,
        expected_total_votes: num_voters,
        total_votes_received: counted,
        total_candidates: announcement.num_of_candidates,
        average_time_per_vote: if counted > 0 {
            sum_minutes / counted as f64
        } else {
            0.0
        },
        candidates_result,
        votes_per_province: pass.provinces,
        average_vote_per_province,
        votes_per_day: counted as f64 / days as f64,
        votes_per_party,
        computed_at: now,
    })
}

/// Returns the candidate with strictly the most votes.
///
/// `None` when nobody has a vote or when two or more candidates share the
/// maximum.
pub fn winning_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    let top = candidates.iter().max_by_key(|c| c.num_votes)?;
    if top.num_votes == 0 {
        return None;
    }
    let tied = candidates
        .iter()
        .filter(|c| c.num_votes == top.num_votes)
        .count();
    (tied == 1).then_some(top)
}

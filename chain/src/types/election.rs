//! Election reference data and tally outputs.
//!
//! Candidates, citizens and the announcement are committee-owned reference
//! data read from the store. Voters are materialised from confirmed
//! transactions. [`Results`] is the only artefact the tally publishes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CipherText, Transaction};

/// Converts a millisecond Unix timestamp to UTC, clamping bad values to the epoch.
pub fn millis_to_utc(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Post-confirmation view of a vote, keyed by its pseudonymous identifier.
///
/// `state == true` means the vote is confirmed on-chain and eligible for
/// the tally; the tally never writes this flag back.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    pub identifier: String,
    /// Electoral ID ciphertext (identifier key domain).
    pub electoral_id: String,
    #[serde(rename = "electoralIV")]
    pub electoral_iv: String,
    /// Ballot choice ciphertext (vote key domain).
    pub choice_code: String,
    #[serde(rename = "IV")]
    pub iv: String,
    pub state: bool,
    pub vote_time: DateTime<Utc>,
}

impl Voter {
    /// Materialises a confirmed voter record from an on-chain transaction.
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            identifier: tx.data.identifier.clone(),
            electoral_id: tx.data.electoral_id.clone(),
            electoral_iv: tx.data.electoral_id_iv.clone(),
            choice_code: tx.data.choice_code.clone(),
            iv: tx.data.choice_code_iv.clone(),
            state: true,
            vote_time: millis_to_utc(tx.timestamp),
        }
    }

    pub fn electoral_id_cipher(&self) -> CipherText {
        CipherText::new(self.electoral_iv.clone(), self.electoral_id.clone())
    }

    pub fn choice_cipher(&self) -> CipherText {
        CipherText::new(self.iv.clone(), self.choice_code.clone())
    }
}

/// A voter whose electoral ID has been decrypted by the committee.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedVoter {
    pub electoral_id: String,
    pub identifier: String,
}

/// Candidate on the ballot. `num_votes` is only written by a tally replay.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub code: String,
    pub name: String,
    pub party: String,
    pub acronym: String,
    pub status: String,
    pub num_votes: u64,
}

/// Citizen registry entry. Held by the committee only, never on-chain.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citizen {
    pub electoral_id: String,
    #[serde(default)]
    pub name: String,
    pub province: String,
}

/// Published election parameters; the voting window is inclusive.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub start_time_voting: DateTime<Utc>,
    pub end_time_voting: DateTime<Utc>,
    pub num_of_voters: u64,
    pub num_of_candidates: u64,
    pub date_created: DateTime<Utc>,
}

impl Announcement {
    /// Returns `true` if `at` falls inside `[start_time_voting, end_time_voting]`.
    pub fn window_contains(&self, at: DateTime<Utc>) -> bool {
        self.start_time_voting <= at && at <= self.end_time_voting
    }

    pub fn has_valid_window(&self) -> bool {
        self.start_time_voting <= self.end_time_voting
    }
}

/// Per-candidate row of [`Results`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub num_votes: u64,
    /// Share of the expected electorate (`numOfVoters`), in percent.
    pub percentage: f64,
    pub candidate: Candidate,
}

/// Vote counts for one province.
///
/// Every known party starts at zero, so a missing key always means an
/// unknown party rather than "no votes yet".
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProvinceTally {
    pub parties: BTreeMap<String, u64>,
    pub sum: u64,
}

impl ProvinceTally {
    /// Builds a tally with an explicit zero for every party.
    pub fn zeroed<'a>(parties: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            parties: parties.into_iter().map(|p| (p.to_string(), 0)).collect(),
            sum: 0,
        }
    }

    /// Records one vote for `party`. Returns `false` if the party is unknown.
    pub fn record(&mut self, party: &str) -> bool {
        match self.parties.get_mut(party) {
            Some(count) => {
                *count += 1;
                self.sum += 1;
                true
            }
            None => false,
        }
    }
}

/// Certified snapshot produced by a tally replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    /// Voting window start, milliseconds since Unix epoch.
    pub start_time: i64,
    /// Voting window end, milliseconds since Unix epoch.
    pub end_time: i64,
    /// `None` on a tie for first place or when no vote was counted.
    pub winner: Option<Candidate>,
    pub expected_total_votes: u64,
    pub total_votes_received: u64,
    pub total_candidates: u64,
    /// Mean minutes between window start and each counted vote.
    pub average_time_per_vote: f64,
    pub candidates_result: Vec<CandidateResult>,
    pub votes_per_province: BTreeMap<String, ProvinceTally>,
    pub average_vote_per_province: f64,
    pub votes_per_day: f64,
    pub votes_per_party: BTreeMap<String, u64>,
    pub computed_at: DateTime<Utc>,
}

/// Election lifecycle.
///
/// `Announced` is part of the lifecycle but the refresh path currently
/// moves `Created` straight to `Started`; that edge is listed explicitly
/// in [`ElectionState::can_transition_to`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElectionState {
    Created,
    Announced,
    Started,
    Happening,
    Ended,
}

/// Rejected lifecycle transition.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("illegal election state transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: ElectionState,
    pub to: ElectionState,
}

impl ElectionState {
    /// Enumerates the legal edges of the lifecycle.
    pub fn can_transition_to(self, next: ElectionState) -> bool {
        use ElectionState::*;
        matches!(
            (self, next),
            (Created, Announced)
                | (Created, Started)
                | (Announced, Started)
                | (Started, Happening)
                | (Started, Ended)
                | (Happening, Ended)
        )
    }

    pub fn transition(self, next: ElectionState) -> Result<ElectionState, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// States in which ballots may be admitted or counted.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ElectionState::Started | ElectionState::Happening | ElectionState::Ended
        )
    }
}

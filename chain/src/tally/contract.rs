//! Election contract: the stateful shell around [`tally`].
//!
//! The contract owns the election lifecycle and a cached
//! [`TallySnapshot`]. Every [`ElectionContract::update`] reloads the
//! snapshot from the store. Load failures degrade to empty data and are
//! logged, because tallying is advisory reporting and must not take the
//! ledger down with it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::TallyConfig;
use crate::crypto::CipherSuite;
use crate::ledger::store::VoteStore;
use crate::storage::StorageError;
use crate::types::{
    Announcement, Candidate, ElectionState, InvalidTransition, Results, RevealedVoter, Voter,
};

use super::engine::{TallyError, TallySnapshot, tally};

/// Logs a failed read and falls back to the default value.
fn or_empty<T: Default>(entity: &'static str, read: Result<T, StorageError>) -> T {
    read.unwrap_or_else(|e| {
        tracing::error!(entity, error = %e, "failed to load election data");
        T::default()
    })
}

pub struct ElectionContract<S: ?Sized> {
    store: Arc<S>,
    ciphers: CipherSuite,
    config: TallyConfig,
    state: ElectionState,
    snapshot: TallySnapshot,
    results: Option<Results>,
}

impl<S> ElectionContract<S>
where
    S: VoteStore + ?Sized,
{
    /// Creates the contract and performs the initial [`update`](Self::update).
    pub fn new(store: Arc<S>, ciphers: CipherSuite, config: TallyConfig) -> Self {
        let mut contract = Self {
            store,
            ciphers,
            config,
            state: ElectionState::Created,
            snapshot: TallySnapshot::default(),
            results: None,
        };
        contract.update();
        contract
    }

    /// Reloads all reference data and opens the election.
    ///
    /// A freshly created (or announced) election moves to `Started`; later
    /// states are left alone.
    pub fn update(&mut self) {
        self.snapshot = TallySnapshot {
            candidates: or_empty("candidates", self.store.read_candidates()),
            voters: or_empty("voters", self.store.read_voters()),
            citizens: or_empty("citizens", self.store.read_citizens()),
            announcement: or_empty("announcement", self.store.read_announcement()),
        };
        self.results = or_empty("results", self.store.read_results());

        if matches!(self.state, ElectionState::Created | ElectionState::Announced) {
            if let Err(e) = self.transition(ElectionState::Started) {
                tracing::warn!(error = %e, "election could not be started");
            }
        }
    }

    pub fn state(&self) -> ElectionState {
        self.state
    }

    /// Moves the lifecycle along one of its legal edges.
    pub fn transition(&mut self, next: ElectionState) -> Result<ElectionState, InvalidTransition> {
        self.state = self.state.transition(next)?;
        tracing::info!(state = ?self.state, "election state changed");
        Ok(self.state)
    }

    /// Advances `Started`/`Happening` according to the announced window.
    fn advance_with_clock(&mut self, now: DateTime<Utc>) {
        let Some(announcement) = &self.snapshot.announcement else {
            return;
        };
        let next = if now > announcement.end_time_voting {
            ElectionState::Ended
        } else if announcement.window_contains(now) {
            ElectionState::Happening
        } else {
            return;
        };
        if self.state != next && self.state.can_transition_to(next) {
            // Legal by the check above.
            let _ = self.transition(next);
        }
    }

    pub fn ciphers(&self) -> &CipherSuite {
        &self.ciphers
    }

    pub fn config(&self) -> &TallyConfig {
        &self.config
    }

    /// Returns `true` if ballots may be admitted at `now`.
    pub fn is_valid_election_time(&self, now: DateTime<Utc>) -> bool {
        match &self.snapshot.announcement {
            Some(a) if a.has_valid_window() => self.state.is_live() && a.window_contains(now),
            Some(_) => {
                tracing::error!("announcement has an invalid voting window");
                false
            }
            None => false,
        }
    }

    /// Re-reads the announcement from the store.
    pub fn get_announcement(&mut self) -> Option<Announcement> {
        match self.store.read_announcement() {
            Ok(a) => self.snapshot.announcement = a,
            Err(e) => tracing::error!(error = %e, "failed to load announcement"),
        }
        self.snapshot.announcement.clone()
    }

    /// Replays every confirmed vote and persists the resulting snapshot.
    pub fn get_results(&mut self, now: DateTime<Utc>) -> Result<Results, TallyError> {
        self.update();
        self.advance_with_clock(now);

        let results = tally(&self.snapshot, &self.ciphers, &self.config, self.state, now)?;
        self.store.write_results(&results)?;
        tracing::info!(
            votes = results.total_votes_received,
            winner = results.winner.as_ref().map(|c| c.code.as_str()).unwrap_or("-"),
            "election results persisted"
        );

        self.results = Some(results.clone());
        Ok(results)
    }

    /// Returns the last persisted results without replaying.
    pub fn get_results_computed(&mut self) -> Option<Results> {
        self.results = or_empty("results", self.store.read_results());
        self.results.clone()
    }

    /// Decrypts the electoral ID of `voter`.
    pub fn reveal_voter(&self, voter: &Voter) -> Result<RevealedVoter, TallyError> {
        if voter.electoral_id.is_empty() || voter.electoral_iv.is_empty() {
            return Err(TallyError::InvalidVoter);
        }
        let electoral_id = self.ciphers.identifier.decrypt(&voter.electoral_id_cipher())?;
        Ok(RevealedVoter {
            electoral_id,
            identifier: voter.identifier.clone(),
        })
    }

    pub fn get_voters(&self) -> Vec<Voter> {
        or_empty("voters", self.store.read_voters())
    }

    pub fn get_candidates(&self) -> Vec<Candidate> {
        or_empty("candidates", self.store.read_candidates())
    }

    pub fn erase_voters(&mut self) -> Result<(), TallyError> {
        self.store.clear_voters()?;
        self.snapshot.voters.clear();
        Ok(())
    }

    pub fn erase_results(&mut self) -> Result<(), TallyError> {
        self.store.clear_results()?;
        self.results = None;
        Ok(())
    }
}

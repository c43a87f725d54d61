//! Ledger orchestration.
//!
//! The ledger wires together:
//!
//! - a [`VoteStore`] for persistence,
//! - a [`BlockValidator`] for per-block predicates,
//! - a [`ForkChoice`] for chain replacement,
//! - a [`TxPool`] of admitted but unconfirmed ballots, and
//! - the [`ElectionContract`] that gates admission and tallies results.
//!
//! Rule violations on the mutating paths are reported as sentinels
//! (`Option` / `bool`) and logged; `Result` is reserved for crypto,
//! persistence and corrupt stored data. Chain writes to the store happen
//! after the in-memory append and are logged on failure, so a crash in
//! between can lose the newest block.

use std::collections::HashSet;
use std::sync::Arc;

use crate::consensus::wire::ChainSnapshot;
use crate::tally::ElectionContract;
use crate::types::{
    Block, BlockSummary, Transaction, VoteData, Voter, is_sha256, millis_to_utc,
};

use super::config::LedgerConfig;
use super::error::{LedgerError, StateError, ValidationError};
use super::fork_choice::ForkChoice;
use super::pool::TxPool;
use super::store::VoteStore;
use super::validator::BlockValidator;

/// Length in hex characters of a 16-byte IV.
const IV_HEX_LEN: usize = 32;

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Single-node ledger, generic over:
///
/// - `S`: storage backend implementing [`VoteStore`],
/// - `V`: block validator implementing [`BlockValidator`],
/// - `F`: fork-choice rule implementing [`ForkChoice`].
///
/// The chain always holds at least the genesis block.
pub struct Ledger<S: ?Sized, V, F> {
    config: LedgerConfig,
    store: Arc<S>,
    validator: V,
    fork_choice: F,
    chain: Vec<Block>,
    pending: TxPool,
    confirmed: HashSet<String>,
    contract: ElectionContract<S>,
}

impl<S, V, F> Ledger<S, V, F>
where
    S: VoteStore + ?Sized,
    V: BlockValidator,
    F: ForkChoice,
{
    /// Loads the persisted chain, or starts a new one from genesis.
    ///
    /// A stored chain that fails validation is reported as an error
    /// rather than silently discarded.
    pub fn open(
        config: LedgerConfig,
        store: Arc<S>,
        validator: V,
        fork_choice: F,
        contract: ElectionContract<S>,
    ) -> Result<Self, LedgerError> {
        let stored = store.read_chain()?;

        let mut ledger = Self {
            config,
            store,
            validator,
            fork_choice,
            chain: Vec::new(),
            pending: TxPool::new(),
            confirmed: HashSet::new(),
            contract,
        };

        if stored.is_empty() {
            ledger.chain.push(Self::create_genesis_block());
            ledger.persist_chain();
            tracing::info!("initialised new chain from genesis");
        } else {
            ledger.confirmed = ledger.check_chain(&stored)?;
            ledger.chain = stored;
            tracing::info!(height = ledger.chain.len(), "restored chain from store");
        }

        Ok(ledger)
    }

    /// The deterministic genesis block shared by every node.
    pub fn create_genesis_block() -> Block {
        Block::genesis()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn contract(&self) -> &ElectionContract<S> {
        &self.contract
    }

    pub fn contract_mut(&mut self) -> &mut ElectionContract<S> {
        &mut self.contract
    }

    // ---- admission -------------------------------------------------------

    /// Admits a pre-encrypted ballot into the pending pool.
    ///
    /// Fails if the election is closed at `now_ms`, if any field is
    /// malformed, or if the identifier already voted (pending or
    /// confirmed).
    pub fn try_add_pending_transaction(
        &mut self,
        data: VoteData,
        now_ms: u64,
    ) -> Result<Transaction, LedgerError> {
        self.admit(Transaction::new(data, now_ms), now_ms)
    }

    /// Admits a transaction relayed by a peer, keeping its hash and
    /// timestamp so every node pools the same transaction.
    pub fn receive_transaction(
        &mut self,
        tx: Transaction,
        now_ms: u64,
    ) -> Result<Transaction, LedgerError> {
        if !tx.has_consistent_hash() {
            return Err(LedgerError::Validation(
                "transaction hash does not match its payload".to_string(),
            ));
        }
        self.admit(tx, now_ms)
    }

    fn admit(&mut self, tx: Transaction, now_ms: u64) -> Result<Transaction, LedgerError> {
        self.contract.get_announcement();
        if !self.contract.is_valid_election_time(millis_to_utc(now_ms)) {
            return Err(StateError::ElectionClosed.into());
        }

        self.check_vote_data(&tx.data)?;

        let identifier = tx.identifier();
        if self.pending.contains_identifier(identifier) || self.confirmed.contains(identifier) {
            return Err(StateError::DoubleVote(identifier.to_string()).into());
        }

        self.pending.push(tx.clone());
        tracing::info!(
            tx = %tx.transaction_hash,
            pending = self.pending.len(),
            "transaction admitted"
        );
        Ok(tx)
    }

    /// Sentinel form of [`try_add_pending_transaction`](Self::try_add_pending_transaction).
    ///
    /// Returns `None` without touching any state if the ballot is
    /// rejected; the reason is logged.
    pub fn add_pending_transaction(&mut self, data: VoteData, now_ms: u64) -> Option<Transaction> {
        match self.try_add_pending_transaction(data, now_ms) {
            Ok(tx) => Some(tx),
            Err(e) => {
                tracing::info!(reason = %e, "transaction rejected");
                None
            }
        }
    }

    /// Encrypts and admits a ballot cast by a registered citizen.
    ///
    /// The pseudonymous identifier is resolved from `electoral_id`; the
    /// electoral ID and the choice are encrypted under separate keys.
    pub fn cast_vote(
        &mut self,
        electoral_id: &str,
        choice_code: &str,
        secret: &str,
        now_ms: u64,
    ) -> Result<Transaction, LedgerError> {
        if electoral_id.trim().is_empty() {
            return Err(LedgerError::Validation("identifier is required".to_string()));
        }
        if choice_code.trim().parse::<i64>().is_err() {
            return Err(LedgerError::Validation(
                "choiceCode must be an integer".to_string(),
            ));
        }

        let identifier = self
            .store
            .read_voter_citizen_relation(electoral_id)?
            .ok_or(StateError::UnknownCitizen)?;

        let ciphers = self.contract.ciphers();
        let electoral = ciphers.identifier.encrypt(electoral_id)?;
        let choice = ciphers.vote.encrypt(choice_code.trim())?;

        let data = VoteData {
            identifier,
            electoral_id: electoral.cipher_text,
            electoral_id_iv: electoral.iv,
            choice_code: choice.cipher_text,
            choice_code_iv: choice.iv,
            secret: secret.to_string(),
        };
        self.try_add_pending_transaction(data, now_ms)
    }

    fn check_vote_data(&self, data: &VoteData) -> Result<(), LedgerError> {
        let id = data.identifier.as_str();
        let shaped = is_sha256(id)
            || ((self.config.min_identifier_len..=self.config.max_identifier_len)
                .contains(&id.len())
                && id
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        if !shaped {
            return Err(LedgerError::Validation(format!(
                "identifier {id:?} is not a valid voting token"
            )));
        }

        for (field, value) in [
            ("electoralId", &data.electoral_id),
            ("choiceCode", &data.choice_code),
        ] {
            if !is_hex(value) {
                return Err(LedgerError::Validation(format!("{field} is not hex ciphertext")));
            }
        }
        for (field, value) in [
            ("electoralIdIV", &data.electoral_id_iv),
            ("choiceCodeIV", &data.choice_code_iv),
        ] {
            if value.len() != IV_HEX_LEN || !is_hex(value) {
                return Err(LedgerError::Validation(format!(
                    "{field} must be {IV_HEX_LEN} hex characters"
                )));
            }
        }
        Ok(())
    }

    // ---- blocks ----------------------------------------------------------

    /// Seals pending transactions into a new block and appends it.
    pub fn mine_block(&mut self, now_ms: u64) -> Result<Block, LedgerError> {
        if self.pending.is_empty() && !self.config.allow_empty_blocks {
            return Err(StateError::EmptyPool.into());
        }

        let txs = self
            .pending
            .select_for_block(self.config.max_block_txs, self.config.max_block_size_bytes);
        let block = Block::seal(
            self.last_block(),
            txs,
            now_ms,
            self.config.mining_difficulty,
        );

        if let Err(e) = self.validator.validate(self.last_block(), &block) {
            tracing::error!(error = %e, "locally mined block failed validation");
            self.pending.restore(block.transactions);
            return Err(e.into());
        }

        self.commit(block.clone());
        tracing::info!(
            height = block.block_index,
            hash = %block.hash(),
            txs = block.transactions.len(),
            "block mined"
        );
        Ok(block)
    }

    /// Returns `true` if `block` is a valid successor of `prev`.
    pub fn is_valid_block(&self, prev: &Block, block: &Block) -> bool {
        match self.validator.validate(prev, block) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    height = block.block_index,
                    hash = %block.hash(),
                    error = %e,
                    "block rejected"
                );
                false
            }
        }
    }

    /// Appends a block received from a peer.
    ///
    /// Returns `false` without mutation if the block does not extend the
    /// tip or re-confirms an identifier.
    pub fn add_block(&mut self, block: Block) -> bool {
        if !self.is_valid_block(self.last_block(), &block) {
            return false;
        }
        if let Some(id) = block.identifiers().find(|id| self.confirmed.contains(*id)) {
            tracing::warn!(
                height = block.block_index,
                identifier = id,
                "block rejected: identifier already confirmed"
            );
            return false;
        }

        tracing::info!(height = block.block_index, hash = %block.hash(), "block appended");
        self.commit(block);
        true
    }

    /// Replaces the local chain with `candidate` if it is preferred by the
    /// fork choice and valid end to end.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> bool {
        if !self.fork_choice.should_replace(&self.chain, &candidate) {
            tracing::debug!(
                local = self.chain.len(),
                candidate = candidate.len(),
                "candidate chain not preferred"
            );
            return false;
        }
        if candidate.first() != self.chain.first() {
            tracing::warn!("candidate chain has a different genesis block");
            return false;
        }

        let confirmed = match self.check_chain(&candidate) {
            Ok(confirmed) => confirmed,
            Err(e) => {
                tracing::warn!(error = %e, "candidate chain rejected");
                return false;
            }
        };

        let old_len = self.chain.len();
        self.chain = candidate;
        self.confirmed = confirmed;
        self.pending.retain_unconfirmed(&self.confirmed);

        self.rebuild_voters();
        self.persist_chain();
        self.contract.update();

        tracing::info!(old = old_len, new = self.chain.len(), "chain replaced");
        true
    }

    /// Validates a full chain and returns the identifiers it confirms.
    fn check_chain(&self, chain: &[Block]) -> Result<HashSet<String>, ValidationError> {
        match chain.first() {
            Some(first) if *first == Self::create_genesis_block() => {}
            _ => return Err(ValidationError::Invalid("genesis block does not match")),
        }

        for pair in chain.windows(2) {
            self.validator.validate(&pair[0], &pair[1])?;
        }

        let mut confirmed = HashSet::new();
        for id in chain.iter().flat_map(|b| b.identifiers()) {
            if !confirmed.insert(id.to_string()) {
                return Err(ValidationError::Custom(format!(
                    "identifier {id} is confirmed twice"
                )));
            }
        }
        Ok(confirmed)
    }

    /// Appends an already validated block.
    fn commit(&mut self, block: Block) {
        self.pending.remove_confirmed(&block);
        for tx in &block.transactions {
            self.confirmed.insert(tx.identifier().to_string());
            self.materialize_voter(tx);
        }
        self.chain.push(block);
        self.persist_chain();
        self.contract.update();
    }

    fn materialize_voter(&self, tx: &Transaction) {
        if let Err(e) = self
            .store
            .update_voter(tx.identifier(), &Voter::from_transaction(tx))
        {
            tracing::error!(identifier = tx.identifier(), error = %e, "failed to store voter");
        }
    }

    /// Replaces the voter collection with the ballots on the current chain.
    ///
    /// Voters from a discarded suffix must not survive a fork switch.
    fn rebuild_voters(&self) {
        if let Err(e) = self.store.clear_voters() {
            tracing::error!(error = %e, "failed to clear voters before rebuild");
            return;
        }
        for tx in self.chain.iter().flat_map(|b| b.transactions.iter()) {
            self.materialize_voter(tx);
        }
    }

    fn persist_chain(&self) {
        if let Err(e) = self.store.write_chain(&self.chain) {
            tracing::error!(height = self.chain.len(), error = %e, "failed to persist chain");
        }
    }

    /// Wipes the stored chain and restarts from genesis.
    ///
    /// Pending transactions are kept.
    pub fn clear_chains_from_storage(&mut self) -> Result<(), LedgerError> {
        self.store.clear_chains()?;
        self.store.clear_voters()?;
        self.chain = vec![Self::create_genesis_block()];
        self.confirmed.clear();
        self.store.write_chain(&self.chain)?;
        self.contract.update();
        tracing::info!("chain reset to genesis");
        Ok(())
    }

    // ---- queries ---------------------------------------------------------

    pub fn get_chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn get_length_chain(&self) -> usize {
        self.chain.len()
    }

    pub fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.pending.iter().cloned().collect()
    }

    /// All confirmed transactions in chain order.
    pub fn get_transactions(&self) -> Vec<Transaction> {
        self.chain
            .iter()
            .flat_map(|b| b.transactions.iter().cloned())
            .collect()
    }

    pub fn get_blocks(&self) -> Vec<BlockSummary> {
        self.chain.iter().map(Block::summary).collect()
    }

    pub fn get_block_details(&self, hash: &str) -> Result<&Block, LedgerError> {
        self.chain
            .iter()
            .find(|b| b.hash().as_str() == hash)
            .ok_or_else(|| LedgerError::NotFound(format!("block {hash}")))
    }

    pub fn last_block(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    pub fn get_genesis_block(&self) -> &Block {
        &self.chain[0]
    }

    /// Owned copy of the chain and the pending pool, as served to peers.
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self.chain.clone(),
            pending_transactions: self.get_pending_transactions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TallyConfig;
    use crate::crypto::{Cipher, CipherSuite};
    use crate::ledger::fork_choice::LongestChainForkChoice;
    use crate::ledger::validator::CombinedValidator;
    use crate::storage::InMemoryStore;
    use crate::types::{Announcement, BlockHash, Candidate};
    use crate::validation::{BaseValidity, LinkValidity};
    use chrono::{DateTime, TimeZone, Utc};

    type TestLedger =
        Ledger<InMemoryStore, CombinedValidator<BaseValidity, LinkValidity>, LongestChainForkChoice>;

    fn dummy_suite() -> CipherSuite {
        CipherSuite::new(
            Cipher::from_bytes([7u8; 32], [1u8; 16]),
            Cipher::from_bytes([9u8; 32], [2u8; 16]),
        )
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2027, 8, 24, 8, 0, 0).unwrap()
    }

    /// A moment inside the voting window.
    fn during(minutes: i64) -> u64 {
        (start() + chrono::Duration::minutes(minutes)).timestamp_millis() as u64
    }

    fn dummy_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .write_announcement(&Announcement {
                start_time_voting: start(),
                end_time_voting: start() + chrono::Duration::hours(10),
                num_of_voters: 10,
                num_of_candidates: 1,
                date_created: start(),
            })
            .expect("announcement");
        store
            .write_candidates(&[Candidate {
                code: "1".to_string(),
                name: "Ana".to_string(),
                party: "MPLA".to_string(),
                acronym: "MPLA".to_string(),
                status: "active".to_string(),
                num_votes: 0,
            }])
            .expect("candidates");
        store
            .write_voter_citizen_relation("AO-1", "voter-0001")
            .expect("relation");
        store
    }

    fn dummy_ledger(store: Arc<InMemoryStore>) -> TestLedger {
        let cfg = LedgerConfig {
            mining_difficulty: 1,
            ..LedgerConfig::default()
        };
        let validator = CombinedValidator::new(BaseValidity::new(&cfg), LinkValidity::new(&cfg));
        let contract = ElectionContract::new(store.clone(), dummy_suite(), TallyConfig::default());
        Ledger::open(cfg, store, validator, LongestChainForkChoice, contract).expect("open ledger")
    }

    fn dummy_vote(identifier: &str, choice: &str) -> VoteData {
        let suite = dummy_suite();
        let id = suite.identifier.encrypt("AO-1").expect("encrypt id");
        let choice = suite.vote.encrypt(choice).expect("encrypt choice");
        VoteData {
            identifier: identifier.to_string(),
            electoral_id: id.cipher_text,
            electoral_id_iv: id.iv,
            choice_code: choice.cipher_text,
            choice_code_iv: choice.iv,
            secret: String::new(),
        }
    }

    #[test]
    fn new_ledger_holds_only_genesis() {
        let ledger = dummy_ledger(dummy_store());

        assert_eq!(ledger.get_length_chain(), 1);
        let genesis = ledger.get_genesis_block();
        assert_eq!(genesis.block_index, 0);
        assert_eq!(genesis.previous_hash().as_str(), "-");
        assert_eq!(ledger.last_block(), genesis);
    }

    #[test]
    fn mining_moves_pending_transaction_into_block() {
        let store = dummy_store();
        let mut ledger = dummy_ledger(store.clone());

        let tx = ledger
            .add_pending_transaction(dummy_vote("voter-0001", "1"), during(5))
            .expect("admitted");
        assert_eq!(ledger.get_pending_transactions().len(), 1);

        let block = ledger.mine_block(during(6)).expect("mine");

        assert_eq!(ledger.get_length_chain(), 2);
        assert_eq!(block.block_index, 1);
        assert_eq!(block.previous_hash(), ledger.get_genesis_block().hash());
        assert!(ledger.get_pending_transactions().is_empty());
        assert_eq!(ledger.get_transactions(), vec![tx]);

        let voter = store
            .read_voter("voter-0001")
            .expect("read")
            .expect("voter materialised");
        assert!(voter.state);
        assert_eq!(store.read_chain().expect("read chain").len(), 2);
    }

    #[test]
    fn votes_outside_window_are_rejected() {
        let mut ledger = dummy_ledger(dummy_store());

        let early = (start() - chrono::Duration::seconds(1)).timestamp_millis() as u64;
        let late = (start() + chrono::Duration::hours(11)).timestamp_millis() as u64;

        assert!(
            ledger
                .add_pending_transaction(dummy_vote("voter-0001", "1"), early)
                .is_none()
        );
        assert!(matches!(
            ledger.try_add_pending_transaction(dummy_vote("voter-0001", "1"), late),
            Err(LedgerError::State(StateError::ElectionClosed))
        ));
        assert!(ledger.get_pending_transactions().is_empty());
    }

    #[test]
    fn double_votes_are_rejected_pending_and_confirmed() {
        let mut ledger = dummy_ledger(dummy_store());

        ledger
            .try_add_pending_transaction(dummy_vote("voter-0001", "1"), during(1))
            .expect("first vote");
        assert!(matches!(
            ledger.try_add_pending_transaction(dummy_vote("voter-0001", "1"), during(2)),
            Err(LedgerError::State(StateError::DoubleVote(_)))
        ));

        ledger.mine_block(during(3)).expect("mine");
        assert!(
            ledger
                .add_pending_transaction(dummy_vote("voter-0001", "1"), during(4))
                .is_none()
        );
    }

    #[test]
    fn relayed_transactions_keep_their_hash() {
        let mut origin = dummy_ledger(dummy_store());
        let mut relay = dummy_ledger(dummy_store());

        let tx = origin
            .try_add_pending_transaction(dummy_vote("voter-0001", "1"), during(1))
            .expect("origin admits");
        let received = relay
            .receive_transaction(tx.clone(), during(2))
            .expect("relay admits");
        assert_eq!(received, tx);

        let mut forged = tx;
        forged.data.identifier = "voter-0002".to_string();
        assert!(matches!(
            relay.receive_transaction(forged, during(3)),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn malformed_fields_are_rejected() {
        let mut ledger = dummy_ledger(dummy_store());

        let short = dummy_vote("abc", "1");
        assert!(matches!(
            ledger.try_add_pending_transaction(short, during(1)),
            Err(LedgerError::Validation(_))
        ));

        let mut bad_iv = dummy_vote("voter-0002", "1");
        bad_iv.choice_code_iv = "zz".to_string();
        assert!(ledger.add_pending_transaction(bad_iv, during(1)).is_none());

        let mut empty = dummy_vote("voter-0003", "1");
        empty.electoral_id.clear();
        assert!(ledger.add_pending_transaction(empty, during(1)).is_none());

        let sha = crate::types::sha256_hex(b"citizen");
        assert!(
            ledger
                .add_pending_transaction(dummy_vote(&sha, "1"), during(1))
                .is_some()
        );
    }

    #[test]
    fn cast_vote_resolves_identifier_and_encrypts() {
        let mut ledger = dummy_ledger(dummy_store());

        assert!(matches!(
            ledger.cast_vote("AO-1", "one", "", during(1)),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.cast_vote("AO-404", "1", "", during(1)),
            Err(LedgerError::State(StateError::UnknownCitizen))
        ));

        let tx = ledger.cast_vote("AO-1", "1", "pin", during(1)).expect("cast");
        assert_eq!(tx.identifier(), "voter-0001");
        assert_eq!(tx.data.secret, "pin");

        let suite = dummy_suite();
        assert_eq!(
            suite.vote.decrypt(&tx.data.choice_cipher()).expect("decrypt"),
            "1"
        );
        assert_eq!(
            suite
                .identifier
                .decrypt(&tx.data.electoral_id_cipher())
                .expect("decrypt"),
            "AO-1"
        );
    }

    #[test]
    fn unknown_choice_is_admitted_but_not_tallied() {
        let mut ledger = dummy_ledger(dummy_store());

        ledger
            .cast_vote("AO-1", "99", "", during(1))
            .expect("format-valid vote admitted");
        ledger.mine_block(during(2)).expect("mine");

        let results = ledger
            .contract_mut()
            .get_results(start() + chrono::Duration::hours(1))
            .expect("results");
        assert_eq!(results.total_votes_received, 0);
        assert!(results.winner.is_none());
    }

    #[test]
    fn add_block_accepts_peer_block_once() {
        let mut miner = dummy_ledger(dummy_store());
        let mut follower = dummy_ledger(dummy_store());

        follower
            .add_pending_transaction(dummy_vote("voter-0001", "1"), during(1))
            .expect("pending on follower");
        miner
            .add_pending_transaction(dummy_vote("voter-0001", "1"), during(2))
            .expect("pending on miner");
        let block = miner.mine_block(during(3)).expect("mine");

        assert!(follower.add_block(block.clone()));
        assert_eq!(follower.get_length_chain(), 2);
        assert!(follower.get_pending_transactions().is_empty());

        assert!(!follower.add_block(block));
        assert_eq!(follower.get_length_chain(), 2);
    }

    #[test]
    fn add_block_rejects_tampered_block() {
        let mut miner = dummy_ledger(dummy_store());
        let mut follower = dummy_ledger(dummy_store());

        miner
            .add_pending_transaction(dummy_vote("voter-0001", "1"), during(1))
            .expect("pending");
        let mut block = miner.mine_block(during(2)).expect("mine");
        block.block_header.previous_block_hash = BlockHash("f".repeat(64));

        assert!(!follower.add_block(block));
        assert_eq!(follower.get_length_chain(), 1);
    }

    #[test]
    fn replace_chain_prefers_longer_valid_chains_only() {
        let mut long = dummy_ledger(dummy_store());
        let mut short = dummy_ledger(dummy_store());

        long.add_pending_transaction(dummy_vote("voter-0001", "1"), during(1))
            .expect("pending");
        long.mine_block(during(2)).expect("mine");
        long.mine_block(during(3)).expect("mine empty");

        // Shorter or equal chains never replace the local one.
        let before = long.get_chain().to_vec();
        assert!(!long.replace_chain(short.get_chain().to_vec()));
        assert_eq!(long.get_chain(), &before[..]);
        assert!(!long.replace_chain(before[..2].to_vec()));

        let mut tampered = before.clone();
        tampered[1].transactions.clear();
        assert!(!short.replace_chain(tampered));
        assert_eq!(short.get_length_chain(), 1);

        assert!(short.replace_chain(before.clone()));
        assert_eq!(short.get_chain(), &before[..]);
        assert!(
            short
                .add_pending_transaction(dummy_vote("voter-0001", "1"), during(4))
                .is_none()
        );
    }

    #[test]
    fn open_restores_and_checks_persisted_chain() {
        let store = dummy_store();
        {
            let mut ledger = dummy_ledger(store.clone());
            ledger
                .add_pending_transaction(dummy_vote("voter-0001", "1"), during(1))
                .expect("pending");
            ledger.mine_block(during(2)).expect("mine");
        }

        let reopened = dummy_ledger(store.clone());
        assert_eq!(reopened.get_length_chain(), 2);

        let mut chain = store.read_chain().expect("read");
        chain[1].block_header.timestamp += 1;
        store.write_chain(&chain).expect("write");

        let cfg = LedgerConfig::default();
        let contract = ElectionContract::new(store.clone(), dummy_suite(), TallyConfig::default());
        let opened = Ledger::open(
            cfg.clone(),
            store,
            CombinedValidator::new(BaseValidity::new(&cfg), LinkValidity::new(&cfg)),
            LongestChainForkChoice,
            contract,
        );
        assert!(matches!(opened, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn empty_pool_is_refused_when_empty_blocks_are_disallowed() {
        let store = dummy_store();
        let cfg = LedgerConfig {
            allow_empty_blocks: false,
            mining_difficulty: 1,
            ..LedgerConfig::default()
        };
        let contract = ElectionContract::new(store.clone(), dummy_suite(), TallyConfig::default());
        let mut ledger = Ledger::open(
            cfg.clone(),
            store,
            CombinedValidator::new(BaseValidity::new(&cfg), LinkValidity::new(&cfg)),
            LongestChainForkChoice,
            contract,
        )
        .expect("open");

        assert!(matches!(
            ledger.mine_block(during(1)),
            Err(LedgerError::State(StateError::EmptyPool))
        ));
    }

    #[test]
    fn block_queries_and_reset() {
        let mut ledger = dummy_ledger(dummy_store());
        ledger
            .add_pending_transaction(dummy_vote("voter-0001", "1"), during(1))
            .expect("pending");
        let block = ledger.mine_block(during(2)).expect("mine");

        let found = ledger
            .get_block_details(block.hash().as_str())
            .expect("known block");
        assert_eq!(found, &block);
        assert!(matches!(
            ledger.get_block_details("nope"),
            Err(LedgerError::NotFound(_))
        ));

        let summaries = ledger.get_blocks();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].transaction_count, 1);

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.chain.len(), 2);

        ledger.clear_chains_from_storage().expect("reset");
        assert_eq!(ledger.get_length_chain(), 1);
        assert!(ledger.get_transactions().is_empty());
    }

    #[test]
    fn fork_switch_drops_ballots_from_the_discarded_suffix() {
        let store = dummy_store();
        let mut ledger = dummy_ledger(store.clone());
        let mut other = dummy_ledger(dummy_store());

        ledger
            .add_pending_transaction(dummy_vote("voter-0001", "1"), during(1))
            .expect("pending");
        ledger.mine_block(during(2)).expect("mine");
        other.mine_block(during(3)).expect("mine empty");
        other.mine_block(during(4)).expect("mine empty");

        assert!(ledger.replace_chain(other.get_chain().to_vec()));
        assert!(ledger.get_transactions().is_empty());
        assert!(store.read_voter("voter-0001").expect("read").is_none());

        let results = ledger
            .contract_mut()
            .get_results(start() + chrono::Duration::hours(1))
            .expect("results");
        assert_eq!(results.total_votes_received, 0);
    }

    #[test]
    fn reset_to_genesis_forgets_confirmed_voters() {
        let store = dummy_store();
        let mut ledger = dummy_ledger(store.clone());
        ledger
            .add_pending_transaction(dummy_vote("voter-0001", "1"), during(1))
            .expect("pending");
        ledger.mine_block(during(2)).expect("mine");

        let now = start() + chrono::Duration::hours(1);
        let before = ledger.contract_mut().get_results(now).expect("results");
        assert_eq!(before.total_votes_received, 1);

        ledger.clear_chains_from_storage().expect("reset");
        assert!(store.read_voters().expect("read").is_empty());

        let after = ledger.contract_mut().get_results(now).expect("results");
        assert_eq!(after.total_votes_received, 0);
        assert!(
            ledger
                .add_pending_transaction(dummy_vote("voter-0001", "1"), during(3))
                .is_some()
        );
    }

    #[test]
    fn chain_sealed_under_lower_difficulty_is_refused() {
        let store = dummy_store();
        {
            let mut ledger = dummy_ledger(store.clone());
            for minute in 1..=3 {
                ledger.mine_block(during(minute)).expect("mine empty");
            }
        }

        let cfg = LedgerConfig {
            mining_difficulty: 4,
            ..LedgerConfig::default()
        };
        let validator = CombinedValidator::new(BaseValidity::new(&cfg), LinkValidity::new(&cfg));
        let contract = ElectionContract::new(store.clone(), dummy_suite(), TallyConfig::default());
        let opened = Ledger::open(cfg, store, validator, LongestChainForkChoice, contract);

        assert!(matches!(opened, Err(LedgerError::Validation(_))));
    }
}

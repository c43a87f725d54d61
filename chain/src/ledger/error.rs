use thiserror::Error;

use crate::consensus::PeerError;
use crate::crypto::CryptoError;
use crate::storage::StorageError;
use crate::tally::TallyError;
use crate::types::InvalidTransition;

/// Error type returned when a block fails validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Block is invalid according to a validity predicate.
    #[error("invalid block: {0}")]
    Invalid(&'static str),
    /// Block is invalid with a dynamic error message.
    #[error("invalid block: {0}")]
    Custom(String),
}

/// Election rule violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("election is not open for voting")]
    ElectionClosed,
    #[error("identifier {0} has already voted")]
    DoubleVote(String),
    #[error("electoral identifier is not registered")]
    UnknownCitizen,
    #[error("no pending transactions to mine")]
    EmptyPool,
    #[error("announcement has an invalid voting window")]
    InvalidElectionWindow,
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// High-level errors surfaced by the ledger and the tally contract.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or missing input; the caller can fix it.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Peer(#[from] PeerError),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StorageError),
}

impl From<ValidationError> for LedgerError {
    fn from(e: ValidationError) -> Self {
        LedgerError::Validation(e.to_string())
    }
}

impl From<TallyError> for LedgerError {
    fn from(e: TallyError) -> Self {
        match e {
            TallyError::MissingAnnouncement => LedgerError::NotFound("announcement".to_string()),
            TallyError::InvalidWindow => StateError::InvalidElectionWindow.into(),
            TallyError::InvalidVoter => {
                LedgerError::Validation(TallyError::InvalidVoter.to_string())
            }
            TallyError::Crypto(e) => LedgerError::Crypto(e),
            TallyError::Persistence(e) => LedgerError::Persistence(e),
        }
    }
}

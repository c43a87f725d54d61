//! JSON bodies exchanged between nodes and with clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Block, Transaction};

/// Response envelope used by every route.
///
/// `details` carries internal error text and is only filled in when the
/// node runs in development mode.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn err(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            details,
            timestamp: Utc::now(),
        }
    }
}

/// Full node state served at the API root and fetched during consensus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    #[serde(default)]
    pub pending_transactions: Vec<Transaction>,
}

/// Body of `POST /synchronize-chain`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncChainRequest {
    pub chain: Vec<Block>,
}

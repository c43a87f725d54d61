// chain/src/types/tx.rs

//! Vote transactions.
//!
//! A transaction carries one encrypted ballot. The citizen's electoral ID
//! and the ballot choice are encrypted under distinct keys, and the
//! citizen is only named on-chain through a pseudonymous `identifier`
//! token, so the ledger can deduplicate votes without holding plaintext
//! personal data.

use serde::{Deserialize, Serialize};

use super::{CipherText, TxHash, sha256_hex};

/// Ballot payload as it appears on-chain.
///
/// All cipher fields are lowercase hex produced by
/// [`Cipher::encrypt`](crate::crypto::Cipher::encrypt).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteData {
    /// Pseudonymous per-citizen voting token.
    pub identifier: String,

    /// Electoral ID ciphertext (identifier key domain).
    pub electoral_id: String,

    /// IV used for [`VoteData::electoral_id`].
    #[serde(rename = "electoralIdIV")]
    pub electoral_id_iv: String,

    /// Ballot choice ciphertext (vote key domain).
    pub choice_code: String,

    /// IV used for [`VoteData::choice_code`].
    #[serde(rename = "choiceCodeIV")]
    pub choice_code_iv: String,

    /// Client-held secret, echoed back for receipt checks. May be empty.
    pub secret: String,
}

impl VoteData {
    /// The encrypted electoral ID as a [`CipherText`].
    pub fn electoral_id_cipher(&self) -> CipherText {
        CipherText::new(self.electoral_id_iv.clone(), self.electoral_id.clone())
    }

    /// The encrypted ballot choice as a [`CipherText`].
    pub fn choice_cipher(&self) -> CipherText {
        CipherText::new(self.choice_code_iv.clone(), self.choice_code.clone())
    }
}

/// A vote transaction: payload + content hash + admission time.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub data: VoteData,

    /// Hex SHA-256 over the canonical encoding of `data` and `timestamp`.
    pub transaction_hash: TxHash,

    /// Admission time in milliseconds since Unix epoch.
    pub timestamp: u64,
}

impl Transaction {
    /// Builds a transaction and computes its content hash.
    pub fn new(data: VoteData, timestamp: u64) -> Self {
        let transaction_hash = Self::hash_of(&data, timestamp);
        Self {
            data,
            transaction_hash,
            timestamp,
        }
    }

    /// Returns the canonical bytes that the transaction hash commits to.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails. This is considered a programming
    /// error, because all fields are plain strings and integers.
    pub fn canonical_bytes(data: &VoteData, timestamp: u64) -> Vec<u8> {
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec((data, timestamp), cfg)
            .expect("VoteData should always be serializable with bincode 2 + serde")
    }

    fn hash_of(data: &VoteData, timestamp: u64) -> TxHash {
        TxHash(sha256_hex(&Self::canonical_bytes(data, timestamp)))
    }

    /// Recomputes the content hash.
    pub fn compute_hash(&self) -> TxHash {
        Self::hash_of(&self.data, self.timestamp)
    }

    /// Returns `true` if the stored hash matches the payload.
    pub fn has_consistent_hash(&self) -> bool {
        self.compute_hash() == self.transaction_hash
    }

    pub fn identifier(&self) -> &str {
        &self.data.identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_data(identifier: &str) -> VoteData {
        VoteData {
            identifier: identifier.to_string(),
            electoral_id: "aabb".to_string(),
            electoral_id_iv: "00112233445566778899aabbccddeeff".to_string(),
            choice_code: "ccdd".to_string(),
            choice_code_iv: "ffeeddccbbaa99887766554433221100".to_string(),
            secret: "s3cret".to_string(),
        }
    }

    #[test]
    fn transaction_hash_is_deterministic_and_content_addressed() {
        let a = Transaction::new(dummy_data("voter-0001"), 1_700_000_000_000);
        let b = Transaction::new(dummy_data("voter-0001"), 1_700_000_000_000);
        let c = Transaction::new(dummy_data("voter-0002"), 1_700_000_000_000);
        let d = Transaction::new(dummy_data("voter-0001"), 1_700_000_000_001);

        assert_eq!(a.transaction_hash, b.transaction_hash);
        assert_ne!(a.transaction_hash, c.transaction_hash);
        assert_ne!(a.transaction_hash, d.transaction_hash);
        assert!(super::super::is_sha256(a.transaction_hash.as_str()));
    }

    #[test]
    fn tampered_payload_breaks_hash_consistency() {
        let mut tx = Transaction::new(dummy_data("voter-0001"), 42);
        assert!(tx.has_consistent_hash());

        tx.data.choice_code = "eeee".to_string();
        assert!(!tx.has_consistent_hash());
    }

    #[test]
    fn cipher_accessors_pair_each_field_with_its_own_iv() {
        let data = dummy_data("voter-0001");

        let id = data.electoral_id_cipher();
        assert_eq!(id.cipher_text, "aabb");
        assert_eq!(id.iv, data.electoral_id_iv);

        let choice = data.choice_cipher();
        assert_eq!(choice.cipher_text, "ccdd");
        assert_eq!(choice.iv, data.choice_code_iv);
    }

    #[test]
    fn json_field_names_match_wire_format() {
        let tx = Transaction::new(dummy_data("voter-0001"), 7);
        let json = serde_json::to_value(&tx).expect("serialize");

        assert!(json["data"]["electoralIdIV"].is_string());
        assert!(json["data"]["choiceCodeIV"].is_string());
        assert!(json["transactionHash"].is_string());
        assert_eq!(json["timestamp"], 7);
    }
}

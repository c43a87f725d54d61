//! AES-256-CBC field cipher.
//!
//! Each [`Cipher`] is bound to one key/IV pair. Voter identities and
//! ballot choices use separate instances (see [`CipherSuite`]) so that a
//! leaked identity key reveals nothing about choices, and vice versa.
//!
//! Keys and IVs are accepted either as hex (64 / 32 hex chars, the format
//! produced by [`generate_secret`]) or as raw text used byte-for-byte.
//! Missing or short material is padded to a fixed default instead of
//! failing, with a warning. That fallback is weak and exists for
//! compatibility with nodes configured without secrets.

use std::fs;
use std::path::Path;

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CipherConfig;
use crate::types::CipherText;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// CBC IV length in bytes.
pub const IV_LEN: usize = 16;

/// Fallback key used when none is configured. Not suitable for production.
pub const DEFAULT_KEY: &str = "0123456789abcdef0123456789abcdef";
/// Fallback IV used when none is configured. Not suitable for production.
pub const DEFAULT_IV: &str = "0123456789abcdef";

/// Default length of a generated pseudonymous identifier.
pub const DEFAULT_IDENTIFIER_LEN: usize = 8;

/// Errors raised by cipher operations. Never retried.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key or IV length")]
    InvalidLength,
    #[error("invalid hex in {field}: {source}")]
    Hex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },
    #[error("IV must be 16 bytes, got {0}")]
    BadIv(usize),
    #[error("decryption failed: bad padding or wrong key")]
    Unpad,
    #[error("decrypted plaintext is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("random source failure: {0}")]
    Random(#[from] rand::Error),
    #[error("failed to write secret file: {0}")]
    Io(#[from] std::io::Error),
}

/// Freshly generated key material, hex-encoded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedSecret {
    pub key: String,
    pub iv: String,
}

/// Symmetric cipher bound to one key/IV pair.
#[derive(Clone)]
pub struct Cipher {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

impl Cipher {
    /// Builds a cipher from configured key/IV text.
    ///
    /// `domain` only labels the warning emitted when defaults are used.
    pub fn new(domain: &str, key: &str, iv: &str) -> Self {
        let key = derive_material::<KEY_LEN>(domain, "key", key, DEFAULT_KEY);
        let iv = derive_material::<IV_LEN>(domain, "IV", iv, DEFAULT_IV);
        Self { key, iv }
    }

    /// Builds a cipher from raw key and IV bytes.
    pub fn from_bytes(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Encrypts `plaintext` with PKCS#7 padding.
    pub fn encrypt(&self, plaintext: &str) -> Result<CipherText, CryptoError> {
        let enc = Aes256CbcEnc::new_from_slices(&self.key, &self.iv)
            .map_err(|_| CryptoError::InvalidLength)?;
        let ct = enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        Ok(CipherText::new(hex::encode(self.iv), hex::encode(ct)))
    }

    /// Decrypts a payload produced by [`Cipher::encrypt`] under the same key.
    pub fn decrypt(&self, data: &CipherText) -> Result<String, CryptoError> {
        let iv = hex::decode(&data.iv).map_err(|source| CryptoError::Hex { field: "IV", source })?;
        if iv.len() != IV_LEN {
            return Err(CryptoError::BadIv(iv.len()));
        }
        let ct = hex::decode(&data.cipher_text).map_err(|source| CryptoError::Hex {
            field: "CIPHER_TEXT",
            source,
        })?;

        let dec =
            Aes256CbcDec::new_from_slices(&self.key, &iv).map_err(|_| CryptoError::InvalidLength)?;
        let plain = dec
            .decrypt_padded_vec_mut::<Pkcs7>(&ct)
            .map_err(|_| CryptoError::Unpad)?;
        Ok(String::from_utf8(plain)?)
    }
}

/// Turns configured text into exactly `N` bytes.
///
/// `2 * N` hex characters decode directly. Anything else is used as raw
/// bytes, right-padded from `default` (or truncated) to `N`.
fn derive_material<const N: usize>(
    domain: &str,
    what: &str,
    configured: &str,
    default: &str,
) -> [u8; N] {
    let mut out = [0u8; N];

    if configured.len() == 2 * N {
        if let Ok(bytes) = hex::decode(configured) {
            out.copy_from_slice(&bytes);
            return out;
        }
    }

    if configured.is_empty() {
        tracing::warn!(
            domain,
            "using default encryption {what}; this is not secure for production"
        );
    } else if configured.len() < N {
        tracing::warn!(
            domain,
            len = configured.len(),
            "encryption {what} is shorter than {N} bytes; padding with default material"
        );
    } else if configured.len() > N {
        tracing::warn!(domain, len = configured.len(), "encryption {what} truncated to {N} bytes");
    }

    let given = configured.as_bytes();
    let fallback = default.as_bytes();
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = given
            .get(i)
            .or_else(|| fallback.get(i))
            .copied()
            .unwrap_or(b'0');
    }
    out
}

/// The two cipher domains used by the ledger and the tally.
#[derive(Clone, Debug)]
pub struct CipherSuite {
    /// Encrypts electoral IDs.
    pub identifier: Cipher,
    /// Encrypts ballot choices.
    pub vote: Cipher,
}

impl CipherSuite {
    pub fn new(identifier: Cipher, vote: Cipher) -> Self {
        Self { identifier, vote }
    }

    pub fn from_config(cfg: &CipherConfig) -> Self {
        Self {
            identifier: Cipher::new("identifier", &cfg.identifier_key, &cfg.identifier_iv),
            vote: Cipher::new("votes", &cfg.votes_key, &cfg.votes_iv),
        }
    }
}

/// Generates a random 32-byte key and 16-byte IV and writes them to `path`.
///
/// The file holds the hex key on the first line and the hex IV on the
/// second.
pub fn generate_secret(path: impl AsRef<Path>) -> Result<GeneratedSecret, CryptoError> {
    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.try_fill_bytes(&mut key)?;
    OsRng.try_fill_bytes(&mut iv)?;

    let secret = GeneratedSecret {
        key: hex::encode(key),
        iv: hex::encode(iv),
    };

    fs::write(path.as_ref(), format!("{}\n{}\n", secret.key, secret.iv))?;
    tracing::info!(path = %path.as_ref().display(), "secret key material saved");

    Ok(secret)
}

/// Returns a random lowercase hex token of exactly `len` characters.
pub fn generate_identifier(len: usize) -> String {
    let mut bytes = vec![0u8; len.div_ceil(2)];
    OsRng.fill_bytes(&mut bytes);
    let mut id = hex::encode(bytes);
    id.truncate(len);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> Cipher {
        Cipher::new("test", DEFAULT_KEY, DEFAULT_IV)
    }

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let c = test_cipher();
        for text in [
            "This is a test message",
            "",
            "!@#$%^&*()_+{}:\"<>?[];',./-=",
            "Huíla, Uíge, Bié",
        ] {
            let ct = c.encrypt(text).expect("encrypt");
            assert_eq!(c.decrypt(&ct).expect("decrypt"), text);
        }

        let long = "a".repeat(1000);
        let ct = c.encrypt(&long).expect("encrypt long");
        assert_eq!(c.decrypt(&ct).expect("decrypt long"), long);
    }

    #[test]
    fn output_is_lowercase_hex() {
        let ct = test_cipher().encrypt("7").expect("encrypt");
        assert_eq!(ct.iv.len(), IV_LEN * 2);
        assert_eq!(ct.cipher_text.len(), 32);
        assert!(ct.cipher_text.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn empty_and_short_material_fall_back_to_padded_defaults() {
        let defaulted = Cipher::new("test", "", "");
        let explicit = test_cipher();
        let ct = explicit.encrypt("hello").expect("encrypt");
        assert_eq!(defaulted.decrypt(&ct).expect("decrypt"), "hello");

        let short = Cipher::new("test", "short", "iv");
        let ct = short.encrypt("test data").expect("encrypt");
        assert_eq!(short.decrypt(&ct).expect("decrypt"), "test data");
    }

    #[test]
    fn hex_material_from_generate_secret_is_decoded() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        let path = tmp.path().join("secret.key");
        let secret = generate_secret(&path).expect("generate");

        assert_eq!(secret.key.len(), 64);
        assert_eq!(secret.iv.len(), 32);
        let written = std::fs::read_to_string(&path).expect("read secret file");
        assert!(written.starts_with(&secret.key));

        let c = Cipher::new("test", &secret.key, &secret.iv);
        let ct = c.encrypt("ballot").expect("encrypt");
        assert_eq!(ct.iv, secret.iv);
        assert_eq!(c.decrypt(&ct).expect("decrypt"), "ballot");
    }

    #[test]
    fn domains_do_not_decrypt_each_other() {
        let suite = CipherSuite::new(
            Cipher::from_bytes([1u8; KEY_LEN], [2u8; IV_LEN]),
            Cipher::from_bytes([3u8; KEY_LEN], [2u8; IV_LEN]),
        );
        let ct = suite.identifier.encrypt("AO-000123").expect("encrypt");
        if let Ok(plain) = suite.vote.decrypt(&ct) {
            assert_ne!(plain, "AO-000123");
        }
    }

    #[test]
    fn malformed_cipher_text_is_a_typed_error() {
        let c = test_cipher();
        let bad_hex = CipherText::new("zz", "00");
        assert!(matches!(c.decrypt(&bad_hex), Err(CryptoError::Hex { .. })));

        let short_iv = CipherText::new("abcd", "00");
        assert!(matches!(c.decrypt(&short_iv), Err(CryptoError::BadIv(2))));

        let ct = c.encrypt("x").expect("encrypt");
        let truncated = CipherText::new(ct.iv, &ct.cipher_text[..30]);
        assert!(c.decrypt(&truncated).is_err());
    }

    #[test]
    fn generated_identifiers_are_hex_of_requested_length() {
        let a = generate_identifier(DEFAULT_IDENTIFIER_LEN);
        let b = generate_identifier(DEFAULT_IDENTIFIER_LEN);
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(generate_identifier(5).len(), 5);
    }
}

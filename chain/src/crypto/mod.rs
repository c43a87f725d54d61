//! Field encryption for on-chain ballots.
//!
//! Provides the AES-256-CBC [`Cipher`], the two-domain [`CipherSuite`],
//! and generators for key material and pseudonymous identifiers.

pub mod cipher;

pub use cipher::{
    Cipher, CipherSuite, CryptoError, DEFAULT_IDENTIFIER_LEN, GeneratedSecret, generate_identifier,
    generate_secret,
};

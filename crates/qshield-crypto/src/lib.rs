//! Cryptographic primitives for the qshield post-quantum envelope.
//!
//! This crate is the **sole** location for cryptographic operations.
//! The envelope and wallet crates compose what it exposes and never
//! touch a primitive directly.
//!
//! # Modules
//!
//! - [`provider`]: self-tested, size-checked handle over the KEM and
//!   signature backend
//! - [`pqclean`]: ML-KEM-768 / ML-DSA-65 backend (PQClean)
//! - [`keys`]: key pairs, bundles and KEM shared secrets
//! - [`kdf`]: PBKDF2 / Argon2id passphrase stretching
//! - [`derive`]: HKDF-SHA256 key-derivation stage with context strings
//! - [`aead`]: AES-256-GCM with detached tags
//! - [`hash`]: SHA-256
//! - [`address`]: Bech32 addresses of signature public keys
//! - [`stub`]: explicitly marked placeholder key material

pub mod address;
pub mod aead;
pub mod derive;
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod pqclean;
pub mod provider;
pub mod stub;

pub use address::{to_address, Address};
pub use keys::{KeyBundle, KeyPair, SharedSecret};
pub use provider::{PrimitiveBackend, PrimitiveProvider};

//! Passphrase-protected key files for qshield wallets.
//!
//! A wallet's long-term [`KeyBundle`](qshield_crypto::KeyBundle) is
//! persisted as a versioned JSON [`PassphraseKeyFile`]: public keys in
//! cleartext, private keys sealed with AES-256-GCM under a key derived
//! from the passphrase by a slow KDF.
//!
//! # Modules
//!
//! - [`keyfile`]: file schema, JSON encoding and validation
//! - [`wallet`]: lock, unlock and relock

mod bundle;
pub mod keyfile;
pub mod wallet;

pub use keyfile::{EncryptedPrivatePart, PassphraseKeyFile, KEYFILE_VERSION};
pub use wallet::{lock_wallet, relock_wallet, unlock_wallet};

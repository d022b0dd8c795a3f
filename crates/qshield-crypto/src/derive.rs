//! Key-derivation stage.
//!
//! One entry point, [`derive_key`], with two cost profiles selected by
//! the [`SecretInput`] variant:
//!
//! - a KEM shared secret already carries full entropy and goes straight
//!   through HKDF-SHA256 (RFC 5869);
//! - a passphrase is first stretched by a slow KDF
//!   ([`PassphraseKdf`]) and the result then goes through the same
//!   HKDF expansion.
//!
//! The `context` string is the HKDF `info` parameter. Keys derived for
//! different purposes from the same secret never collide as long as
//! their contexts differ.

use hkdf::Hkdf;
use qshield_types::{QsError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::kdf::PassphraseKdf;
use crate::keys::SharedSecret;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// HKDF context for envelope payload keys.
pub const ENVELOPE_CONTEXT: &str = "qshield/env/aead-256/v1";

/// HKDF context for key-file encryption keys.
pub const KEYFILE_CONTEXT: &str = "qshield/keyfile/aead-256/v1";

/// Length of every random salt this crate draws.
pub const SALT_LEN: usize = 16;

/// Length of a symmetric AEAD key.
pub const AEAD_KEY_LEN: usize = 32;

/// HKDF-SHA256 can expand far more, but nothing here needs over 64.
const MAX_OUTPUT_LEN: usize = 64;

// ---------------------------------------------------------------------------
// SecretInput
// ---------------------------------------------------------------------------

/// Secret a key is derived from.
pub enum SecretInput<'a> {
    /// High-entropy KEM output. Fast HKDF only.
    SharedSecret(&'a SharedSecret),
    /// Human passphrase, stretched with `kdf` before HKDF.
    Passphrase {
        /// Raw passphrase bytes.
        passphrase: &'a [u8],
        /// Slow KDF profile. Must satisfy its cost floor.
        kdf: PassphraseKdf,
    },
}

// ---------------------------------------------------------------------------
// DerivedKey
// ---------------------------------------------------------------------------

/// Symmetric key material tagged with the context and salt that
/// produced it.
///
/// The tag is for auditing only. The key bytes are zeroized on drop.
pub struct DerivedKey {
    key: Zeroizing<Vec<u8>>,
    context: String,
    salt: Vec<u8>,
}

// DerivedKey does not implement Clone/Debug to prevent leakage.

impl DerivedKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Length of the key in bytes.
    pub fn len(&self) -> usize {
        self.key.len()
    }

    /// Always `false` for a successful derivation.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Context string the key was derived under.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Salt the key was derived with.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Views the key as an AES-256 key.
    ///
    /// # Errors
    ///
    /// [`QsError::CryptoError`] if the key is not exactly 32 bytes.
    pub fn aead_key(&self) -> Result<&[u8; AEAD_KEY_LEN]> {
        self.key
            .as_slice()
            .try_into()
            .map_err(|_| QsError::CryptoError {
                reason: format!(
                    "AEAD key must be {AEAD_KEY_LEN} bytes, got {}",
                    self.key.len()
                ),
            })
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derives `output_len` bytes of key material.
///
/// # Errors
///
/// - [`QsError::CryptoError`] if `context` is empty or `output_len` is
///   outside `1..=64`.
/// - [`QsError::ConfigError`] if a passphrase KDF is below its cost
///   floor or the salt is shorter than 16 bytes for a passphrase.
pub fn derive_key(
    input: SecretInput<'_>,
    salt: &[u8],
    context: &str,
    output_len: usize,
) -> Result<DerivedKey> {
    if context.is_empty() {
        return Err(QsError::CryptoError {
            reason: "derivation context must not be empty".into(),
        });
    }
    if output_len == 0 || output_len > MAX_OUTPUT_LEN {
        return Err(QsError::CryptoError {
            reason: format!("output length must be 1..={MAX_OUTPUT_LEN}, got {output_len}"),
        });
    }

    let key = match input {
        SecretInput::SharedSecret(secret) => {
            hkdf_expand(secret.as_bytes(), salt, context, output_len)?
        }
        SecretInput::Passphrase { passphrase, kdf } => {
            let stretched = kdf.stretch(passphrase, salt)?;
            hkdf_expand(stretched.as_ref(), salt, context, output_len)?
        }
    };

    debug!(context, output_len, "derived key");
    Ok(DerivedKey {
        key,
        context: context.to_owned(),
        salt: salt.to_vec(),
    })
}

fn hkdf_expand(ikm: &[u8], salt: &[u8], info: &str, output_len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = Zeroizing::new(vec![0u8; output_len]);
    hk.expand(info.as_bytes(), &mut okm)
        .map_err(|e| QsError::CryptoError {
            reason: format!("HKDF expand failed: {e}"),
        })?;
    Ok(okm)
}

/// Draws a fresh 16-byte salt from the OS CSPRNG.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| QsError::CryptoError {
            reason: format!("failed to generate salt: {e}"),
        })?;
    Ok(salt)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

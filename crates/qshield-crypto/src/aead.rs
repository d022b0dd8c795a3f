//! AES-256-GCM authenticated encryption with associated data.
//!
//! The 16-byte tag is kept detached from the ciphertext so it can be
//! carried in its own envelope field. Nonces are 96 bits, drawn from OS
//! entropy, and **must never be reused** with the same key.
//!
//! Decryption verifies the tag before any plaintext is released. On
//! failure the working buffer is zeroized and only
//! [`QsError::AuthenticationFailed`] is returned.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use qshield_types::{QsError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// AeadNonce
// ---------------------------------------------------------------------------

/// 96-bit (12-byte) AES-GCM nonce.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AeadNonce([u8; 12]);

impl AeadNonce {
    /// Fixed byte length of an AES-GCM nonce.
    pub const LEN: usize = 12;

    /// Creates an [`AeadNonce`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 12-byte array.
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// Generates a fresh 96-bit random nonce from OS entropy.
pub fn generate_aead_nonce() -> Result<AeadNonce> {
    let mut bytes = [0u8; AeadNonce::LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| QsError::CryptoError {
            reason: format!("failed to generate nonce: {e}"),
        })?;
    Ok(AeadNonce(bytes))
}

// ---------------------------------------------------------------------------
// AuthTag
// ---------------------------------------------------------------------------

/// 128-bit GCM authentication tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AuthTag([u8; 16]);

impl AuthTag {
    /// Fixed byte length of a GCM tag.
    pub const LEN: usize = 16;

    /// Creates an [`AuthTag`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 16-byte array.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// SealedPayload
// ---------------------------------------------------------------------------

/// Output of [`encrypt_aes256gcm`]: nonce, detached tag and ciphertext
/// (same length as the plaintext).
#[derive(Clone, Debug)]
pub struct SealedPayload {
    /// Nonce used for this encryption.
    pub nonce: AeadNonce,
    /// Authentication tag over ciphertext and associated data.
    pub tag: AuthTag,
    /// Encrypted payload without the tag.
    pub ciphertext: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Encrypt / Decrypt
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` with AES-256-GCM.
///
/// `aad` is authenticated but not encrypted. Pass `&[]` if unused.
pub fn encrypt_aes256gcm(
    key: &[u8; 32],
    nonce: &AeadNonce,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<SealedPayload> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut buffer = plaintext.to_vec();

    let tag = match cipher.encrypt_in_place_detached(Nonce::from_slice(&nonce.0), aad, &mut buffer) {
        Ok(tag) => tag,
        Err(e) => {
            buffer.zeroize();
            return Err(QsError::CryptoError {
                reason: format!("AES-256-GCM encryption failed: {e}"),
            });
        }
    };

    let mut tag_bytes = [0u8; AuthTag::LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(SealedPayload {
        nonce: *nonce,
        tag: AuthTag(tag_bytes),
        ciphertext: buffer,
    })
}

/// Decrypts `ciphertext` with AES-256-GCM.
///
/// # Errors
///
/// [`QsError::AuthenticationFailed`] if the tag does not verify (wrong
/// key, wrong nonce, tampered ciphertext, tampered tag or wrong AAD).
/// No plaintext bytes are returned in that case.
pub fn decrypt_aes256gcm(
    key: &[u8; 32],
    nonce: &AeadNonce,
    ciphertext: &[u8],
    tag: &AuthTag,
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut buffer = ciphertext.to_vec();

    let outcome = cipher.decrypt_in_place_detached(
        Nonce::from_slice(&nonce.0),
        aad,
        &mut buffer,
        Tag::from_slice(&tag.0),
    );
    if outcome.is_err() {
        buffer.zeroize();
        return Err(QsError::AuthenticationFailed);
    }
    Ok(buffer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

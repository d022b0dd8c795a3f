//! Encapsulate-then-encrypt and decapsulate-then-decrypt.
//!
//! # Seal
//!
//! ```text
//! 1. check recipient public key is 1184 bytes
//! 2. (secret, kem_ct) ← ML-KEM-768.Encapsulate(recipient_pk)
//! 3. salt  ← random 16 bytes
//!    key   ← HKDF-SHA256(secret, salt, info="qshield/env/aead-256/v1", 32)
//! 4. nonce ← random 12 bytes
//!    (ct, tag) ← AES-256-GCM.Encrypt(key, nonce, message, aad=scheme id)
//! 5. return Envelope { kem_ct, salt, nonce, tag, ct }
//! ```
//!
//! # Open
//!
//! ```text
//! 1. secret ← ML-KEM-768.Decapsulate(own_sk, kem_ct)   (size-checked)
//! 2. key    ← HKDF-SHA256(secret, salt, same info, 32)
//! 3. plain  ← AES-256-GCM.Decrypt(key, nonce, ct, tag, same aad)
//! ```
//!
//! The AEAD associated data is this codec's own scheme id, never the
//! `schemeId` read from the envelope.

use qshield_crypto::aead::{decrypt_aes256gcm, encrypt_aes256gcm, generate_aead_nonce};
use qshield_crypto::derive::{derive_key, generate_salt, SecretInput, AEAD_KEY_LEN, ENVELOPE_CONTEXT};
use qshield_crypto::PrimitiveProvider;
use qshield_types::Result;
use tracing::{debug, warn};

use crate::envelope::{Envelope, ENVELOPE_SCHEME_ID};

/// Hybrid KEM + KDF + AEAD envelope codec.
///
/// Stateless apart from the shared provider handle; `seal` and `open`
/// may be called concurrently from any number of threads.
#[derive(Clone, Debug)]
pub struct HybridEnvelopeCodec {
    provider: PrimitiveProvider,
}

impl HybridEnvelopeCodec {
    /// Creates a codec over an initialized provider.
    pub fn new(provider: PrimitiveProvider) -> Self {
        Self { provider }
    }

    /// The provider this codec uses.
    pub fn provider(&self) -> &PrimitiveProvider {
        &self.provider
    }

    /// Seals `message` to a recipient's ML-KEM-768 public key.
    ///
    /// Every call draws fresh KEM randomness, salt and nonce, so sealing
    /// the same message twice yields unrelated envelopes.
    ///
    /// # Errors
    ///
    /// - [`QsError::InvalidKeyMaterial`](qshield_types::QsError::InvalidKeyMaterial)
    ///   if the public key is not 1184 bytes. No encapsulation is
    ///   attempted.
    /// - [`QsError::CryptoError`](qshield_types::QsError::CryptoError)
    ///   if the random source fails.
    pub fn seal(&self, message: &[u8], recipient_kem_public_key: &[u8]) -> Result<Envelope> {
        let (secret, kem_ciphertext) = self.provider.encapsulate(recipient_kem_public_key)?;

        let salt = generate_salt()?;
        let key = derive_key(
            SecretInput::SharedSecret(&secret),
            &salt,
            ENVELOPE_CONTEXT,
            AEAD_KEY_LEN,
        )?;
        drop(secret);

        let nonce = generate_aead_nonce()?;
        let sealed = encrypt_aes256gcm(key.aead_key()?, &nonce, message, ENVELOPE_SCHEME_ID.as_bytes())?;

        debug!(message_len = message.len(), "sealed envelope");
        Ok(Envelope {
            kem_ciphertext,
            salt,
            nonce: sealed.nonce,
            auth_tag: sealed.tag,
            ciphertext: sealed.ciphertext,
            scheme_id: ENVELOPE_SCHEME_ID.to_owned(),
        })
    }

    /// Opens an envelope with our own ML-KEM-768 private key.
    ///
    /// Pure in `(envelope, private key)`: repeated calls return the
    /// same plaintext or the same error.
    ///
    /// # Errors
    ///
    /// - [`QsError::InvalidKeyMaterial`](qshield_types::QsError::InvalidKeyMaterial)
    ///   if the private key is not 2400 bytes.
    /// - [`QsError::MalformedEnvelope`](qshield_types::QsError::MalformedEnvelope)
    ///   if the KEM ciphertext is not 1088 bytes.
    /// - [`QsError::AuthenticationFailed`](qshield_types::QsError::AuthenticationFailed)
    ///   if the tag does not verify, whatever the cause.
    pub fn open(&self, envelope: &Envelope, own_kem_private_key: &[u8]) -> Result<Vec<u8>> {
        if envelope.scheme_id != ENVELOPE_SCHEME_ID {
            warn!(scheme_id = %envelope.scheme_id, "envelope declares a different scheme id");
        }

        let secret = self
            .provider
            .decapsulate(own_kem_private_key, &envelope.kem_ciphertext)?;
        let key = derive_key(
            SecretInput::SharedSecret(&secret),
            &envelope.salt,
            ENVELOPE_CONTEXT,
            AEAD_KEY_LEN,
        )?;
        drop(secret);

        let plaintext = decrypt_aes256gcm(
            key.aead_key()?,
            &envelope.nonce,
            &envelope.ciphertext,
            &envelope.auth_tag,
            ENVELOPE_SCHEME_ID.as_bytes(),
        )
        .map_err(|e| {
            warn!("envelope failed authentication");
            e
        })?;

        debug!(message_len = plaintext.len(), "opened envelope");
        Ok(plaintext)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

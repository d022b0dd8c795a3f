//! Envelope structure and its JSON wire layout.
//!
//! # Wire layout
//!
//! ```text
//! {
//!   "kemCiphertext": base64,   // 1088 bytes (ML-KEM-768)
//!   "salt":          base64,   // 16 bytes
//!   "nonce":         base64,   // 12 bytes
//!   "authTag":       base64,   // 16 bytes
//!   "ciphertext":    base64,   // variable, same length as the message
//!   "schemeId":      string    // informational
//! }
//! ```
//!
//! Every field is required and every fixed-size field is checked on
//! decode. Unknown fields are rejected. Any violation is reported as
//! [`QsError::MalformedEnvelope`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use qshield_crypto::aead::{AeadNonce, AuthTag};
use qshield_crypto::derive::SALT_LEN;
use qshield_types::{KeyScheme, QsError, Result};
use serde::{Deserialize, Serialize};

/// Scheme identifier written by this codec.
pub const ENVELOPE_SCHEME_ID: &str = "ML-KEM-768+HKDF-SHA256+AES-256-GCM";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Self-describing output of
/// [`HybridEnvelopeCodec::seal`](crate::HybridEnvelopeCodec::seal).
///
/// Contains everything the recipient needs, besides their private key,
/// to recover the message. Replay is not detected; callers that need
/// replay protection must track envelopes themselves.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EnvelopeWire", into = "EnvelopeWire")]
pub struct Envelope {
    /// KEM ciphertext for the recipient's public key.
    pub kem_ciphertext: Vec<u8>,
    /// Fresh salt for the HKDF step.
    pub salt: [u8; SALT_LEN],
    /// Fresh AES-GCM nonce.
    pub nonce: AeadNonce,
    /// Detached GCM tag.
    pub auth_tag: AuthTag,
    /// Encrypted message.
    pub ciphertext: Vec<u8>,
    /// Scheme identifier. Informational only.
    pub scheme_id: String,
}

impl Envelope {
    /// Serializes to the JSON wire layout.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| QsError::MalformedEnvelope {
            reason: format!("failed to serialize envelope: {e}"),
        })
    }

    /// Parses and validates the JSON wire layout.
    ///
    /// # Errors
    ///
    /// [`QsError::MalformedEnvelope`] if the input is not JSON, a field
    /// is missing, unknown or not base64, or a fixed-size field has the
    /// wrong length.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| QsError::MalformedEnvelope {
            reason: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EnvelopeWire {
    kem_ciphertext: String,
    salt: String,
    nonce: String,
    auth_tag: String,
    ciphertext: String,
    scheme_id: String,
}

impl From<Envelope> for EnvelopeWire {
    fn from(e: Envelope) -> Self {
        Self {
            kem_ciphertext: STANDARD.encode(&e.kem_ciphertext),
            salt: STANDARD.encode(e.salt),
            nonce: STANDARD.encode(e.nonce.as_bytes()),
            auth_tag: STANDARD.encode(e.auth_tag.as_bytes()),
            ciphertext: STANDARD.encode(&e.ciphertext),
            scheme_id: e.scheme_id,
        }
    }
}

impl TryFrom<EnvelopeWire> for Envelope {
    type Error = QsError;

    fn try_from(w: EnvelopeWire) -> Result<Self> {
        let kem_ciphertext = decode_field("kemCiphertext", &w.kem_ciphertext)?;
        let expected_ct = KeyScheme::MlKem768.output_len();
        if kem_ciphertext.len() != expected_ct {
            return Err(QsError::MalformedEnvelope {
                reason: format!(
                    "kemCiphertext must be {expected_ct} bytes, got {}",
                    kem_ciphertext.len()
                ),
            });
        }

        Ok(Self {
            kem_ciphertext,
            salt: decode_fixed::<SALT_LEN>("salt", &w.salt)?,
            nonce: AeadNonce::from_bytes(decode_fixed::<{ AeadNonce::LEN }>("nonce", &w.nonce)?),
            auth_tag: AuthTag::from_bytes(decode_fixed::<{ AuthTag::LEN }>("authTag", &w.auth_tag)?),
            ciphertext: decode_field("ciphertext", &w.ciphertext)?,
            scheme_id: w.scheme_id,
        })
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD.decode(value).map_err(|e| QsError::MalformedEnvelope {
        reason: format!("{name} is not valid base64: {e}"),
    })
}

fn decode_fixed<const N: usize>(name: &str, value: &str) -> Result<[u8; N]> {
    let bytes = decode_field(name, value)?;
    bytes.as_slice().try_into().map_err(|_| QsError::MalformedEnvelope {
        reason: format!("{name} must be {N} bytes, got {}", bytes.len()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

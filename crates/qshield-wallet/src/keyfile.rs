//! Passphrase key file: schema, JSON encoding and validation.
//!
//! # File layout (version 1)
//!
//! ```json
//! {
//!   "version": 1,
//!   "kemPublicKey": "<base64, 1184 bytes>",
//!   "signaturePublicKey": "<base64, 1952 bytes>",
//!   "encrypted": {
//!     "kdf": "pbkdf2-sha256",
//!     "iterations": 250000,
//!     "salt": "<base64, 16 bytes>",
//!     "nonce": "<base64, 12 bytes>",
//!     "ciphertext": "<base64, AES-256-GCM ciphertext || 16-byte tag>"
//!   }
//! }
//! ```
//!
//! Argon2id files use `"kdf": "argon2id"`, store the pass count in
//! `iterations` and add `memoryKib` and `parallelism`.
//!
//! `version` is read from the raw JSON and checked **before** the rest
//! of the document is parsed, so an unknown version is always reported
//! as [`QsError::UnsupportedVersion`] rather than as a schema error.
//!
//! The lengths of `salt`, `nonce` and `ciphertext` are not checked
//! here. A file with mis-sized encrypted fields parses, and unlocking it
//! fails exactly like a wrong passphrase.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use qshield_crypto::address::{to_address, Address};
use qshield_crypto::kdf::PassphraseKdf;
use qshield_types::config::KdfAlgorithm;
use qshield_types::{KeyScheme, QsError, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current key file format version.
pub const KEYFILE_VERSION: u64 = 1;

/// Upper bounds on stored KDF costs. A file asking for more is treated
/// as malformed instead of being run.
const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;
const MAX_ARGON2_M_COST_KIB: u32 = 4 * 1024 * 1024;
const MAX_ARGON2_T_COST: u32 = 64;
const MAX_ARGON2_P_COST: u32 = 16;

// ---------------------------------------------------------------------------
// PassphraseKeyFile
// ---------------------------------------------------------------------------

/// Encrypted at-rest form of a [`KeyBundle`](qshield_crypto::KeyBundle).
///
/// The public keys are always present in cleartext. The private keys
/// are only reachable through
/// [`unlock_wallet`](crate::wallet::unlock_wallet).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PassphraseKeyFile {
    kem_public_key: Vec<u8>,
    signature_public_key: Vec<u8>,
    encrypted: EncryptedPrivatePart,
}

/// The passphrase-protected half of a key file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncryptedPrivatePart {
    pub(crate) kdf: PassphraseKdf,
    pub(crate) salt: Vec<u8>,
    pub(crate) nonce: Vec<u8>,
    pub(crate) ciphertext: Vec<u8>,
}

impl EncryptedPrivatePart {
    /// KDF profile and cost the key was derived with.
    pub fn kdf(&self) -> PassphraseKdf {
        self.kdf
    }

    /// Stored KDF salt.
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Stored AEAD nonce.
    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// Ciphertext with the 16-byte tag appended.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

impl PassphraseKeyFile {
    pub(crate) fn new(
        kem_public_key: Vec<u8>,
        signature_public_key: Vec<u8>,
        encrypted: EncryptedPrivatePart,
    ) -> Self {
        Self {
            kem_public_key,
            signature_public_key,
            encrypted,
        }
    }

    /// Format version. Always [`KEYFILE_VERSION`] for a parsed file.
    pub fn version(&self) -> u64 {
        KEYFILE_VERSION
    }

    /// Cleartext ML-KEM-768 public key.
    pub fn kem_public_key(&self) -> &[u8] {
        &self.kem_public_key
    }

    /// Cleartext ML-DSA-65 public key.
    pub fn signature_public_key(&self) -> &[u8] {
        &self.signature_public_key
    }

    /// Encrypted private part.
    pub fn encrypted(&self) -> &EncryptedPrivatePart {
        &self.encrypted
    }

    /// Address of the wallet, derived from the cleartext signature
    /// public key without unlocking.
    pub fn address(&self) -> Result<Address> {
        to_address(&self.signature_public_key)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&KeyFileWire::from(self)).map_err(|e| QsError::MalformedKeyFile {
            reason: format!("failed to serialize key file: {e}"),
        })
    }

    /// Parses and validates a key file.
    ///
    /// # Validation order
    ///
    /// 1. Input is JSON with an integer `version`.
    /// 2. `version` equals [`KEYFILE_VERSION`].
    /// 3. Full schema, with unknown fields rejected.
    /// 4. Public keys decode to the published sizes.
    /// 5. KDF parameters lie between the cost floor and the ceiling.
    ///
    /// # Errors
    ///
    /// - [`QsError::UnsupportedVersion`] at step 2.
    /// - [`QsError::MalformedKeyFile`] at any other step.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(json).map_err(|e| QsError::MalformedKeyFile {
            reason: format!("not valid JSON: {e}"),
        })?;

        let version = raw
            .get("version")
            .ok_or_else(|| QsError::MalformedKeyFile {
                reason: "missing version".into(),
            })?
            .as_u64()
            .ok_or_else(|| QsError::MalformedKeyFile {
                reason: "version must be a non-negative integer".into(),
            })?;
        if version != KEYFILE_VERSION {
            return Err(QsError::UnsupportedVersion { found: version });
        }

        let wire: KeyFileWire = serde_json::from_value(raw).map_err(|e| QsError::MalformedKeyFile {
            reason: e.to_string(),
        })?;
        Self::try_from(wire)
    }
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct KeyFileWire {
    version: u64,
    kem_public_key: String,
    signature_public_key: String,
    encrypted: EncryptedWire,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EncryptedWire {
    kdf: KdfAlgorithm,
    iterations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    memory_kib: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parallelism: Option<u32>,
    salt: String,
    nonce: String,
    ciphertext: String,
}

impl From<&PassphraseKeyFile> for KeyFileWire {
    fn from(file: &PassphraseKeyFile) -> Self {
        let enc = &file.encrypted;
        let (memory_kib, parallelism) = match enc.kdf {
            PassphraseKdf::Pbkdf2Sha256 { .. } => (None, None),
            PassphraseKdf::Argon2id {
                m_cost_kib, p_cost, ..
            } => (Some(m_cost_kib), Some(p_cost)),
        };
        Self {
            version: KEYFILE_VERSION,
            kem_public_key: STANDARD.encode(&file.kem_public_key),
            signature_public_key: STANDARD.encode(&file.signature_public_key),
            encrypted: EncryptedWire {
                kdf: enc.kdf.algorithm(),
                iterations: enc.kdf.iterations(),
                memory_kib,
                parallelism,
                salt: STANDARD.encode(&enc.salt),
                nonce: STANDARD.encode(&enc.nonce),
                ciphertext: STANDARD.encode(&enc.ciphertext),
            },
        }
    }
}

impl TryFrom<KeyFileWire> for PassphraseKeyFile {
    type Error = QsError;

    fn try_from(w: KeyFileWire) -> Result<Self> {
        let kem_public_key = decode_public_key("kemPublicKey", &w.kem_public_key, KeyScheme::MlKem768)?;
        let signature_public_key =
            decode_public_key("signaturePublicKey", &w.signature_public_key, KeyScheme::MlDsa65)?;
        let kdf = kdf_from_wire(&w.encrypted)?;

        Ok(Self {
            kem_public_key,
            signature_public_key,
            encrypted: EncryptedPrivatePart {
                kdf,
                salt: decode_field("salt", &w.encrypted.salt)?,
                nonce: decode_field("nonce", &w.encrypted.nonce)?,
                ciphertext: decode_field("ciphertext", &w.encrypted.ciphertext)?,
            },
        })
    }
}

fn kdf_from_wire(enc: &EncryptedWire) -> Result<PassphraseKdf> {
    let kdf = match (enc.kdf, enc.memory_kib, enc.parallelism) {
        (KdfAlgorithm::Pbkdf2Sha256, None, None) => {
            if enc.iterations > MAX_PBKDF2_ITERATIONS {
                return Err(QsError::MalformedKeyFile {
                    reason: format!("iterations {} exceed {MAX_PBKDF2_ITERATIONS}", enc.iterations),
                });
            }
            PassphraseKdf::Pbkdf2Sha256 {
                iterations: enc.iterations,
            }
        }
        (KdfAlgorithm::Argon2id, Some(m_cost_kib), Some(p_cost)) => {
            if m_cost_kib > MAX_ARGON2_M_COST_KIB
                || enc.iterations > MAX_ARGON2_T_COST
                || p_cost > MAX_ARGON2_P_COST
            {
                return Err(QsError::MalformedKeyFile {
                    reason: "argon2id cost exceeds the accepted maximum".into(),
                });
            }
            PassphraseKdf::Argon2id {
                m_cost_kib,
                t_cost: enc.iterations,
                p_cost,
            }
        }
        (algorithm, _, _) => {
            return Err(QsError::MalformedKeyFile {
                reason: format!("inconsistent parameters for kdf '{algorithm}'"),
            })
        }
    };

    kdf.validate().map_err(|e| QsError::MalformedKeyFile {
        reason: e.to_string(),
    })?;
    Ok(kdf)
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD.decode(value).map_err(|e| QsError::MalformedKeyFile {
        reason: format!("{name} is not valid base64: {e}"),
    })
}

fn decode_public_key(name: &str, value: &str, scheme: KeyScheme) -> Result<Vec<u8>> {
    let bytes = decode_field(name, value)?;
    if bytes.len() != scheme.public_key_len() {
        return Err(QsError::MalformedKeyFile {
            reason: format!(
                "{name} must be {} bytes, got {}",
                scheme.public_key_len(),
                bytes.len()
            ),
        });
    }
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample(kdf: PassphraseKdf) -> PassphraseKeyFile {
        PassphraseKeyFile::new(
            vec![1u8; 1184],
            vec![2u8; 1952],
            EncryptedPrivatePart {
                kdf,
                salt: vec![3u8; 16],
                nonce: vec![4u8; 12],
                ciphertext: vec![5u8; 64],
            },
        )
    }

    fn pbkdf2() -> PassphraseKdf {
        PassphraseKdf::Pbkdf2Sha256 { iterations: 250_000 }
    }

    fn as_value(file: &PassphraseKeyFile) -> std::result::Result<serde_json::Value, Box<dyn std::error::Error>> {
        Ok(serde_json::from_str(&file.to_json()?)?)
    }

    #[test]
    fn json_layout_matches_schema() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let value = as_value(&sample(pbkdf2()))?;
        assert_eq!(value["version"], 1);
        assert_eq!(value["encrypted"]["kdf"], "pbkdf2-sha256");
        assert_eq!(value["encrypted"]["iterations"], 250_000);
        assert!(value["encrypted"].get("memoryKib").is_none());
        assert!(value.get("kemPublicKey").is_some());
        assert!(value.get("signaturePublicKey").is_some());
        Ok(())
    }

    #[test]
    fn json_roundtrip() -> std::result::Result<(), QsError> {
        for kdf in [
            pbkdf2(),
            PassphraseKdf::Argon2id {
                m_cost_kib: 65_536,
                t_cost: 3,
                p_cost: 1,
            },
        ] {
            let file = sample(kdf);
            assert_eq!(PassphraseKeyFile::from_json(&file.to_json()?)?, file);
        }
        Ok(())
    }

    #[test]
    fn unknown_version_rejected_before_schema() {
        let doc = json!({ "version": 2, "anything": "else" }).to_string();
        assert!(matches!(
            PassphraseKeyFile::from_json(&doc),
            Err(QsError::UnsupportedVersion { found: 2 })
        ));
    }

    #[test]
    fn missing_version_is_malformed() {
        let doc = json!({ "kemPublicKey": "" }).to_string();
        assert!(matches!(
            PassphraseKeyFile::from_json(&doc),
            Err(QsError::MalformedKeyFile { .. })
        ));
    }

    #[test]
    fn string_version_is_malformed() {
        let doc = json!({ "version": "1" }).to_string();
        assert!(matches!(
            PassphraseKeyFile::from_json(&doc),
            Err(QsError::MalformedKeyFile { .. })
        ));
    }

    #[test]
    fn unknown_field_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut value = as_value(&sample(pbkdf2()))?;
        value["comment"] = json!("hello");
        assert!(matches!(
            PassphraseKeyFile::from_json(&value.to_string()),
            Err(QsError::MalformedKeyFile { .. })
        ));
        Ok(())
    }

    #[test]
    fn weak_iterations_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut value = as_value(&sample(pbkdf2()))?;
        value["encrypted"]["iterations"] = json!(1000);
        assert!(matches!(
            PassphraseKeyFile::from_json(&value.to_string()),
            Err(QsError::MalformedKeyFile { .. })
        ));
        Ok(())
    }

    #[test]
    fn excessive_iterations_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut value = as_value(&sample(pbkdf2()))?;
        value["encrypted"]["iterations"] = json!(u32::MAX);
        assert!(matches!(
            PassphraseKeyFile::from_json(&value.to_string()),
            Err(QsError::MalformedKeyFile { .. })
        ));
        Ok(())
    }

    #[test]
    fn unknown_kdf_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut value = as_value(&sample(pbkdf2()))?;
        value["encrypted"]["kdf"] = json!("scrypt");
        assert!(matches!(
            PassphraseKeyFile::from_json(&value.to_string()),
            Err(QsError::MalformedKeyFile { .. })
        ));
        Ok(())
    }

    #[test]
    fn argon2_without_memory_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut value = as_value(&sample(pbkdf2()))?;
        value["encrypted"]["kdf"] = json!("argon2id");
        value["encrypted"]["iterations"] = json!(3);
        assert!(matches!(
            PassphraseKeyFile::from_json(&value.to_string()),
            Err(QsError::MalformedKeyFile { .. })
        ));
        Ok(())
    }

    #[test]
    fn short_public_key_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut value = as_value(&sample(pbkdf2()))?;
        value["kemPublicKey"] = json!(STANDARD.encode([0u8; 32]));
        assert!(matches!(
            PassphraseKeyFile::from_json(&value.to_string()),
            Err(QsError::MalformedKeyFile { .. })
        ));
        Ok(())
    }

    #[test]
    fn short_salt_still_parses() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut value = as_value(&sample(pbkdf2()))?;
        value["encrypted"]["salt"] = json!(STANDARD.encode([0u8; 3]));
        let file = PassphraseKeyFile::from_json(&value.to_string())?;
        assert_eq!(file.encrypted().salt().len(), 3);
        Ok(())
    }

    #[test]
    fn address_from_cleartext_key() -> std::result::Result<(), QsError> {
        let file = sample(pbkdf2());
        assert_eq!(file.address()?, to_address(&[2u8; 1952])?);
        Ok(())
    }
}

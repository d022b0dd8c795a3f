//! Core shared types for the qshield post-quantum envelope.
//!
//! This crate defines the error taxonomy, the key-scheme identifiers and
//! the configuration shared across the workspace. It performs no
//! cryptography itself.

pub mod config;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// SchemeKind
// ---------------------------------------------------------------------------

/// Family a key scheme belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    /// Key-encapsulation mechanism.
    Kem,
    /// Digital signature scheme.
    Signature,
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kem => write!(f, "kem"),
            Self::Signature => write!(f, "signature"),
        }
    }
}

// ---------------------------------------------------------------------------
// KeyScheme
// ---------------------------------------------------------------------------

/// Concrete post-quantum scheme a key belongs to.
///
/// Every scheme publishes fixed byte lengths for its keys. Those lengths
/// are checked before any primitive runs, so a wrongly sized key never
/// reaches the underlying implementation.
///
/// | Scheme       | Public key | Private key | Ciphertext / Signature |
/// |--------------|-----------:|------------:|-----------------------:|
/// | `ML-KEM-768` | 1184       | 2400        | 1088                   |
/// | `ML-DSA-65`  | 1952       | 4032        | 3309                   |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum KeyScheme {
    /// ML-KEM-768 (FIPS 203).
    #[serde(rename = "ML-KEM-768")]
    MlKem768,
    /// ML-DSA-65 (FIPS 204).
    #[serde(rename = "ML-DSA-65")]
    MlDsa65,
}

impl KeyScheme {
    /// Returns the family of this scheme.
    pub fn kind(&self) -> SchemeKind {
        match self {
            Self::MlKem768 => SchemeKind::Kem,
            Self::MlDsa65 => SchemeKind::Signature,
        }
    }

    /// Canonical identifier, as written into envelopes and key files.
    pub fn id(&self) -> &'static str {
        match self {
            Self::MlKem768 => "ML-KEM-768",
            Self::MlDsa65 => "ML-DSA-65",
        }
    }

    /// Published public-key length in bytes.
    pub fn public_key_len(&self) -> usize {
        match self {
            Self::MlKem768 => 1184,
            Self::MlDsa65 => 1952,
        }
    }

    /// Published private-key length in bytes.
    pub fn private_key_len(&self) -> usize {
        match self {
            Self::MlKem768 => 2400,
            Self::MlDsa65 => 4032,
        }
    }

    /// KEM ciphertext length for KEM schemes, detached signature length
    /// for signature schemes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::MlKem768 => 1088,
            Self::MlDsa65 => 3309,
        }
    }
}

impl fmt::Display for KeyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for KeyScheme {
    type Err = QsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ML-KEM-768" => Ok(Self::MlKem768),
            "ML-DSA-65" => Ok(Self::MlDsa65),
            other => Err(QsError::InvalidKeyMaterial {
                reason: format!("unknown key scheme '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// QsError
// ---------------------------------------------------------------------------

/// Central error type for the qshield workspace.
///
/// Every failure is recoverable and reported without partial output.
/// `AuthenticationFailed` and `WrongPassphraseOrCorrupted` carry no
/// detail.
#[derive(Debug, Error)]
pub enum QsError {
    /// Key bytes have the wrong size or format for their scheme.
    /// Raised before any cryptographic work runs.
    #[error("invalid key material: {reason}")]
    InvalidKeyMaterial {
        /// Human-readable description of the mismatch.
        reason: String,
    },

    /// An envelope is structurally incomplete or has mis-sized fields.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// Human-readable description of the structural problem.
        reason: String,
    },

    /// AEAD tag verification failed (tampering or wrong key).
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The underlying primitive implementation could not be initialized.
    #[error("cryptographic primitive unavailable: {reason}")]
    PrimitiveUnavailable {
        /// Human-readable description of the initialization failure.
        reason: String,
    },

    /// A key file could not be unlocked. Wrong passphrase and corrupted
    /// ciphertext are intentionally reported the same way.
    #[error("wrong passphrase or corrupted key file")]
    WrongPassphraseOrCorrupted,

    /// A key file does not match the expected schema.
    #[error("malformed key file: {reason}")]
    MalformedKeyFile {
        /// Human-readable description of the schema violation.
        reason: String,
    },

    /// A key file declares a version this build does not understand.
    #[error("unsupported key file version {found}")]
    UnsupportedVersion {
        /// The version found in the file.
        found: u64,
    },

    /// An address string is malformed or fails its checksum.
    #[error("invalid address: {reason}")]
    InvalidAddress {
        /// Human-readable description of why the address is invalid.
        reason: String,
    },

    /// A cryptographic operation failed for a reason other than the above.
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`QsError`].
pub type Result<T> = std::result::Result<T, QsError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

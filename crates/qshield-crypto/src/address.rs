//! Public-key-to-address derivation.
//!
//! An address is the first 20 bytes of `SHA-256(ML-DSA-65 public key)`
//! encoded as Bech32 with the human-readable prefix `qs`. The Bech32
//! checksum gives typo detection when addresses are copied by hand.
//!
//! Example: `qs1` followed by 32 data characters and a 6-character
//! checksum.

use std::fmt;
use std::str::FromStr;

use bech32::{self, FromBase32, ToBase32, Variant};
use qshield_types::{KeyScheme, QsError, Result};

use crate::hash::sha256;
use crate::keys::check_len;

/// Human-readable prefix for Bech32-encoded addresses.
pub const ADDRESS_HRP: &str = "qs";

/// Number of hash bytes kept in an address.
pub const ADDRESS_PAYLOAD_LEN: usize = 20;

/// Scheme whose public keys are addressable.
const ADDRESS_SCHEME: KeyScheme = KeyScheme::MlDsa65;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Short, checksummed, human-readable identifier of a signature key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Address {
    payload: [u8; ADDRESS_PAYLOAD_LEN],
    encoded: String,
}

impl Address {
    /// Derives the address of an ML-DSA-65 public key.
    ///
    /// # Errors
    ///
    /// [`QsError::InvalidKeyMaterial`] if `signature_public_key` is not
    /// exactly 1952 bytes. Nothing is hashed in that case.
    pub fn from_public_key(signature_public_key: &[u8]) -> Result<Self> {
        check_len(
            ADDRESS_SCHEME,
            "public key",
            signature_public_key.len(),
            ADDRESS_SCHEME.public_key_len(),
        )?;
        let digest = sha256(signature_public_key);
        let mut payload = [0u8; ADDRESS_PAYLOAD_LEN];
        payload.copy_from_slice(&digest[..ADDRESS_PAYLOAD_LEN]);
        Self::from_payload(payload)
    }

    /// Parses and validates a Bech32 address string.
    ///
    /// # Errors
    ///
    /// [`QsError::InvalidAddress`] if the string is not valid Bech32,
    /// carries a different prefix or variant, or decodes to the wrong
    /// payload length.
    pub fn from_bech32(s: &str) -> Result<Self> {
        let (hrp, data_base32, variant) = bech32::decode(s).map_err(|e| QsError::InvalidAddress {
            reason: format!("bech32 decoding failed: {e}"),
        })?;

        if hrp != ADDRESS_HRP {
            return Err(QsError::InvalidAddress {
                reason: format!("expected HRP '{ADDRESS_HRP}', got '{hrp}'"),
            });
        }
        if variant != Variant::Bech32 {
            return Err(QsError::InvalidAddress {
                reason: "expected bech32 variant, got bech32m".into(),
            });
        }

        let bytes = Vec::<u8>::from_base32(&data_base32).map_err(|e| QsError::InvalidAddress {
            reason: format!("bech32 base32 conversion failed: {e}"),
        })?;
        if bytes.len() != ADDRESS_PAYLOAD_LEN {
            return Err(QsError::InvalidAddress {
                reason: format!(
                    "expected {ADDRESS_PAYLOAD_LEN} payload bytes, got {}",
                    bytes.len()
                ),
            });
        }

        let mut payload = [0u8; ADDRESS_PAYLOAD_LEN];
        payload.copy_from_slice(&bytes);
        Self::from_payload(payload)
    }

    /// The 20-byte hash payload.
    pub fn payload(&self) -> &[u8; ADDRESS_PAYLOAD_LEN] {
        &self.payload
    }

    /// Lower-case Bech32 string.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    fn from_payload(payload: [u8; ADDRESS_PAYLOAD_LEN]) -> Result<Self> {
        let encoded = bech32::encode(ADDRESS_HRP, payload.to_base32(), Variant::Bech32).map_err(|e| {
            QsError::CryptoError {
                reason: format!("bech32 encoding failed: {e}"),
            }
        })?;
        Ok(Self { payload, encoded })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl FromStr for Address {
    type Err = QsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}

/// Derives the address of an ML-DSA-65 public key.
///
/// Shorthand for [`Address::from_public_key`].
pub fn to_address(signature_public_key: &[u8]) -> Result<Address> {
    Address::from_public_key(signature_public_key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Key containers: scheme-tagged key pairs, KEM shared secrets and the
//! two-key bundle a wallet owns.
//!
//! Private bytes live in [`Zeroizing`] buffers and are scrubbed when
//! the owning value is dropped. None of these types implement `Clone`,
//! and their `Debug` output redacts private material.

use std::fmt;

use qshield_types::{KeyScheme, QsError, Result, SchemeKind};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// Immutable public/private key pair tagged with its scheme.
///
/// Construction checks both lengths against the scheme's published
/// sizes, so a `KeyPair` in hand always has correctly sized keys.
pub struct KeyPair {
    scheme: KeyScheme,
    public_key: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    /// Builds a key pair from raw parts.
    ///
    /// # Errors
    ///
    /// [`QsError::InvalidKeyMaterial`] if either key length does not
    /// match `scheme`. The rejected private bytes are zeroized.
    pub fn from_parts(scheme: KeyScheme, public_key: Vec<u8>, private_key: Vec<u8>) -> Result<Self> {
        let private_key = Zeroizing::new(private_key);
        check_len(scheme, "public key", public_key.len(), scheme.public_key_len())?;
        check_len(scheme, "private key", private_key.len(), scheme.private_key_len())?;
        Ok(Self {
            scheme,
            public_key,
            private_key,
        })
    }

    /// Scheme this pair belongs to.
    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    /// Public key bytes.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Private key bytes. Callers must not copy these into
    /// non-zeroizing storage.
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("scheme", &self.scheme)
            .field("public_key_len", &self.public_key.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Fails with [`QsError::InvalidKeyMaterial`] unless `actual == expected`.
pub(crate) fn check_len(scheme: KeyScheme, what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(QsError::InvalidKeyMaterial {
            reason: format!("{scheme} {what} must be {expected} bytes, got {actual}"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// KeyBundle
// ---------------------------------------------------------------------------

/// The long-term key material of one wallet: a KEM pair for receiving
/// envelopes and a signature pair for signing and addressing.
#[derive(Debug)]
pub struct KeyBundle {
    kem: KeyPair,
    signature: KeyPair,
}

impl KeyBundle {
    /// Pairs a KEM key pair with a signature key pair.
    ///
    /// # Errors
    ///
    /// [`QsError::InvalidKeyMaterial`] if either pair is of the wrong
    /// scheme family.
    pub fn new(kem: KeyPair, signature: KeyPair) -> Result<Self> {
        if kem.scheme().kind() != SchemeKind::Kem {
            return Err(QsError::InvalidKeyMaterial {
                reason: format!("expected a KEM key pair, got {}", kem.scheme()),
            });
        }
        if signature.scheme().kind() != SchemeKind::Signature {
            return Err(QsError::InvalidKeyMaterial {
                reason: format!("expected a signature key pair, got {}", signature.scheme()),
            });
        }
        Ok(Self { kem, signature })
    }

    /// KEM key pair.
    pub fn kem(&self) -> &KeyPair {
        &self.kem
    }

    /// Signature key pair.
    pub fn signature(&self) -> &KeyPair {
        &self.signature
    }
}

// ---------------------------------------------------------------------------
// SharedSecret
// ---------------------------------------------------------------------------

/// Raw KEM shared secret (32 bytes).
///
/// Never serialized. It only feeds the key-derivation stage and is
/// zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

// SharedSecret does not implement Clone/Debug to prevent leakage.

impl SharedSecret {
    /// Fixed byte length of a shared secret.
    pub const LEN: usize = 32;

    /// Copies a shared secret out of a primitive's output buffer.
    ///
    /// # Errors
    ///
    /// [`QsError::CryptoError`] if `bytes` is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(QsError::CryptoError {
                reason: format!(
                    "shared secret must be {} bytes, got {}",
                    Self::LEN,
                    bytes.len()
                ),
            });
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Returns the raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

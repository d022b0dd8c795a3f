//! Explicitly marked non-cryptographic key material.
//!
//! When no primitive backend can be initialized, some callers (demos,
//! UI smoke tests) still want key-shaped output. This module produces
//! it under a separate type, [`StubKeyMaterial`], that cannot be turned
//! into a [`KeyPair`] or [`KeyBundle`] and whose scheme labels carry a
//! ` (stub)` suffix. Stub output is only produced when the caller opts
//! in; otherwise an unavailable provider is reported as
//! [`QsError::PrimitiveUnavailable`].

use qshield_types::{KeyScheme, QsError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;
use zeroize::Zeroizing;

use crate::keys::KeyBundle;
use crate::provider::{PrimitiveProvider, KEM_SCHEME, SIGNATURE_SCHEME};

/// Suffix appended to the scheme label of stub material.
pub const STUB_SUFFIX: &str = " (stub)";

// ---------------------------------------------------------------------------
// StubKeyPair / StubKeyMaterial
// ---------------------------------------------------------------------------

/// Random bytes sized like a key pair of `scheme`. Not a key.
pub struct StubKeyPair {
    scheme: KeyScheme,
    public_bytes: Vec<u8>,
    private_bytes: Zeroizing<Vec<u8>>,
}

impl StubKeyPair {
    fn random(scheme: KeyScheme) -> Result<Self> {
        let mut public_bytes = vec![0u8; scheme.public_key_len()];
        let mut private_bytes = Zeroizing::new(vec![0u8; scheme.private_key_len()]);
        OsRng
            .try_fill_bytes(&mut public_bytes)
            .and_then(|()| OsRng.try_fill_bytes(&mut private_bytes))
            .map_err(|e| QsError::CryptoError {
                reason: format!("failed to generate stub bytes: {e}"),
            })?;
        Ok(Self {
            scheme,
            public_bytes,
            private_bytes,
        })
    }

    /// Scheme label with the stub marker, e.g. `ML-KEM-768 (stub)`.
    /// Never parses as a [`KeyScheme`].
    pub fn label(&self) -> String {
        format!("{}{STUB_SUFFIX}", self.scheme.id())
    }

    /// Placeholder public bytes.
    pub fn public_bytes(&self) -> &[u8] {
        &self.public_bytes
    }

    /// Placeholder private bytes.
    pub fn private_bytes(&self) -> &[u8] {
        &self.private_bytes
    }
}

/// Placeholder bundle produced when no real backend is available.
pub struct StubKeyMaterial {
    kem: StubKeyPair,
    signature: StubKeyPair,
}

impl StubKeyMaterial {
    /// Always `true`. Present so serializers can emit an explicit
    /// marker without matching on the type.
    pub const IS_STUB: bool = true;

    /// Draws fresh placeholder bytes for both pairs.
    pub fn generate() -> Result<Self> {
        Ok(Self {
            kem: StubKeyPair::random(KEM_SCHEME)?,
            signature: StubKeyPair::random(SIGNATURE_SCHEME)?,
        })
    }

    /// KEM-shaped placeholder.
    pub fn kem(&self) -> &StubKeyPair {
        &self.kem
    }

    /// Signature-shaped placeholder.
    pub fn signature(&self) -> &StubKeyPair {
        &self.signature
    }
}

// ---------------------------------------------------------------------------
// KeygenOutcome
// ---------------------------------------------------------------------------

/// Result of a key generation that may have degraded to stub output.
pub enum KeygenOutcome {
    /// Real key material from an initialized provider.
    Genuine(KeyBundle),
    /// Placeholder bytes. Must not be used for any cryptographic
    /// operation.
    Stub(StubKeyMaterial),
}

impl KeygenOutcome {
    /// `true` for [`KeygenOutcome::Stub`].
    pub fn is_stub(&self) -> bool {
        matches!(self, Self::Stub(_))
    }

    /// Returns the genuine bundle, rejecting stub material.
    ///
    /// # Errors
    ///
    /// [`QsError::PrimitiveUnavailable`] for stub output.
    pub fn into_genuine(self) -> Result<KeyBundle> {
        match self {
            Self::Genuine(bundle) => Ok(bundle),
            Self::Stub(_) => Err(QsError::PrimitiveUnavailable {
                reason: "key material is a stub".into(),
            }),
        }
    }
}

/// Generates a key bundle, or stub material if the provider failed to
/// initialize and `allow_stub` is set.
///
/// `provider` is the outcome of provider construction, passed through
/// as-is so the original failure reason is preserved.
///
/// # Errors
///
/// - [`QsError::PrimitiveUnavailable`] if the provider is unavailable
///   and `allow_stub` is `false`.
/// - Any error from key generation on a working provider. These never
///   degrade to stub output.
pub fn generate_or_stub(
    provider: std::result::Result<&PrimitiveProvider, &QsError>,
    allow_stub: bool,
) -> Result<KeygenOutcome> {
    match provider {
        Ok(provider) => provider.generate_bundle().map(KeygenOutcome::Genuine),
        Err(e) if allow_stub => {
            warn!(error = %e, "primitive provider unavailable; emitting stub key material");
            StubKeyMaterial::generate().map(KeygenOutcome::Stub)
        }
        Err(e) => Err(QsError::PrimitiveUnavailable {
            reason: e.to_string(),
        }),
    }
}

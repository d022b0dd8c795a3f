//! Polymorphic boundary over the post-quantum KEM and signature
//! primitives.
//!
//! A [`PrimitiveBackend`] supplies raw ML-KEM-768 / ML-DSA-65
//! operations. [`PrimitiveProvider`] wraps one backend and adds the
//! fail-closed size checks every caller relies on: no byte slice of the
//! wrong length ever reaches the backend.
//!
//! # Initialization contract
//!
//! A provider is constructed explicitly, once, by the caller (usually
//! at process start) through [`PrimitiveProvider::new`] or
//! [`PrimitiveProvider::pqclean`]. Construction runs a self-test
//! (KEM round trip, sign/verify, tampered-message rejection and output
//! sizes). If anything fails the caller gets
//! [`QsError::PrimitiveUnavailable`] and no provider. There is no
//! global or lazily resolved backend.
//!
//! The provider is `Clone + Send + Sync`; clones share the backend.

use std::sync::Arc;

use qshield_types::{KeyScheme, QsError, Result, SchemeKind};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::keys::{check_len, KeyBundle, KeyPair, SharedSecret};
use crate::pqclean::PqcleanBackend;

/// KEM scheme every backend implements.
pub const KEM_SCHEME: KeyScheme = KeyScheme::MlKem768;

/// Signature scheme every backend implements.
pub const SIGNATURE_SCHEME: KeyScheme = KeyScheme::MlDsa65;

/// Message signed during the construction self-test.
const SELF_TEST_MESSAGE: &[u8] = b"qshield primitive self-test";

// ---------------------------------------------------------------------------
// PrimitiveBackend
// ---------------------------------------------------------------------------

/// Raw primitive operations for ML-KEM-768 and ML-DSA-65.
///
/// Implementations may assume every input slice has already been
/// length-checked by [`PrimitiveProvider`]. Randomness must come from a
/// source that is safe to use from many threads at once.
pub trait PrimitiveBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Generates an ML-KEM-768 key pair as `(public, private)`.
    fn kem_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)>;

    /// Encapsulates to `public_key`, returning the shared secret and
    /// the KEM ciphertext.
    fn kem_encapsulate(&self, public_key: &[u8]) -> Result<(SharedSecret, Vec<u8>)>;

    /// Recovers the shared secret from `ciphertext` with `private_key`.
    fn kem_decapsulate(&self, private_key: &[u8], ciphertext: &[u8]) -> Result<SharedSecret>;

    /// Generates an ML-DSA-65 key pair as `(public, private)`.
    fn sig_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)>;

    /// Produces a detached signature over `message`.
    fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>>;

    /// Checks a detached signature. `Ok(false)` means "does not verify".
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// PrimitiveProvider
// ---------------------------------------------------------------------------

/// Size-checked, self-tested handle to a [`PrimitiveBackend`].
#[derive(Clone)]
pub struct PrimitiveProvider {
    backend: Arc<dyn PrimitiveBackend>,
}

impl std::fmt::Debug for PrimitiveProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveProvider")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl PrimitiveProvider {
    /// Wraps `backend` after running the self-test.
    ///
    /// # Errors
    ///
    /// [`QsError::PrimitiveUnavailable`] if any self-test step fails.
    pub fn new(backend: Arc<dyn PrimitiveBackend>) -> Result<Self> {
        let provider = Self { backend };
        if let Err(e) = provider.self_test() {
            warn!(backend = provider.backend.name(), error = %e, "primitive self-test failed");
            return Err(QsError::PrimitiveUnavailable {
                reason: format!("{} self-test failed: {e}", provider.backend.name()),
            });
        }
        debug!(backend = provider.backend.name(), "primitive provider ready");
        Ok(provider)
    }

    /// Builds a provider over the PQClean ML-KEM-768 / ML-DSA-65
    /// implementations.
    pub fn pqclean() -> Result<Self> {
        Self::new(Arc::new(PqcleanBackend))
    }

    /// Name of the wrapped backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Generates a fresh key pair for `scheme`.
    ///
    /// # Errors
    ///
    /// [`QsError::InvalidKeyMaterial`] if `scheme` is not one this
    /// provider implements, or if the backend returns mis-sized keys.
    pub fn keygen(&self, scheme: KeyScheme) -> Result<KeyPair> {
        let (public_key, private_key) = match scheme {
            s if s == KEM_SCHEME => self.backend.kem_keypair()?,
            s if s == SIGNATURE_SCHEME => self.backend.sig_keypair()?,
            other => {
                return Err(QsError::InvalidKeyMaterial {
                    reason: format!("scheme {other} not supported by {}", self.backend.name()),
                })
            }
        };
        let keypair = KeyPair::from_parts(scheme, public_key, private_key.to_vec())?;
        debug!(%scheme, "generated key pair");
        Ok(keypair)
    }

    /// Generates a KEM pair and a signature pair together.
    pub fn generate_bundle(&self) -> Result<KeyBundle> {
        let kem = self.keygen(KEM_SCHEME)?;
        let signature = self.keygen(SIGNATURE_SCHEME)?;
        KeyBundle::new(kem, signature)
    }

    /// Encapsulates to a peer's KEM public key.
    ///
    /// # Errors
    ///
    /// [`QsError::InvalidKeyMaterial`] if `peer_public_key` is not
    /// exactly 1184 bytes. The backend is not called in that case.
    pub fn encapsulate(&self, peer_public_key: &[u8]) -> Result<(SharedSecret, Vec<u8>)> {
        check_len(KEM_SCHEME, "public key", peer_public_key.len(), KEM_SCHEME.public_key_len())?;
        let (secret, ciphertext) = self.backend.kem_encapsulate(peer_public_key)?;
        check_output(KEM_SCHEME, "ciphertext", ciphertext.len(), KEM_SCHEME.output_len())?;
        Ok((secret, ciphertext))
    }

    /// Recovers a shared secret with our own KEM private key.
    ///
    /// ML-KEM uses implicit rejection: a forged ciphertext of the right
    /// size yields an unrelated secret rather than an error, which the
    /// AEAD stage then rejects.
    ///
    /// # Errors
    ///
    /// - [`QsError::InvalidKeyMaterial`] if `own_private_key` is not
    ///   exactly 2400 bytes.
    /// - [`QsError::MalformedEnvelope`] if `kem_ciphertext` is not
    ///   exactly 1088 bytes.
    pub fn decapsulate(&self, own_private_key: &[u8], kem_ciphertext: &[u8]) -> Result<SharedSecret> {
        check_len(KEM_SCHEME, "private key", own_private_key.len(), KEM_SCHEME.private_key_len())?;
        if kem_ciphertext.len() != KEM_SCHEME.output_len() {
            return Err(QsError::MalformedEnvelope {
                reason: format!(
                    "{KEM_SCHEME} ciphertext must be {} bytes, got {}",
                    KEM_SCHEME.output_len(),
                    kem_ciphertext.len()
                ),
            });
        }
        self.backend.kem_decapsulate(own_private_key, kem_ciphertext)
    }

    /// Signs `message` with an ML-DSA-65 private key.
    ///
    /// # Errors
    ///
    /// [`QsError::InvalidKeyMaterial`] if `private_key` is not exactly
    /// 4032 bytes.
    pub fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        check_len(
            SIGNATURE_SCHEME,
            "private key",
            private_key.len(),
            SIGNATURE_SCHEME.private_key_len(),
        )?;
        let signature = self.backend.sign(private_key, message)?;
        check_output(SIGNATURE_SCHEME, "signature", signature.len(), SIGNATURE_SCHEME.output_len())?;
        Ok(signature)
    }

    /// Verifies a detached ML-DSA-65 signature.
    ///
    /// A signature of the wrong length simply does not verify.
    ///
    /// # Errors
    ///
    /// [`QsError::InvalidKeyMaterial`] if `public_key` is not exactly
    /// 1952 bytes.
    pub fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool> {
        check_len(
            SIGNATURE_SCHEME,
            "public key",
            public_key.len(),
            SIGNATURE_SCHEME.public_key_len(),
        )?;
        if signature.len() != SIGNATURE_SCHEME.output_len() {
            debug!(len = signature.len(), "signature has wrong length");
            return Ok(false);
        }
        self.backend.verify(public_key, message, signature)
    }

    /// Checks that `keypair` is usable for the operation family `kind`.
    pub fn expect_kind(keypair: &KeyPair, kind: SchemeKind) -> Result<()> {
        if keypair.scheme().kind() != kind {
            return Err(QsError::InvalidKeyMaterial {
                reason: format!("{} key used where a {kind} key is required", keypair.scheme()),
            });
        }
        Ok(())
    }

    fn self_test(&self) -> Result<()> {
        let kem = self.keygen(KEM_SCHEME)?;
        let (sent, ciphertext) = self.encapsulate(kem.public_key())?;
        let received = self.decapsulate(kem.private_key(), &ciphertext)?;
        if sent.as_bytes() != received.as_bytes() {
            return Err(QsError::CryptoError {
                reason: "KEM round trip produced different secrets".into(),
            });
        }

        let sig = self.keygen(SIGNATURE_SCHEME)?;
        let signature = self.sign(sig.private_key(), SELF_TEST_MESSAGE)?;
        if !self.verify(sig.public_key(), SELF_TEST_MESSAGE, &signature)? {
            return Err(QsError::CryptoError {
                reason: "signature did not verify".into(),
            });
        }
        if self.verify(sig.public_key(), b"tampered", &signature)? {
            return Err(QsError::CryptoError {
                reason: "signature verified over the wrong message".into(),
            });
        }
        Ok(())
    }
}

/// Backend outputs of the wrong size indicate a broken backend.
fn check_output(scheme: KeyScheme, what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(QsError::CryptoError {
            reason: format!("{scheme} backend returned {what} of {actual} bytes, expected {expected}"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Backend whose KEM disagrees with itself.
    struct BrokenKem;

    impl PrimitiveBackend for BrokenKem {
        fn name(&self) -> &'static str {
            "broken-kem"
        }
        fn kem_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
            Ok((vec![0u8; 1184], Zeroizing::new(vec![0u8; 2400])))
        }
        fn kem_encapsulate(&self, _pk: &[u8]) -> Result<(SharedSecret, Vec<u8>)> {
            Ok((SharedSecret::from_slice(&[1u8; 32])?, vec![0u8; 1088]))
        }
        fn kem_decapsulate(&self, _sk: &[u8], _ct: &[u8]) -> Result<SharedSecret> {
            SharedSecret::from_slice(&[2u8; 32])
        }
        fn sig_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
            Ok((vec![0u8; 1952], Zeroizing::new(vec![0u8; 4032])))
        }
        fn sign(&self, _sk: &[u8], _msg: &[u8]) -> Result<Vec<u8>> {
            Ok(vec![0u8; 3309])
        }
        fn verify(&self, _pk: &[u8], _msg: &[u8], _sig: &[u8]) -> Result<bool> {
            Ok(true)
        }
    }

    /// Backend that refuses to do anything.
    struct Unloadable;

    impl PrimitiveBackend for Unloadable {
        fn name(&self) -> &'static str {
            "unloadable"
        }
        fn kem_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
            Err(QsError::CryptoError {
                reason: "library not loaded".into(),
            })
        }
        fn kem_encapsulate(&self, _pk: &[u8]) -> Result<(SharedSecret, Vec<u8>)> {
            unreachable!("keygen fails first")
        }
        fn kem_decapsulate(&self, _sk: &[u8], _ct: &[u8]) -> Result<SharedSecret> {
            unreachable!("keygen fails first")
        }
        fn sig_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
            unreachable!("keygen fails first")
        }
        fn sign(&self, _sk: &[u8], _msg: &[u8]) -> Result<Vec<u8>> {
            unreachable!("keygen fails first")
        }
        fn verify(&self, _pk: &[u8], _msg: &[u8], _sig: &[u8]) -> Result<bool> {
            unreachable!("keygen fails first")
        }
    }

    /// Counts encapsulations so size checks can be shown to run first.
    struct CountingBackend {
        encapsulations: AtomicUsize,
    }

    impl PrimitiveBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn kem_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
            PqcleanBackend.kem_keypair()
        }
        fn kem_encapsulate(&self, pk: &[u8]) -> Result<(SharedSecret, Vec<u8>)> {
            self.encapsulations.fetch_add(1, Ordering::SeqCst);
            PqcleanBackend.kem_encapsulate(pk)
        }
        fn kem_decapsulate(&self, sk: &[u8], ct: &[u8]) -> Result<SharedSecret> {
            PqcleanBackend.kem_decapsulate(sk, ct)
        }
        fn sig_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
            PqcleanBackend.sig_keypair()
        }
        fn sign(&self, sk: &[u8], msg: &[u8]) -> Result<Vec<u8>> {
            PqcleanBackend.sign(sk, msg)
        }
        fn verify(&self, pk: &[u8], msg: &[u8], sig: &[u8]) -> Result<bool> {
            PqcleanBackend.verify(pk, msg, sig)
        }
    }

    #[test]
    fn broken_backend_is_unavailable() {
        let result = PrimitiveProvider::new(Arc::new(BrokenKem));
        assert!(matches!(result, Err(QsError::PrimitiveUnavailable { .. })));
    }

    #[test]
    fn failing_backend_is_unavailable() {
        let result = PrimitiveProvider::new(Arc::new(Unloadable));
        assert!(matches!(result, Err(QsError::PrimitiveUnavailable { .. })));
    }

    #[test]
    fn wrong_size_public_key_never_reaches_backend() -> std::result::Result<(), QsError> {
        let backend = Arc::new(CountingBackend {
            encapsulations: AtomicUsize::new(0),
        });
        let provider = PrimitiveProvider::new(backend.clone())?;
        let after_self_test = backend.encapsulations.load(Ordering::SeqCst);

        let result = provider.encapsulate(&[0u8; 1183]);
        assert!(matches!(result, Err(QsError::InvalidKeyMaterial { .. })));
        assert_eq!(backend.encapsulations.load(Ordering::SeqCst), after_self_test);
        Ok(())
    }

    #[test]
    fn pqclean_provider_initializes() -> std::result::Result<(), QsError> {
        let provider = PrimitiveProvider::pqclean()?;
        assert_eq!(provider.backend_name(), "pqclean");
        Ok(())
    }

    #[test]
    fn keygen_produces_published_sizes() -> std::result::Result<(), QsError> {
        let provider = PrimitiveProvider::pqclean()?;
        let bundle = provider.generate_bundle()?;
        assert_eq!(bundle.kem().public_key().len(), 1184);
        assert_eq!(bundle.kem().private_key().len(), 2400);
        assert_eq!(bundle.signature().public_key().len(), 1952);
        assert_eq!(bundle.signature().private_key().len(), 4032);
        Ok(())
    }

    #[test]
    fn encapsulate_decapsulate_agree() -> std::result::Result<(), QsError> {
        let provider = PrimitiveProvider::pqclean()?;
        let kp = provider.keygen(KeyScheme::MlKem768)?;
        let (secret, ciphertext) = provider.encapsulate(kp.public_key())?;
        assert_eq!(ciphertext.len(), 1088);
        let recovered = provider.decapsulate(kp.private_key(), &ciphertext)?;
        assert_eq!(secret.as_bytes(), recovered.as_bytes());
        Ok(())
    }

    #[test]
    fn decapsulate_rejects_bad_sizes() -> std::result::Result<(), QsError> {
        let provider = PrimitiveProvider::pqclean()?;
        let kp = provider.keygen(KeyScheme::MlKem768)?;
        let (_, ciphertext) = provider.encapsulate(kp.public_key())?;

        let short_key = provider.decapsulate(&kp.private_key()[..2399], &ciphertext);
        assert!(matches!(short_key, Err(QsError::InvalidKeyMaterial { .. })));

        let short_ct = provider.decapsulate(kp.private_key(), &ciphertext[..1087]);
        assert!(matches!(short_ct, Err(QsError::MalformedEnvelope { .. })));
        Ok(())
    }

    #[test]
    fn sign_verify_roundtrip() -> std::result::Result<(), QsError> {
        let provider = PrimitiveProvider::pqclean()?;
        let kp = provider.keygen(KeyScheme::MlDsa65)?;
        let signature = provider.sign(kp.private_key(), b"transfer 5 QS")?;
        assert_eq!(signature.len(), 3309);
        assert!(provider.verify(kp.public_key(), b"transfer 5 QS", &signature)?);
        assert!(!provider.verify(kp.public_key(), b"transfer 6 QS", &signature)?);
        Ok(())
    }

    #[test]
    fn verify_with_other_key_fails() -> std::result::Result<(), QsError> {
        let provider = PrimitiveProvider::pqclean()?;
        let signer = provider.keygen(KeyScheme::MlDsa65)?;
        let other = provider.keygen(KeyScheme::MlDsa65)?;
        let signature = provider.sign(signer.private_key(), b"msg")?;
        assert!(!provider.verify(other.public_key(), b"msg", &signature)?);
        Ok(())
    }

    #[test]
    fn truncated_signature_does_not_verify() -> std::result::Result<(), QsError> {
        let provider = PrimitiveProvider::pqclean()?;
        let kp = provider.keygen(KeyScheme::MlDsa65)?;
        let signature = provider.sign(kp.private_key(), b"msg")?;
        assert!(!provider.verify(kp.public_key(), b"msg", &signature[..100])?);
        Ok(())
    }

    #[test]
    fn sign_with_kem_sized_key_rejected() -> std::result::Result<(), QsError> {
        let provider = PrimitiveProvider::pqclean()?;
        let kem = provider.keygen(KeyScheme::MlKem768)?;
        let result = provider.sign(kem.private_key(), b"msg");
        assert!(matches!(result, Err(QsError::InvalidKeyMaterial { .. })));
        assert!(PrimitiveProvider::expect_kind(&kem, SchemeKind::Signature).is_err());
        Ok(())
    }

    #[test]
    fn provider_is_shareable_across_threads() -> std::result::Result<(), QsError> {
        let provider = PrimitiveProvider::pqclean()?;
        let kp = provider.keygen(KeyScheme::MlKem768)?;
        let public_key = kp.public_key().to_vec();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = provider.clone();
                let pk = public_key.clone();
                std::thread::spawn(move || p.encapsulate(&pk).map(|(_, ct)| ct))
            })
            .collect();

        let mut ciphertexts = Vec::new();
        for h in handles {
            let ct = h.join().map_err(|_| QsError::CryptoError {
                reason: "thread panicked".into(),
            })??;
            ciphertexts.push(ct);
        }
        ciphertexts.sort();
        ciphertexts.dedup();
        assert_eq!(ciphertexts.len(), 4);
        Ok(())
    }
}

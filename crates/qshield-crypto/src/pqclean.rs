//! [`PrimitiveBackend`] over the PQClean ML-KEM-768 and ML-DSA-65
//! implementations shipped by the `pqcrypto-*` crates.

use pqcrypto_mldsa::mldsa65;
use pqcrypto_mlkem::mlkem768;
use pqcrypto_traits::kem::{
    Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _,
};
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};
use qshield_types::{QsError, Result};
use zeroize::Zeroizing;

use crate::keys::SharedSecret;
use crate::provider::PrimitiveBackend;

/// PQClean-backed primitives. Stateless; randomness comes from the
/// library's system RNG binding.
#[derive(Clone, Copy, Debug, Default)]
pub struct PqcleanBackend;

impl PrimitiveBackend for PqcleanBackend {
    fn name(&self) -> &'static str {
        "pqclean"
    }

    fn kem_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
        let (pk, sk) = mlkem768::keypair();
        Ok((pk.as_bytes().to_vec(), Zeroizing::new(sk.as_bytes().to_vec())))
    }

    fn kem_encapsulate(&self, public_key: &[u8]) -> Result<(SharedSecret, Vec<u8>)> {
        let pk = mlkem768::PublicKey::from_bytes(public_key).map_err(|_| QsError::InvalidKeyMaterial {
            reason: "ML-KEM-768 public key rejected".into(),
        })?;
        let (ss, ct) = mlkem768::encapsulate(&pk);
        let secret = SharedSecret::from_slice(ss.as_bytes())?;
        Ok((secret, ct.as_bytes().to_vec()))
    }

    fn kem_decapsulate(&self, private_key: &[u8], ciphertext: &[u8]) -> Result<SharedSecret> {
        let sk = mlkem768::SecretKey::from_bytes(private_key).map_err(|_| QsError::InvalidKeyMaterial {
            reason: "ML-KEM-768 private key rejected".into(),
        })?;
        let ct = mlkem768::Ciphertext::from_bytes(ciphertext).map_err(|_| QsError::MalformedEnvelope {
            reason: "ML-KEM-768 ciphertext rejected".into(),
        })?;
        let ss = mlkem768::decapsulate(&ct, &sk);
        SharedSecret::from_slice(ss.as_bytes())
    }

    fn sig_keypair(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
        let (pk, sk) = mldsa65::keypair();
        Ok((pk.as_bytes().to_vec(), Zeroizing::new(sk.as_bytes().to_vec())))
    }

    fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        let sk = mldsa65::SecretKey::from_bytes(private_key).map_err(|_| QsError::InvalidKeyMaterial {
            reason: "ML-DSA-65 private key rejected".into(),
        })?;
        let signature = mldsa65::detached_sign(message, &sk);
        Ok(signature.as_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool> {
        let pk = mldsa65::PublicKey::from_bytes(public_key).map_err(|_| QsError::InvalidKeyMaterial {
            reason: "ML-DSA-65 public key rejected".into(),
        })?;
        let sig = match mldsa65::DetachedSignature::from_bytes(signature) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        Ok(mldsa65::verify_detached_signature(&sig, message, &pk).is_ok())
    }
}

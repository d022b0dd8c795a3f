//! Lock, unlock and re-lock a wallet's key bundle with a passphrase.
//!
//! # Lock
//!
//! ```text
//! 1. salt  ← random 16 bytes
//! 2. key   ← HKDF-SHA256(SlowKDF(passphrase, salt), salt,
//!                        info="qshield/keyfile/aead-256/v1", 32)
//! 3. nonce ← random 12 bytes
//! 4. aad   ← "qshield-keyfile-v1" || kem_pk || sig_pk
//! 5. ct    ← AES-256-GCM(key, nonce, private bundle, aad) || tag
//! ```
//!
//! Unlock repeats steps 2 and 4 with the stored salt and decrypts. The
//! KDF runs before the encrypted fields are inspected, so a wrong
//! passphrase and a corrupted file cost the same and both yield
//! [`QsError::WrongPassphraseOrCorrupted`].

use qshield_crypto::aead::{
    decrypt_aes256gcm, encrypt_aes256gcm, generate_aead_nonce, AeadNonce, AuthTag,
};
use qshield_crypto::derive::{
    derive_key, generate_salt, SecretInput, AEAD_KEY_LEN, KEYFILE_CONTEXT, SALT_LEN,
};
use qshield_crypto::kdf::PassphraseKdf;
use qshield_crypto::KeyBundle;
use qshield_types::{QsError, Result};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::bundle::{decode_private_bundle, encode_private_bundle};
use crate::keyfile::{EncryptedPrivatePart, PassphraseKeyFile};

/// Associated-data prefix binding ciphertext to this file format.
pub(crate) const KEYFILE_AAD_PREFIX: &[u8] = b"qshield-keyfile-v1";

fn keyfile_aad(kem_public_key: &[u8], signature_public_key: &[u8]) -> Vec<u8> {
    let mut aad =
        Vec::with_capacity(KEYFILE_AAD_PREFIX.len() + kem_public_key.len() + signature_public_key.len());
    aad.extend_from_slice(KEYFILE_AAD_PREFIX);
    aad.extend_from_slice(kem_public_key);
    aad.extend_from_slice(signature_public_key);
    aad
}

// ---------------------------------------------------------------------------
// Lock
// ---------------------------------------------------------------------------

/// Encrypts both private keys of `bundle` under `passphrase`.
///
/// Draws a fresh salt and nonce on every call.
///
/// # Errors
///
/// - [`QsError::ConfigError`] if `passphrase` is empty or `kdf` is
///   below its cost floor.
/// - [`QsError::CryptoError`] if the random source fails.
pub fn lock_wallet(passphrase: &str, bundle: &KeyBundle, kdf: PassphraseKdf) -> Result<PassphraseKeyFile> {
    if passphrase.is_empty() {
        return Err(QsError::ConfigError {
            reason: "passphrase must not be empty".into(),
        });
    }
    kdf.validate()?;

    let salt = generate_salt()?;
    let key = derive_key(
        SecretInput::Passphrase {
            passphrase: passphrase.as_bytes(),
            kdf,
        },
        &salt,
        KEYFILE_CONTEXT,
        AEAD_KEY_LEN,
    )?;

    let plaintext = encode_private_bundle(bundle)?;
    let nonce = generate_aead_nonce()?;
    let aad = keyfile_aad(bundle.kem().public_key(), bundle.signature().public_key());
    let sealed = encrypt_aes256gcm(key.aead_key()?, &nonce, &plaintext, &aad)?;

    let mut ciphertext = sealed.ciphertext;
    ciphertext.extend_from_slice(sealed.tag.as_bytes());

    debug!(kdf = %kdf.algorithm(), iterations = kdf.iterations(), "locked key bundle");
    Ok(PassphraseKeyFile::new(
        bundle.kem().public_key().to_vec(),
        bundle.signature().public_key().to_vec(),
        EncryptedPrivatePart {
            kdf,
            salt: salt.to_vec(),
            nonce: nonce.as_bytes().to_vec(),
            ciphertext,
        },
    ))
}

// ---------------------------------------------------------------------------
// Unlock
// ---------------------------------------------------------------------------

/// Decrypts the key bundle held in `file`.
///
/// # Errors
///
/// [`QsError::WrongPassphraseOrCorrupted`] for every failure, whether
/// the passphrase is wrong, the tag fails, an encrypted field has the
/// wrong size, or the decrypted bundle is inconsistent.
pub fn unlock_wallet(file: &PassphraseKeyFile, passphrase: &str) -> Result<KeyBundle> {
    let enc = file.encrypted();

    let salt_ok = enc.salt.len() == SALT_LEN;
    let dummy_salt = [0u8; SALT_LEN];
    let salt: &[u8] = if salt_ok { &enc.salt } else { &dummy_salt };

    let key = derive_key(
        SecretInput::Passphrase {
            passphrase: passphrase.as_bytes(),
            kdf: enc.kdf,
        },
        salt,
        KEYFILE_CONTEXT,
        AEAD_KEY_LEN,
    )
    .map_err(|_| QsError::WrongPassphraseOrCorrupted)?;

    let nonce: Option<[u8; AeadNonce::LEN]> = enc.nonce.as_slice().try_into().ok();
    let split = enc.ciphertext.len().checked_sub(AuthTag::LEN);
    let (nonce, split) = match (salt_ok, nonce, split) {
        (true, Some(nonce), Some(split)) => (AeadNonce::from_bytes(nonce), split),
        _ => {
            warn!("key file has mis-sized encrypted fields");
            return Err(QsError::WrongPassphraseOrCorrupted);
        }
    };

    let (ciphertext, tag) = enc.ciphertext.split_at(split);
    let tag: [u8; AuthTag::LEN] = tag
        .try_into()
        .map_err(|_| QsError::WrongPassphraseOrCorrupted)?;
    let aad = keyfile_aad(file.kem_public_key(), file.signature_public_key());

    let plaintext = Zeroizing::new(
        decrypt_aes256gcm(
            key.aead_key()?,
            &nonce,
            ciphertext,
            &AuthTag::from_bytes(tag),
            &aad,
        )
        .map_err(|_| QsError::WrongPassphraseOrCorrupted)?,
    );

    let bundle = decode_private_bundle(&plaintext, file.kem_public_key(), file.signature_public_key())
        .map_err(|_| QsError::WrongPassphraseOrCorrupted)?;
    debug!("unlocked key bundle");
    Ok(bundle)
}

// ---------------------------------------------------------------------------
// Relock
// ---------------------------------------------------------------------------

/// Changes the passphrase of `file`.
///
/// The result never reuses the old salt or nonce. `kdf` selects the new
/// cost profile; `None` keeps the file's current one.
///
/// # Errors
///
/// Everything [`unlock_wallet`] and [`lock_wallet`] return.
pub fn relock_wallet(
    file: &PassphraseKeyFile,
    old_passphrase: &str,
    new_passphrase: &str,
    kdf: Option<PassphraseKdf>,
) -> Result<PassphraseKeyFile> {
    let bundle = unlock_wallet(file, old_passphrase)?;
    let kdf = kdf.unwrap_or(file.encrypted().kdf());
    lock_wallet(new_passphrase, &bundle, kdf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

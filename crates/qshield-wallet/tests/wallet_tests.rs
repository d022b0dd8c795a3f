//! Integration tests for qshield-wallet.
//!
//! Every test locks real ML-KEM-768 / ML-DSA-65 key material. PBKDF2
//! runs at the 200 000-iteration floor; Argon2id at its floor too.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use qshield_crypto::kdf::PassphraseKdf;
use qshield_crypto::{to_address, KeyBundle, PrimitiveProvider};
use qshield_types::config::{ARGON2_MIN_M_COST_KIB, ARGON2_MIN_T_COST, PBKDF2_MIN_ITERATIONS};
use qshield_types::QsError;
use qshield_wallet::{lock_wallet, relock_wallet, unlock_wallet, PassphraseKeyFile};

// ---------------------------------------------------------------------------
// Test constants
// ---------------------------------------------------------------------------

/// Wallet encryption passphrase used in tests.
const PASSPHRASE: &str = "correct horse battery staple";

/// Alternative passphrase for wrong-passphrase tests.
const WRONG_PASSPHRASE: &str = "wrong passphrase entirely";

const FLOOR_PBKDF2: PassphraseKdf = PassphraseKdf::Pbkdf2Sha256 {
    iterations: PBKDF2_MIN_ITERATIONS,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fresh_bundle() -> std::result::Result<KeyBundle, QsError> {
    PrimitiveProvider::pqclean()?.generate_bundle()
}

fn assert_same_keys(a: &KeyBundle, b: &KeyBundle) {
    assert_eq!(a.kem().public_key(), b.kem().public_key());
    assert_eq!(a.kem().private_key(), b.kem().private_key());
    assert_eq!(a.signature().public_key(), b.signature().public_key());
    assert_eq!(a.signature().private_key(), b.signature().private_key());
}

fn edit_json(
    file: &PassphraseKeyFile,
    edit: impl FnOnce(&mut serde_json::Value),
) -> std::result::Result<String, Box<dyn std::error::Error>> {
    let mut value: serde_json::Value = serde_json::from_str(&file.to_json()?)?;
    edit(&mut value);
    Ok(value.to_string())
}

// ---------------------------------------------------------------------------
// 1. Lock → Unlock
// ---------------------------------------------------------------------------

#[test]
fn lock_unlock_roundtrip() -> std::result::Result<(), QsError> {
    let bundle = fresh_bundle()?;
    let file = lock_wallet(PASSPHRASE, &bundle, FLOOR_PBKDF2)?;
    let restored = unlock_wallet(&file, PASSPHRASE)?;
    assert_same_keys(&bundle, &restored);
    Ok(())
}

#[test]
fn unlocked_keys_still_work() -> std::result::Result<(), QsError> {
    let provider = PrimitiveProvider::pqclean()?;
    let bundle = provider.generate_bundle()?;
    let file = lock_wallet(PASSPHRASE, &bundle, FLOOR_PBKDF2)?;
    let restored = unlock_wallet(&file, PASSPHRASE)?;

    let signature = provider.sign(restored.signature().private_key(), b"after restore")?;
    assert!(provider.verify(bundle.signature().public_key(), b"after restore", &signature)?);

    let (secret, ct) = provider.encapsulate(bundle.kem().public_key())?;
    let recovered = provider.decapsulate(restored.kem().private_key(), &ct)?;
    assert_eq!(secret.as_bytes(), recovered.as_bytes());
    Ok(())
}

#[test]
fn json_persistence_roundtrip() -> std::result::Result<(), QsError> {
    let bundle = fresh_bundle()?;
    let json = lock_wallet(PASSPHRASE, &bundle, FLOOR_PBKDF2)?.to_json()?;
    let reloaded = PassphraseKeyFile::from_json(&json)?;
    assert_same_keys(&bundle, &unlock_wallet(&reloaded, PASSPHRASE)?);
    Ok(())
}

#[test]
fn argon2id_profile_roundtrip() -> std::result::Result<(), QsError> {
    let kdf = PassphraseKdf::Argon2id {
        m_cost_kib: ARGON2_MIN_M_COST_KIB,
        t_cost: ARGON2_MIN_T_COST,
        p_cost: 1,
    };
    let bundle = fresh_bundle()?;
    let json = lock_wallet(PASSPHRASE, &bundle, kdf)?.to_json()?;
    assert!(json.contains("\"argon2id\""));
    assert!(json.contains("\"memoryKib\""));

    let file = PassphraseKeyFile::from_json(&json)?;
    assert_eq!(file.encrypted().kdf(), kdf);
    assert_same_keys(&bundle, &unlock_wallet(&file, PASSPHRASE)?);
    Ok(())
}

#[test]
fn same_bundle_locks_differently() -> std::result::Result<(), QsError> {
    let bundle = fresh_bundle()?;
    let a = lock_wallet(PASSPHRASE, &bundle, FLOOR_PBKDF2)?;
    let b = lock_wallet(PASSPHRASE, &bundle, FLOOR_PBKDF2)?;
    assert_ne!(a.encrypted().salt(), b.encrypted().salt());
    assert_ne!(a.encrypted().nonce(), b.encrypted().nonce());
    assert_ne!(a.encrypted().ciphertext(), b.encrypted().ciphertext());
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Wrong passphrase / corruption
// ---------------------------------------------------------------------------

#[test]
fn wrong_passphrase_rejected() -> std::result::Result<(), QsError> {
    let bundle = fresh_bundle()?;
    let file = lock_wallet(PASSPHRASE, &bundle, FLOOR_PBKDF2)?;

    let result = unlock_wallet(&file, WRONG_PASSPHRASE);
    assert!(matches!(result, Err(QsError::WrongPassphraseOrCorrupted)));

    // Correct passphrase still works after a failed attempt.
    assert_same_keys(&bundle, &unlock_wallet(&file, PASSPHRASE)?);
    Ok(())
}

#[test]
fn corrupted_ciphertext_reported_like_wrong_passphrase() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let file = lock_wallet(PASSPHRASE, &fresh_bundle()?, FLOOR_PBKDF2)?;
    let json = edit_json(&file, |v| {
        let mut ct = STANDARD
            .decode(v["encrypted"]["ciphertext"].as_str().unwrap_or_default())
            .unwrap_or_default();
        if let Some(byte) = ct.get_mut(10) {
            *byte ^= 0x01;
        }
        v["encrypted"]["ciphertext"] = serde_json::Value::String(STANDARD.encode(ct));
    })?;

    let corrupted = PassphraseKeyFile::from_json(&json)?;
    let wrong_pw = unlock_wallet(&file, WRONG_PASSPHRASE).err().map(|e| e.to_string());
    let corrupt = unlock_wallet(&corrupted, PASSPHRASE).err().map(|e| e.to_string());
    assert!(corrupt.is_some());
    assert_eq!(wrong_pw, corrupt);
    Ok(())
}

#[test]
fn short_salt_reported_like_wrong_passphrase() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let file = lock_wallet(PASSPHRASE, &fresh_bundle()?, FLOOR_PBKDF2)?;
    let json = edit_json(&file, |v| {
        v["encrypted"]["salt"] = serde_json::Value::String(STANDARD.encode([0u8; 4]));
    })?;
    let broken = PassphraseKeyFile::from_json(&json)?;
    assert!(matches!(
        unlock_wallet(&broken, PASSPHRASE),
        Err(QsError::WrongPassphraseOrCorrupted)
    ));
    Ok(())
}

#[test]
fn lowered_iterations_fail_unlock() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let kdf = PassphraseKdf::Pbkdf2Sha256 {
        iterations: PBKDF2_MIN_ITERATIONS + 1,
    };
    let file = lock_wallet(PASSPHRASE, &fresh_bundle()?, kdf)?;
    let json = edit_json(&file, |v| {
        v["encrypted"]["iterations"] = serde_json::json!(PBKDF2_MIN_ITERATIONS);
    })?;
    let edited = PassphraseKeyFile::from_json(&json)?;
    assert!(matches!(
        unlock_wallet(&edited, PASSPHRASE),
        Err(QsError::WrongPassphraseOrCorrupted)
    ));
    Ok(())
}

#[test]
fn replaced_signature_public_key_fails_unlock() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let file = lock_wallet(PASSPHRASE, &fresh_bundle()?, FLOOR_PBKDF2)?;
    let other = fresh_bundle()?;
    let json = edit_json(&file, |v| {
        v["signaturePublicKey"] =
            serde_json::Value::String(STANDARD.encode(other.signature().public_key()));
    })?;
    let swapped = PassphraseKeyFile::from_json(&json)?;
    assert!(matches!(
        unlock_wallet(&swapped, PASSPHRASE),
        Err(QsError::WrongPassphraseOrCorrupted)
    ));
    Ok(())
}

#[test]
fn future_version_rejected_before_decryption() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let file = lock_wallet(PASSPHRASE, &fresh_bundle()?, FLOOR_PBKDF2)?;
    let json = edit_json(&file, |v| {
        v["version"] = serde_json::json!(7);
    })?;
    assert!(matches!(
        PassphraseKeyFile::from_json(&json),
        Err(QsError::UnsupportedVersion { found: 7 })
    ));
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Relock
// ---------------------------------------------------------------------------

#[test]
fn relock_uses_fresh_salt_and_nonce() -> std::result::Result<(), QsError> {
    let bundle = fresh_bundle()?;
    let original = lock_wallet(PASSPHRASE, &bundle, FLOOR_PBKDF2)?;
    let relocked = relock_wallet(&original, PASSPHRASE, "new passphrase", None)?;

    assert_ne!(original.encrypted().salt(), relocked.encrypted().salt());
    assert_ne!(original.encrypted().nonce(), relocked.encrypted().nonce());
    assert_eq!(original.kem_public_key(), relocked.kem_public_key());

    assert!(matches!(
        unlock_wallet(&relocked, PASSPHRASE),
        Err(QsError::WrongPassphraseOrCorrupted)
    ));
    assert_same_keys(&bundle, &unlock_wallet(&relocked, "new passphrase")?);
    Ok(())
}

#[test]
fn relock_with_wrong_old_passphrase_fails() -> std::result::Result<(), QsError> {
    let file = lock_wallet(PASSPHRASE, &fresh_bundle()?, FLOOR_PBKDF2)?;
    let result = relock_wallet(&file, WRONG_PASSPHRASE, "new", None);
    assert!(matches!(result, Err(QsError::WrongPassphraseOrCorrupted)));
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Address
// ---------------------------------------------------------------------------

#[test]
fn address_available_while_locked() -> std::result::Result<(), QsError> {
    let bundle = fresh_bundle()?;
    let file = lock_wallet(PASSPHRASE, &bundle, FLOOR_PBKDF2)?;
    assert_eq!(file.address()?, to_address(bundle.signature().public_key())?);
    Ok(())
}

// ---------------------------------------------------------------------------
// 5. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn parallel_unlocks_agree() -> std::result::Result<(), QsError> {
    let bundle = fresh_bundle()?;
    let file = lock_wallet(PASSPHRASE, &bundle, FLOOR_PBKDF2)?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let f = file.clone();
            std::thread::spawn(move || unlock_wallet(&f, PASSPHRASE))
        })
        .collect();

    for handle in handles {
        let restored = handle.join().map_err(|_| QsError::CryptoError {
            reason: "unlock thread panicked".into(),
        })??;
        assert_same_keys(&bundle, &restored);
    }
    Ok(())
}

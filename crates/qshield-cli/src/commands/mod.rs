//! Command handlers.
//!
//! Every handler returns `Result<(), String>`; `main` prints the error
//! and exits non-zero.

pub mod envelope;
pub mod keys;
pub mod wallet;

use std::path::PathBuf;

use clap::Args;
use qshield_crypto::{KeyBundle, PrimitiveProvider};
use qshield_wallet::{unlock_wallet, PassphraseKeyFile};

use crate::io;
use crate::plain;

/// Where a command finds the caller's own key bundle.
#[derive(Args)]
pub struct KeySource {
    /// Passphrase-locked key file.
    #[arg(long, conflicts_with = "keys", required_unless_present = "keys")]
    pub key_file: Option<PathBuf>,

    /// Plaintext key bundle JSON (from `keygen --plain` or `unlock`).
    #[arg(long)]
    pub keys: Option<PathBuf>,

    /// Key-file passphrase. Falls back to QSHIELD_PASSPHRASE, then a prompt.
    #[arg(long)]
    pub passphrase: Option<String>,
}

impl KeySource {
    /// Loads the bundle, unlocking the key file if one was given.
    pub fn load(&self) -> std::result::Result<KeyBundle, String> {
        match (&self.key_file, &self.keys) {
            (Some(path), _) => {
                let file = load_key_file(path)?;
                let passphrase = io::read_passphrase(
                    self.passphrase.as_deref(),
                    io::PASSPHRASE_ENV,
                    "Key file passphrase: ",
                )?;
                unlock_wallet(&file, &passphrase).map_err(|e| e.to_string())
            }
            (None, Some(path)) => {
                let json = zeroize::Zeroizing::new(io::read_text(path)?);
                plain::bundle_from_json(&json)
            }
            (None, None) => Err("no key source; use --key-file or --keys".into()),
        }
    }
}

/// Reads and parses a passphrase key file.
pub fn load_key_file(path: &std::path::Path) -> std::result::Result<PassphraseKeyFile, String> {
    let json = io::read_text(path)?;
    PassphraseKeyFile::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}

/// Builds the default primitive provider.
pub fn provider() -> std::result::Result<PrimitiveProvider, String> {
    PrimitiveProvider::pqclean().map_err(|e| e.to_string())
}

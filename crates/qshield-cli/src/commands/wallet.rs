//! Passphrase key-file commands.
//!
//! Key files hold both public keys in the clear and the private keys
//! under a passphrase-derived AEAD key. Files are replaced atomically.

use std::path::PathBuf;

use clap::Args;
use qshield_crypto::kdf::PassphraseKdf;
use qshield_wallet::{lock_wallet, relock_wallet, unlock_wallet};

use super::load_key_file;
use crate::{io, output, plain, GlobalOpts};

// ---------------------------------------------------------------------------
// lock
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct LockArgs {
    /// Plaintext key bundle JSON to lock (`-` for stdin).
    #[arg(long)]
    pub keys: PathBuf,

    /// Key file to write. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// New passphrase. Falls back to QSHIELD_PASSPHRASE, then a prompt.
    #[arg(long)]
    pub passphrase: Option<String>,
}

pub fn lock(args: LockArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let json = zeroize::Zeroizing::new(io::read_text(&args.keys)?);
    let bundle = plain::bundle_from_json(&json)?;
    let kdf = PassphraseKdf::from_config(&opts.config).map_err(|e| e.to_string())?;
    let passphrase = io::read_passphrase(
        args.passphrase.as_deref(),
        io::PASSPHRASE_ENV,
        "New key file passphrase: ",
    )?;

    let file = lock_wallet(&passphrase, &bundle, kdf).map_err(|e| e.to_string())?;
    let out = file.to_json().map_err(|e| e.to_string())?;
    io::write_output(args.out.as_deref(), out.as_bytes())?;

    if let Some(path) = &args.out {
        output::print_success(&format!("key file written to {}", path.display()), opts.json);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// unlock
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct UnlockArgs {
    /// Key file to unlock.
    #[arg(long)]
    pub key_file: PathBuf,

    /// Plaintext bundle output file. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Passphrase. Falls back to QSHIELD_PASSPHRASE, then a prompt.
    #[arg(long)]
    pub passphrase: Option<String>,
}

pub fn unlock(args: UnlockArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let file = load_key_file(&args.key_file)?;
    let passphrase = io::read_passphrase(
        args.passphrase.as_deref(),
        io::PASSPHRASE_ENV,
        "Key file passphrase: ",
    )?;

    let bundle = unlock_wallet(&file, &passphrase).map_err(|e| e.to_string())?;
    let json = plain::bundle_to_json(&bundle)?;
    io::write_output(args.out.as_deref(), json.as_bytes())?;

    if let Some(path) = &args.out {
        output::print_success(&format!("plaintext key bundle written to {}", path.display()), opts.json);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// relock
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RelockArgs {
    /// Key file to re-encrypt.
    #[arg(long)]
    pub key_file: PathBuf,

    /// Output file. Defaults to replacing the key file in place.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Current passphrase. Falls back to QSHIELD_PASSPHRASE, then a prompt.
    #[arg(long)]
    pub passphrase: Option<String>,

    /// New passphrase. Falls back to QSHIELD_NEW_PASSPHRASE, then a prompt.
    #[arg(long)]
    pub new_passphrase: Option<String>,

    /// Re-derive with the configured KDF profile instead of the file's.
    #[arg(long)]
    pub upgrade_kdf: bool,
}

pub fn relock(args: RelockArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let file = load_key_file(&args.key_file)?;
    let old = io::read_passphrase(
        args.passphrase.as_deref(),
        io::PASSPHRASE_ENV,
        "Current passphrase: ",
    )?;
    let new = io::read_passphrase(
        args.new_passphrase.as_deref(),
        io::NEW_PASSPHRASE_ENV,
        "New passphrase: ",
    )?;

    let kdf = if args.upgrade_kdf {
        Some(PassphraseKdf::from_config(&opts.config).map_err(|e| e.to_string())?)
    } else {
        None
    };

    let relocked = relock_wallet(&file, &old, &new, kdf).map_err(|e| e.to_string())?;
    let json = relocked.to_json().map_err(|e| e.to_string())?;
    let target = args.out.unwrap_or(args.key_file);
    io::write_atomic(&target, json.as_bytes())?;

    output::print_success(&format!("key file re-encrypted to {}", target.display()), opts.json);
    Ok(())
}

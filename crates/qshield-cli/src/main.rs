//! qshield command-line tool.
//!
//! Exposes key generation, envelope seal/open, signatures, key-file
//! lock/unlock/relock and address derivation. Data goes to stdout (or
//! `--out`); logs and errors go to stderr.

mod commands;
mod config;
mod io;
mod output;
mod plain;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qshield_types::config::AppConfig;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Post-quantum envelopes, signatures and passphrase-locked key files.
#[derive(Parser)]
#[command(name = "qshield", version, about)]
struct Cli {
    /// Output status messages as JSON (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// JSON config file with KDF settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a KEM + signature key bundle.
    Keygen(commands::keys::KeygenArgs),
    /// Seal a message to a recipient's KEM public key.
    Seal(commands::envelope::SealArgs),
    /// Open an envelope with your KEM private key.
    Open(commands::envelope::OpenArgs),
    /// Sign a message with your signature private key.
    Sign(commands::keys::SignArgs),
    /// Verify a detached signature.
    Verify(commands::keys::VerifyArgs),
    /// Lock a plaintext key bundle into a passphrase key file.
    Lock(commands::wallet::LockArgs),
    /// Unlock a passphrase key file into a plaintext key bundle.
    Unlock(commands::wallet::UnlockArgs),
    /// Change the passphrase of a key file.
    Relock(commands::wallet::RelockArgs),
    /// Show the address of a signature public key.
    Address(commands::keys::AddressArgs),
}

// ---------------------------------------------------------------------------
// Global options passed to every command handler
// ---------------------------------------------------------------------------

/// Shared options threaded into command handlers.
pub struct GlobalOpts {
    pub json: bool,
    pub config: AppConfig,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = config::load(cli.config.as_deref()).and_then(|config| {
        let opts = GlobalOpts {
            json: cli.json,
            config,
        };
        dispatch(&opts, cli.command)
    });

    if let Err(e) = result {
        output::print_error(&e, cli.json);
        std::process::exit(1);
    }
}

fn dispatch(opts: &GlobalOpts, cmd: Commands) -> std::result::Result<(), String> {
    match cmd {
        Commands::Keygen(args) => commands::keys::keygen(args, opts),
        Commands::Seal(args) => commands::envelope::seal(args, opts),
        Commands::Open(args) => commands::envelope::open(args, opts),
        Commands::Sign(args) => commands::keys::sign(args, opts),
        Commands::Verify(args) => commands::keys::verify(args, opts),
        Commands::Lock(args) => commands::wallet::lock(args, opts),
        Commands::Unlock(args) => commands::wallet::unlock(args, opts),
        Commands::Relock(args) => commands::wallet::relock(args, opts),
        Commands::Address(args) => commands::keys::address(args, opts),
    }
}

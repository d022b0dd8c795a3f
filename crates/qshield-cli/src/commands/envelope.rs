//! Envelope seal / open.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::Args;
use qshield_envelope::{Envelope, HybridEnvelopeCodec};

use super::{load_key_file, provider, KeySource};
use crate::{io, output, plain, GlobalOpts};

// ---------------------------------------------------------------------------
// seal
// ---------------------------------------------------------------------------

#[derive(Args)]
#[group(id = "recipient_source", required = true, multiple = false)]
pub struct Recipient {
    /// Recipient's base64 ML-KEM-768 public key.
    #[arg(long)]
    pub to: Option<String>,

    /// Recipient's key file; only its cleartext public part is read.
    #[arg(long)]
    pub to_key_file: Option<PathBuf>,

    /// Recipient's plaintext key bundle JSON.
    #[arg(long)]
    pub to_keys: Option<PathBuf>,
}

impl Recipient {
    fn kem_public_key(&self) -> std::result::Result<Vec<u8>, String> {
        if let Some(b64) = &self.to {
            return STANDARD
                .decode(b64.trim())
                .map_err(|_| "--to is not valid base64".to_string());
        }
        if let Some(path) = &self.to_key_file {
            return Ok(load_key_file(path)?.kem_public_key().to_vec());
        }
        if let Some(path) = &self.to_keys {
            let json = zeroize::Zeroizing::new(io::read_text(path)?);
            return Ok(plain::bundle_from_json(&json)?.kem().public_key().to_vec());
        }
        Err("no recipient given".into())
    }
}

#[derive(Args)]
pub struct SealArgs {
    #[command(flatten)]
    pub recipient: Recipient,

    /// Message text to seal.
    #[arg(long)]
    pub message: Option<String>,

    /// File holding the message (`-` for stdin).
    #[arg(long = "in")]
    pub input: Option<PathBuf>,

    /// Envelope output file. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn seal(args: SealArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let message = io::message_bytes(args.message.as_deref(), args.input.as_deref())?;
    let recipient = args.recipient.kem_public_key()?;

    let codec = HybridEnvelopeCodec::new(provider()?);
    let envelope = codec.seal(&message, &recipient).map_err(|e| e.to_string())?;
    let mut json = envelope.to_json().map_err(|e| e.to_string())?;
    json.push('\n');

    io::write_output(args.out.as_deref(), json.as_bytes())?;
    if let Some(path) = &args.out {
        output::print_success(&format!("envelope written to {}", path.display()), opts.json);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// open
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct OpenArgs {
    #[command(flatten)]
    pub source: KeySource,

    /// Envelope JSON file (`-` for stdin).
    #[arg(long)]
    pub envelope: PathBuf,

    /// Plaintext output file. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Writes the recovered bytes only once the envelope authenticates.
pub fn open(args: OpenArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let json = io::read_text(&args.envelope)?;
    let envelope = Envelope::from_json(json.trim()).map_err(|e| e.to_string())?;
    let bundle = args.source.load()?;

    let codec = HybridEnvelopeCodec::new(provider()?);
    let message = zeroize::Zeroizing::new(
        codec
            .open(&envelope, bundle.kem().private_key())
            .map_err(|e| e.to_string())?,
    );

    io::write_output(args.out.as_deref(), &message)?;
    if let Some(path) = &args.out {
        output::print_success(&format!("message written to {}", path.display()), opts.json);
    }
    Ok(())
}

//! Key generation, signatures and addresses.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::Args;
use qshield_crypto::kdf::PassphraseKdf;
use qshield_crypto::stub::{generate_or_stub, KeygenOutcome};
use qshield_crypto::{to_address, Address, PrimitiveProvider};
use qshield_wallet::lock_wallet;

use super::{load_key_file, provider, KeySource};
use crate::{io, output, plain, GlobalOpts};

// ---------------------------------------------------------------------------
// keygen
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct KeygenArgs {
    /// Output file. Defaults to stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Emit a plaintext key bundle instead of a passphrase key file.
    #[arg(long)]
    pub plain: bool,

    /// Emit clearly marked stub material if no primitive backend can be
    /// initialized. Stub output is not usable for cryptography.
    #[arg(long, requires = "plain")]
    pub allow_stub: bool,

    /// Passphrase for the new key file. Falls back to
    /// QSHIELD_PASSPHRASE, then a prompt.
    #[arg(long, conflicts_with = "plain")]
    pub passphrase: Option<String>,
}

pub fn keygen(args: KeygenArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let provider = PrimitiveProvider::pqclean();
    let outcome = generate_or_stub(provider.as_ref(), args.allow_stub).map_err(|e| e.to_string())?;

    let bundle = match outcome {
        KeygenOutcome::Stub(stub) => {
            output::print_warning(
                "no primitive backend available; writing STUB key material that cannot be used",
                opts.json,
            );
            let json = plain::stub_to_json(&stub)?;
            return io::write_output(args.out.as_deref(), json.as_bytes());
        }
        KeygenOutcome::Genuine(bundle) => bundle,
    };

    let address = to_address(bundle.signature().public_key()).map_err(|e| e.to_string())?;

    if args.plain {
        let json = plain::bundle_to_json(&bundle)?;
        io::write_output(args.out.as_deref(), json.as_bytes())?;
    } else {
        let kdf = PassphraseKdf::from_config(&opts.config).map_err(|e| e.to_string())?;
        let passphrase = io::read_passphrase(
            args.passphrase.as_deref(),
            io::PASSPHRASE_ENV,
            "New key file passphrase: ",
        )?;
        let file = lock_wallet(&passphrase, &bundle, kdf).map_err(|e| e.to_string())?;
        let json = file.to_json().map_err(|e| e.to_string())?;
        io::write_output(args.out.as_deref(), json.as_bytes())?;
    }

    if let Some(path) = &args.out {
        output::print_success(&format!("key bundle written to {}", path.display()), opts.json);
        output::print_kv("address", address.as_str(), opts.json);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// sign / verify
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SignArgs {
    #[command(flatten)]
    pub source: KeySource,

    /// Message text to sign.
    #[arg(long)]
    pub message: Option<String>,

    /// File holding the message (`-` for stdin).
    #[arg(long = "in")]
    pub input: Option<PathBuf>,
}

pub fn sign(args: SignArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let message = io::message_bytes(args.message.as_deref(), args.input.as_deref())?;
    let bundle = args.source.load()?;
    let signature = provider()?
        .sign(bundle.signature().private_key(), &message)
        .map_err(|e| e.to_string())?;
    output::print_kv("signature", &STANDARD.encode(signature), opts.json);
    Ok(())
}

/// Where to find a signature public key. Needs no passphrase.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct PublicKeySource {
    /// Base64 signature public key.
    #[arg(long)]
    pub public_key: Option<String>,

    /// Key file; only its cleartext public part is read.
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Plaintext key bundle JSON.
    #[arg(long)]
    pub keys: Option<PathBuf>,
}

impl PublicKeySource {
    fn load(&self) -> std::result::Result<Vec<u8>, String> {
        if let Some(b64) = &self.public_key {
            return STANDARD
                .decode(b64.trim())
                .map_err(|_| "--public-key is not valid base64".to_string());
        }
        if let Some(path) = &self.key_file {
            return Ok(load_key_file(path)?.signature_public_key().to_vec());
        }
        if let Some(path) = &self.keys {
            let json = zeroize::Zeroizing::new(io::read_text(path)?);
            return Ok(plain::bundle_from_json(&json)?.signature().public_key().to_vec());
        }
        Err("no public key given".into())
    }
}

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub signer: PublicKeySource,

    /// Base64 detached signature.
    #[arg(long)]
    pub signature: String,

    /// Message text that was signed.
    #[arg(long)]
    pub message: Option<String>,

    /// File holding the message (`-` for stdin).
    #[arg(long = "in")]
    pub input: Option<PathBuf>,
}

/// Exits non-zero when the signature does not verify.
pub fn verify(args: VerifyArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let message = io::message_bytes(args.message.as_deref(), args.input.as_deref())?;
    let public_key = args.signer.load()?;
    let signature = STANDARD
        .decode(args.signature.trim())
        .map_err(|_| "--signature is not valid base64".to_string())?;

    let valid = provider()?
        .verify(&public_key, &message, &signature)
        .map_err(|e| e.to_string())?;

    if !valid {
        return Err("signature verification failed".into());
    }
    output::print_success("signature valid", opts.json);
    Ok(())
}

// ---------------------------------------------------------------------------
// address
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddressArgs {
    #[command(flatten)]
    pub signer: AddressSource,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct AddressSource {
    /// Base64 signature public key.
    #[arg(long)]
    pub public_key: Option<String>,

    /// Key file; only its cleartext public part is read.
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Plaintext key bundle JSON.
    #[arg(long)]
    pub keys: Option<PathBuf>,

    /// Check an existing address string instead of deriving one.
    #[arg(long)]
    pub check: Option<String>,
}

pub fn address(args: AddressArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let src = args.signer;

    if let Some(candidate) = &src.check {
        let parsed = Address::from_bech32(candidate.trim()).map_err(|e| e.to_string())?;
        output::print_kv("address", parsed.as_str(), opts.json);
        return Ok(());
    }

    let public_key = PublicKeySource {
        public_key: src.public_key,
        key_file: src.key_file,
        keys: src.keys,
    }
    .load()?;
    let address = to_address(&public_key).map_err(|e| e.to_string())?;
    output::print_kv("address", address.as_str(), opts.json);
    Ok(())
}

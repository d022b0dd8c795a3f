//! Plaintext key bundle JSON, as printed by `keygen --plain` and
//! `unlock`.
//!
//! ```json
//! {
//!   "stub": false,
//!   "address": "qs1...",
//!   "kem":       { "scheme": "ML-KEM-768", "publicKey": "<b64>", "privateKey": "<b64>" },
//!   "signature": { "scheme": "ML-DSA-65",  "publicKey": "<b64>", "privateKey": "<b64>" }
//! }
//! ```
//!
//! Stub output carries `"stub": true` and labels such as
//! `ML-KEM-768 (stub)`, so it never loads back as a usable bundle.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use qshield_crypto::stub::{StubKeyMaterial, StubKeyPair};
use qshield_crypto::{to_address, KeyBundle, KeyPair};
use qshield_types::KeyScheme;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PlainKeyPair {
    scheme: String,
    public_key: String,
    private_key: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PlainBundle {
    #[serde(default)]
    stub: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    kem: PlainKeyPair,
    signature: PlainKeyPair,
}

impl PlainKeyPair {
    fn from_keypair(pair: &KeyPair) -> Self {
        Self {
            scheme: pair.scheme().id().to_string(),
            public_key: STANDARD.encode(pair.public_key()),
            private_key: STANDARD.encode(pair.private_key()),
        }
    }

    fn from_stub(pair: &StubKeyPair) -> Self {
        Self {
            scheme: pair.label(),
            public_key: STANDARD.encode(pair.public_bytes()),
            private_key: STANDARD.encode(pair.private_bytes()),
        }
    }

    fn to_keypair(&self, field: &str) -> std::result::Result<KeyPair, String> {
        let scheme: KeyScheme = self
            .scheme
            .parse()
            .map_err(|e| format!("{field}: {e}"))?;
        let public_key = STANDARD
            .decode(&self.public_key)
            .map_err(|_| format!("{field}.publicKey is not valid base64"))?;
        let mut private_key = Zeroizing::new(
            STANDARD
                .decode(&self.private_key)
                .map_err(|_| format!("{field}.privateKey is not valid base64"))?,
        );
        KeyPair::from_parts(scheme, public_key, std::mem::take(&mut *private_key))
            .map_err(|e| format!("{field}: {e}"))
    }
}

/// Serializes a genuine bundle, including its address.
pub fn bundle_to_json(bundle: &KeyBundle) -> std::result::Result<Zeroizing<String>, String> {
    let address = to_address(bundle.signature().public_key()).map_err(|e| e.to_string())?;
    let plain = PlainBundle {
        stub: false,
        address: Some(address.to_string()),
        kem: PlainKeyPair::from_keypair(bundle.kem()),
        signature: PlainKeyPair::from_keypair(bundle.signature()),
    };
    serde_json::to_string_pretty(&plain)
        .map(Zeroizing::new)
        .map_err(|e| format!("failed to serialize key bundle: {e}"))
}

/// Serializes stub material. No address is derived for it.
pub fn stub_to_json(stub: &StubKeyMaterial) -> std::result::Result<String, String> {
    let plain = PlainBundle {
        stub: StubKeyMaterial::IS_STUB,
        address: None,
        kem: PlainKeyPair::from_stub(stub.kem()),
        signature: PlainKeyPair::from_stub(stub.signature()),
    };
    serde_json::to_string_pretty(&plain).map_err(|e| format!("failed to serialize stub material: {e}"))
}

/// Parses a plaintext bundle, refusing stub material.
pub fn bundle_from_json(json: &str) -> std::result::Result<KeyBundle, String> {
    let plain: PlainBundle =
        serde_json::from_str(json).map_err(|e| format!("invalid key bundle JSON: {e}"))?;
    if plain.stub {
        return Err("key bundle is stub material and cannot be used".into());
    }
    let kem = plain.kem.to_keypair("kem")?;
    let signature = plain.signature.to_keypair("signature")?;
    KeyBundle::new(kem, signature).map_err(|e| e.to_string())
}

//! Plaintext layout of the private key bundle sealed inside a key file.
//!
//! ```json
//! {
//!   "kem":       { "scheme": "ML-KEM-768", "privateKey": "<base64>" },
//!   "signature": { "scheme": "ML-DSA-65",  "privateKey": "<base64>" }
//! }
//! ```
//!
//! Public keys are not repeated here; they come from the cleartext part
//! of the key file, which the AEAD binds to this plaintext.
//!
//! Decode errors never echo the input, since it is secret.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use qshield_crypto::{KeyBundle, KeyPair};
use qshield_types::{KeyScheme, QsError, Result};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PrivateKeyWire {
    scheme: String,
    private_key: String,
}

impl PrivateKeyWire {
    fn from_pair(pair: &KeyPair) -> Self {
        Self {
            scheme: pair.scheme().id().to_owned(),
            private_key: STANDARD.encode(pair.private_key()),
        }
    }

    fn to_pair(&self, expected: KeyScheme, public_key: &[u8]) -> Result<KeyPair> {
        let scheme: KeyScheme = self.scheme.parse()?;
        if scheme != expected {
            return Err(QsError::MalformedKeyFile {
                reason: format!("expected {expected} private key, found {scheme}"),
            });
        }
        let private_key = STANDARD
            .decode(&self.private_key)
            .map_err(|_| QsError::MalformedKeyFile {
                reason: format!("{scheme} private key is not valid base64"),
            })?;
        KeyPair::from_parts(scheme, public_key.to_vec(), private_key)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PrivateBundleWire {
    kem: PrivateKeyWire,
    signature: PrivateKeyWire,
}

/// Serializes both private keys of `bundle`.
pub(crate) fn encode_private_bundle(bundle: &KeyBundle) -> Result<Zeroizing<Vec<u8>>> {
    let wire = PrivateBundleWire {
        kem: PrivateKeyWire::from_pair(bundle.kem()),
        signature: PrivateKeyWire::from_pair(bundle.signature()),
    };
    serde_json::to_vec(&wire)
        .map(Zeroizing::new)
        .map_err(|e| QsError::CryptoError {
            reason: format!("failed to serialize private bundle: {e}"),
        })
}

/// Rebuilds a [`KeyBundle`] from decrypted plaintext and the cleartext
/// public keys.
pub(crate) fn decode_private_bundle(
    plaintext: &[u8],
    kem_public_key: &[u8],
    signature_public_key: &[u8],
) -> Result<KeyBundle> {
    let wire: PrivateBundleWire =
        serde_json::from_slice(plaintext).map_err(|_| QsError::MalformedKeyFile {
            reason: "private bundle does not match the expected layout".into(),
        })?;
    let kem = wire.kem.to_pair(KeyScheme::MlKem768, kem_public_key)?;
    let signature = wire.signature.to_pair(KeyScheme::MlDsa65, signature_public_key)?;
    KeyBundle::new(kem, signature)
}

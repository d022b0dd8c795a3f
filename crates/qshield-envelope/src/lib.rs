//! Hybrid post-quantum envelope for qshield.
//!
//! Composes ML-KEM-768, HKDF-SHA256 and AES-256-GCM from
//! `qshield-crypto` into a single seal/open pair and defines the JSON
//! layout of the resulting [`Envelope`].
//!
//! # Modules
//!
//! - [`envelope`]: envelope fields and JSON wire layout
//! - [`codec`]: `seal` / `open`

pub mod codec;
pub mod envelope;

pub use codec::HybridEnvelopeCodec;
pub use envelope::{Envelope, ENVELOPE_SCHEME_ID};

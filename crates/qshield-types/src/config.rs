//! Application configuration with sensible defaults.
//!
//! Holds the passphrase key-derivation parameters used when locking key
//! files. Every value has a documented default and a cost floor that
//! [`AppConfig::validate`] enforces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{QsError, Result};

/// Minimum PBKDF2-HMAC-SHA256 iteration count accepted anywhere.
pub const PBKDF2_MIN_ITERATIONS: u32 = 200_000;

/// Default PBKDF2-HMAC-SHA256 iteration count.
pub const PBKDF2_DEFAULT_ITERATIONS: u32 = 250_000;

/// Minimum Argon2id memory cost in KiB (19 MiB).
pub const ARGON2_MIN_M_COST_KIB: u32 = 19_456;

/// Minimum Argon2id time cost (passes).
pub const ARGON2_MIN_T_COST: u32 = 2;

// ---------------------------------------------------------------------------
// KdfAlgorithm
// ---------------------------------------------------------------------------

/// Slow key-derivation function used for passphrases.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum KdfAlgorithm {
    /// PBKDF2 with HMAC-SHA256 (iteration-hard). Canonical default.
    #[serde(rename = "pbkdf2-sha256")]
    Pbkdf2Sha256,
    /// Argon2id v1.3 (memory-hard).
    #[serde(rename = "argon2id")]
    Argon2id,
}

impl KdfAlgorithm {
    /// Identifier written into the key file `kdf` field.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Pbkdf2Sha256 => "pbkdf2-sha256",
            Self::Argon2id => "argon2id",
        }
    }
}

impl fmt::Display for KdfAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for KdfAlgorithm {
    type Err = QsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pbkdf2-sha256" => Ok(Self::Pbkdf2Sha256),
            "argon2id" => Ok(Self::Argon2id),
            other => Err(QsError::ConfigError {
                reason: format!("unknown kdf '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Global application configuration.
///
/// Loaded from a JSON file by the CLI, or taken from [`Default`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// KDF used when locking new key files.
    pub kdf_algorithm: KdfAlgorithm,

    /// PBKDF2-HMAC-SHA256 iterations. Must be ≥ 200 000.
    pub pbkdf2_iterations: u32,

    /// Argon2id memory cost in KiB. Must be ≥ 19 456.
    pub argon2_m_cost_kib: u32,

    /// Argon2id time cost. Must be ≥ 2.
    pub argon2_t_cost: u32,

    /// Argon2id parallelism. Must be ≥ 1.
    pub argon2_p_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            kdf_algorithm: KdfAlgorithm::Pbkdf2Sha256,
            pbkdf2_iterations: PBKDF2_DEFAULT_ITERATIONS,
            argon2_m_cost_kib: 65_536, // 64 MiB
            argon2_t_cost: 3,
            argon2_p_cost: 1,
        }
    }
}

impl AppConfig {
    /// Validates all configuration values.
    ///
    /// Both KDF profiles are checked, not only the selected one, so a
    /// config file cannot carry a weak fallback.
    pub fn validate(&self) -> Result<()> {
        if self.pbkdf2_iterations < PBKDF2_MIN_ITERATIONS {
            return Err(QsError::ConfigError {
                reason: format!(
                    "pbkdf2_iterations must be at least {PBKDF2_MIN_ITERATIONS}, got {}",
                    self.pbkdf2_iterations
                ),
            });
        }

        if self.argon2_m_cost_kib < ARGON2_MIN_M_COST_KIB {
            return Err(QsError::ConfigError {
                reason: format!(
                    "argon2_m_cost_kib must be at least {ARGON2_MIN_M_COST_KIB}, got {}",
                    self.argon2_m_cost_kib
                ),
            });
        }

        if self.argon2_t_cost < ARGON2_MIN_T_COST {
            return Err(QsError::ConfigError {
                reason: format!(
                    "argon2_t_cost must be at least {ARGON2_MIN_T_COST}, got {}",
                    self.argon2_t_cost
                ),
            });
        }

        if self.argon2_p_cost == 0 {
            return Err(QsError::ConfigError {
                reason: "argon2_p_cost must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

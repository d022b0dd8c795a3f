//! Slow passphrase stretching.
//!
//! Turns a human passphrase and a random salt into 32 bytes of input
//! keying material. Two profiles are supported: PBKDF2-HMAC-SHA256
//! (iteration-hard, the default) and Argon2id (memory-hard). Both have
//! a cost floor, and parameters below it are rejected before any work
//! is done.
//!
//! The stretched output is never used as a cipher key directly; see
//! [`crate::derive`] for the domain-separated expansion step.

use hmac::Hmac;
use qshield_types::config::{
    AppConfig, KdfAlgorithm, ARGON2_MIN_M_COST_KIB, ARGON2_MIN_T_COST, PBKDF2_DEFAULT_ITERATIONS,
    PBKDF2_MIN_ITERATIONS,
};
use qshield_types::{QsError, Result};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Byte length of the stretched passphrase.
pub const STRETCHED_LEN: usize = 32;

/// Minimum salt length accepted for passphrase stretching.
pub const MIN_SALT_LEN: usize = 16;

// ---------------------------------------------------------------------------
// PassphraseKdf
// ---------------------------------------------------------------------------

/// Slow KDF profile together with its cost parameters.
///
/// # Defaults
///
/// | Profile         | Parameter    | Default | Floor  |
/// |-----------------|--------------|---------|--------|
/// | `Pbkdf2Sha256`  | `iterations` | 250 000 | 200 000 |
/// | `Argon2id`      | `m_cost_kib` | 65 536  | 19 456 |
/// | `Argon2id`      | `t_cost`     | 3       | 2      |
/// | `Argon2id`      | `p_cost`     | 1       | 1      |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PassphraseKdf {
    /// PBKDF2-HMAC-SHA256.
    Pbkdf2Sha256 {
        /// Iteration count.
        iterations: u32,
    },
    /// Argon2id v1.3.
    Argon2id {
        /// Memory cost in KiB.
        m_cost_kib: u32,
        /// Number of passes.
        t_cost: u32,
        /// Degree of parallelism.
        p_cost: u32,
    },
}

impl Default for PassphraseKdf {
    fn default() -> Self {
        Self::Pbkdf2Sha256 {
            iterations: PBKDF2_DEFAULT_ITERATIONS,
        }
    }
}

impl PassphraseKdf {
    /// Selects the profile named by `config.kdf_algorithm` with the
    /// configured costs.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let kdf = match config.kdf_algorithm {
            KdfAlgorithm::Pbkdf2Sha256 => Self::Pbkdf2Sha256 {
                iterations: config.pbkdf2_iterations,
            },
            KdfAlgorithm::Argon2id => Self::Argon2id {
                m_cost_kib: config.argon2_m_cost_kib,
                t_cost: config.argon2_t_cost,
                p_cost: config.argon2_p_cost,
            },
        };
        Ok(kdf)
    }

    /// Algorithm identifier of this profile.
    pub fn algorithm(&self) -> KdfAlgorithm {
        match self {
            Self::Pbkdf2Sha256 { .. } => KdfAlgorithm::Pbkdf2Sha256,
            Self::Argon2id { .. } => KdfAlgorithm::Argon2id,
        }
    }

    /// The iteration (PBKDF2) or pass (Argon2id) count.
    pub fn iterations(&self) -> u32 {
        match self {
            Self::Pbkdf2Sha256 { iterations } => *iterations,
            Self::Argon2id { t_cost, .. } => *t_cost,
        }
    }

    /// Rejects parameters below the cost floor.
    ///
    /// # Errors
    ///
    /// [`QsError::ConfigError`] naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Pbkdf2Sha256 { iterations } => {
                if iterations < PBKDF2_MIN_ITERATIONS {
                    return Err(QsError::ConfigError {
                        reason: format!(
                            "pbkdf2 iterations must be at least {PBKDF2_MIN_ITERATIONS}, got {iterations}"
                        ),
                    });
                }
            }
            Self::Argon2id {
                m_cost_kib,
                t_cost,
                p_cost,
            } => {
                if m_cost_kib < ARGON2_MIN_M_COST_KIB {
                    return Err(QsError::ConfigError {
                        reason: format!(
                            "argon2 memory must be at least {ARGON2_MIN_M_COST_KIB} KiB, got {m_cost_kib}"
                        ),
                    });
                }
                if t_cost < ARGON2_MIN_T_COST {
                    return Err(QsError::ConfigError {
                        reason: format!("argon2 passes must be at least {ARGON2_MIN_T_COST}, got {t_cost}"),
                    });
                }
                if p_cost == 0 {
                    return Err(QsError::ConfigError {
                        reason: "argon2 parallelism must be greater than 0".into(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Stretches `passphrase` with `salt`.
    ///
    /// # Errors
    ///
    /// - [`QsError::ConfigError`] if the profile is below its floor or
    ///   `salt` is shorter than [`MIN_SALT_LEN`].
    /// - [`QsError::CryptoError`] if the underlying KDF fails.
    pub fn stretch(&self, passphrase: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; STRETCHED_LEN]>> {
        self.validate()?;
        if salt.len() < MIN_SALT_LEN {
            return Err(QsError::ConfigError {
                reason: format!(
                    "salt must be at least {MIN_SALT_LEN} bytes, got {}",
                    salt.len()
                ),
            });
        }

        let mut output = Zeroizing::new([0u8; STRETCHED_LEN]);
        match *self {
            Self::Pbkdf2Sha256 { iterations } => {
                pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase, salt, iterations, output.as_mut())
                    .map_err(|e| QsError::CryptoError {
                        reason: format!("pbkdf2 failed: {e}"),
                    })?;
            }
            Self::Argon2id {
                m_cost_kib,
                t_cost,
                p_cost,
            } => {
                let params = argon2::Params::new(m_cost_kib, t_cost, p_cost, Some(STRETCHED_LEN))
                    .map_err(|e| QsError::ConfigError {
                        reason: format!("invalid Argon2 parameters: {e}"),
                    })?;
                let argon2 =
                    argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
                argon2
                    .hash_password_into(passphrase, salt, output.as_mut())
                    .map_err(|e| QsError::CryptoError {
                        reason: format!("argon2id failed: {e}"),
                    })?;
            }
        }
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR_PBKDF2: PassphraseKdf = PassphraseKdf::Pbkdf2Sha256 {
        iterations: PBKDF2_MIN_ITERATIONS,
    };

    const FLOOR_ARGON2: PassphraseKdf = PassphraseKdf::Argon2id {
        m_cost_kib: ARGON2_MIN_M_COST_KIB,
        t_cost: ARGON2_MIN_T_COST,
        p_cost: 1,
    };

    #[test]
    fn default_profile_is_pbkdf2() {
        let kdf = PassphraseKdf::default();
        assert_eq!(kdf.algorithm(), KdfAlgorithm::Pbkdf2Sha256);
        assert_eq!(kdf.iterations(), 250_000);
        assert!(kdf.validate().is_ok());
    }

    #[test]
    fn pbkdf2_deterministic() -> std::result::Result<(), QsError> {
        let salt = [7u8; 16];
        let a = FLOOR_PBKDF2.stretch(b"correct horse", &salt)?;
        let b = FLOOR_PBKDF2.stretch(b"correct horse", &salt)?;
        assert_eq!(*a, *b);
        Ok(())
    }

    #[test]
    fn pbkdf2_salt_changes_output() -> std::result::Result<(), QsError> {
        let a = FLOOR_PBKDF2.stretch(b"pw", &[1u8; 16])?;
        let b = FLOOR_PBKDF2.stretch(b"pw", &[2u8; 16])?;
        assert_ne!(*a, *b);
        Ok(())
    }

    #[test]
    fn argon2id_at_floor() -> std::result::Result<(), QsError> {
        let salt = [9u8; 16];
        let a = FLOOR_ARGON2.stretch(b"pw", &salt)?;
        let b = FLOOR_ARGON2.stretch(b"other", &salt)?;
        assert_ne!(*a, *b);
        Ok(())
    }

    #[test]
    fn below_floor_rejected_before_work() {
        let weak = PassphraseKdf::Pbkdf2Sha256 { iterations: 1_000 };
        assert!(matches!(
            weak.stretch(b"pw", &[0u8; 16]),
            Err(QsError::ConfigError { .. })
        ));

        let weak = PassphraseKdf::Argon2id {
            m_cost_kib: 8,
            t_cost: 1,
            p_cost: 1,
        };
        assert!(weak.validate().is_err());
    }

    #[test]
    fn short_salt_rejected() {
        let result = FLOOR_PBKDF2.stretch(b"pw", &[0u8; 15]);
        assert!(matches!(result, Err(QsError::ConfigError { .. })));
    }

    #[test]
    fn from_config_selects_profile() -> std::result::Result<(), QsError> {
        let config = AppConfig {
            kdf_algorithm: KdfAlgorithm::Argon2id,
            ..AppConfig::default()
        };
        let kdf = PassphraseKdf::from_config(&config)?;
        assert_eq!(
            kdf,
            PassphraseKdf::Argon2id {
                m_cost_kib: 65_536,
                t_cost: 3,
                p_cost: 1
            }
        );
        Ok(())
    }
}

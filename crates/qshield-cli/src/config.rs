//! Config file loading.
//!
//! The file is JSON with any subset of the [`AppConfig`] fields; missing
//! fields take their defaults. The merged result is validated before
//! use.
//!
//! ```json
//! { "kdf_algorithm": "argon2id", "argon2_m_cost_kib": 131072 }
//! ```

use std::path::Path;

use qshield_types::config::AppConfig;

/// Loads `path`, or the defaults when no path is given.
pub fn load(path: Option<&Path>) -> std::result::Result<AppConfig, String> {
    let config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read config file {}: {e}", path.display()))?;
            serde_json::from_str::<AppConfig>(&json)
                .map_err(|e| format!("failed to parse config file {}: {e}", path.display()))?
        }
        None => AppConfig::default(),
    };

    config.validate().map_err(|e| e.to_string())?;
    tracing::debug!(kdf = %config.kdf_algorithm, "configuration loaded");
    Ok(config)
}

//! TOML configuration for a ledger deployment.
//!
//! Every key is optional:
//!
//! ```toml
//! chain_file = "data/blockchain.json"
//! format = "json"          # or "json-lines"
//! validity_days = 90
//! log_filter = "warn"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use safetrail_contracts::error::{LedgerError, LedgerResult};

/// On-disk layout of the chain file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreFormat {
    /// One JSON array, rewritten in full on every append.
    Json,
    /// One block per line, appended in place.
    JsonLines,
}

/// Longest accepted validity window, roughly a century.
pub const MAX_VALIDITY_DAYS: u32 = 36_500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Path of the chain file.  Parent directories are created on open.
    pub chain_file: PathBuf,

    pub format: StoreFormat,

    /// Length of the validity window for new KYC registrations.
    pub validity_days: u32,

    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            chain_file: PathBuf::from("data/blockchain.json"),
            format: StoreFormat::Json,
            validity_days: 90,
            log_filter: "warn".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `LedgerError::Config` on malformed TOML, unknown keys or a
    /// validity window outside `1..=MAX_VALIDITY_DAYS`.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = toml::from_str(s).map_err(|e| LedgerError::Config {
            reason: format!("failed to parse ledger TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> LedgerResult<()> {
        if self.validity_days == 0 || self.validity_days > MAX_VALIDITY_DAYS {
            return Err(LedgerError::Config {
                reason: format!(
                    "validity_days must be between 1 and {}, got {}",
                    MAX_VALIDITY_DAYS, self.validity_days
                ),
            });
        }
        if self.chain_file.as_os_str().is_empty() {
            return Err(LedgerError::Config {
                reason: "chain_file must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

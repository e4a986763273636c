//! Generator configuration.
//!
//! Settings come from CLI flags, an optional YAML configuration file, or
//! both (flags override file values). Validation happens once, before any
//! output is written.

use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::balance::BalanceMode;

/// APNIC delegation file listing allocated IPv4 ranges
pub const DEFAULT_SOURCE_URL: &str =
    "http://ftp.apnic.net/apnic/stats/apnic/delegated-apnic-latest";

/// Complete settings for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Proxy servers in PAC syntax; more than one enables balancing
    pub proxies: Vec<String>,
    /// Proxy balancing policy
    pub balance: BalanceMode,
    /// Literal hosts or CIDR blocks that bypass the proxy entirely
    pub no_proxy: Vec<String>,
    /// Size of each level's bucket table
    pub hash_base: u32,
    /// Step size between configured prefix levels
    pub mask_step: u8,
    /// Coarsest prefix level in the lookup table
    pub min_prefix: u8,
    /// Finest prefix level in the lookup table
    pub max_prefix: u8,
    /// Delegation data URL
    pub source_url: String,
    /// Local delegation file used instead of fetching, when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<PathBuf>,
    /// Output PAC filename
    pub output: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            proxies: vec!["SOCKS 127.0.0.1:8964".to_string()],
            balance: BalanceMode::No,
            no_proxy: vec!["192.168.0.0/24".to_string()],
            hash_base: 3011,
            mask_step: 2,
            min_prefix: 10,
            max_prefix: 24,
            source_url: DEFAULT_SOURCE_URL.to_string(),
            source_file: None,
            output: PathBuf::from("pacforge.pac"),
        }
    }
}

/// Configuration range violations, all fatal before any output is written
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid prefix window: min_prefix {min} > max_prefix {max}")]
    PrefixWindow { min: u8, max: u8 },

    #[error("Prefix length {0} out of range (must be 0-32)")]
    PrefixOutOfRange(u8),

    #[error("hash_base must be positive")]
    ZeroHashBase,

    #[error("mask_step must be positive")]
    ZeroMaskStep,
}

impl GeneratorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for prefix in [self.min_prefix, self.max_prefix] {
            if prefix > 32 {
                return Err(ConfigError::PrefixOutOfRange(prefix));
            }
        }
        if self.min_prefix > self.max_prefix {
            return Err(ConfigError::PrefixWindow {
                min: self.min_prefix,
                max: self.max_prefix,
            });
        }
        if self.hash_base == 0 {
            return Err(ConfigError::ZeroHashBase);
        }
        if self.mask_step == 0 {
            return Err(ConfigError::ZeroMaskStep);
        }
        Ok(())
    }
}

/// Load a configuration from a YAML file. Missing keys fall back to their
/// defaults.
pub fn load_config(path: &Path) -> Result<GeneratorConfig> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config file '{}'", path.display()))?;
    let config: GeneratorConfig = serde_yaml::from_str(&content)
        .wrap_err_with(|| format!("Failed to parse config file '{}'", path.display()))?;
    Ok(config)
}

//! Run configuration module.
//!
//! Handles loading and validating `snapstash.toml`. Lookup order:
//! an explicit `--config` path, else `snapstash.toml` in the working
//! directory, else stock defaults. CLI flags override loaded values
//! field by field (done by the binary, not here).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [fetch]
//! timeout_secs = 15         # Per-request timeout
//! max_retries = 3           # Extra attempts after the first
//! retry_delay_ms = 500      # Base delay; grows linearly per attempt
//!
//! [normalize]
//! convert_webp = "jpg"      # Re-encode WebP downloads ("" keeps them)
//! convert_heic = "jpg"      # Re-encode HEIC downloads ("" keeps them)
//! force_format = ""         # Re-encode everything ("" disables; wins
//!                           # over the convert_* rules)
//! ```
//!
//! Config files are sparse — override just the values you want.
//! Unknown keys are rejected to catch typos early.

use crate::fetch::FetchConfig;
use crate::normalize::{NormalizePolicy, TargetFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Config file name looked up in the working directory.
pub const CONFIG_FILENAME: &str = "snapstash.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Run configuration loaded from `snapstash.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StashConfig {
    /// Download behavior (timeout, retries).
    pub fetch: FetchSection,
    /// Image format conversion rules.
    pub normalize: NormalizeSection,
}

impl StashConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be at least 1".into(),
            ));
        }
        self.normalize.policy()?;
        Ok(())
    }
}

/// Download behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSection {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Extra attempts after the first request fails retryably.
    pub max_retries: u32,
    /// Base delay between attempts in milliseconds; the n-th retry
    /// waits n times this.
    pub retry_delay_ms: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

impl FetchSection {
    /// Convert to the downloader's runtime settings.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Image format conversion rules.
///
/// Each value is a target format name (`jpg`, `png`, `webp`) or the
/// empty string to leave that case untouched. `force_format`, when set,
/// wins over the per-format rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeSection {
    /// Target format for WebP downloads ("" keeps them as WebP).
    pub convert_webp: String,
    /// Target format for HEIC downloads ("" keeps them as HEIC).
    pub convert_heic: String,
    /// Target format for every download ("" disables).
    pub force_format: String,
}

impl Default for NormalizeSection {
    fn default() -> Self {
        Self {
            convert_webp: "jpg".to_string(),
            convert_heic: "jpg".to_string(),
            force_format: String::new(),
        }
    }
}

impl NormalizeSection {
    /// Resolve the conversion rules into a [`NormalizePolicy`].
    ///
    /// Fails with a [`ConfigError::Validation`] naming the offending
    /// field when a value is not a recognized target format.
    pub fn policy(&self) -> Result<NormalizePolicy, ConfigError> {
        let convert_webp = parse_target("normalize.convert_webp", &self.convert_webp)?;
        let convert_heic = parse_target("normalize.convert_heic", &self.convert_heic)?;
        let force = parse_target("normalize.force_format", &self.force_format)?;
        Ok(NormalizePolicy::from_rules(convert_webp, convert_heic, force))
    }
}

fn parse_target(field: &str, value: &str) -> Result<Option<TargetFormat>, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match TargetFormat::parse(value) {
        Some(target) => Ok(Some(target)),
        None => Err(ConfigError::Validation(format!(
            "{field}: unknown format {value:?} (expected jpg, png, or webp)"
        ))),
    }
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Load config from `snapstash.toml` in the given directory.
///
/// Falls back to stock defaults when no file exists. Rejects unknown
/// keys and validates the result.
pub fn load_config(dir: &Path) -> Result<StashConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let config = StashConfig::default();
        config.validate()?;
        return Ok(config);
    }
    load_config_file(&config_path)
}

/// Load config from an explicit file path.
///
/// Unlike [`load_config`], a missing file is an error here: the user
/// asked for this exact file.
pub fn load_config_file(path: &Path) -> Result<StashConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: StashConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `snapstash.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Snapstash Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Snapstash looks for this file as ./snapstash.toml, or wherever
# --config points. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Downloading
# ---------------------------------------------------------------------------
[fetch]
# Per-request timeout in seconds.
timeout_secs = 15

# Extra attempts after the first request fails with a timeout, a network
# error, or a retryable status (5xx or 429). 3 means up to 4 requests.
max_retries = 3

# Base delay between attempts in milliseconds; the n-th retry waits
# n times this.
retry_delay_ms = 500

# ---------------------------------------------------------------------------
# Format conversion
# ---------------------------------------------------------------------------
[normalize]
# Re-encode WebP downloads to this format. Set to "" to keep them as-is.
convert_webp = "jpg"

# Re-encode HEIC downloads to this format. Set to "" to keep them as-is.
# HEIC sources that need decoding are reported per row, not converted.
convert_heic = "jpg"

# Re-encode every download to this format, whatever it arrived as.
# Overrides the convert_* rules above. Set to "" to disable.
force_format = ""
"##
}

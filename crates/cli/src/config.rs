//! # CLI Configuration
//!
//! Settings are layered: built-in defaults, then an optional `flightscan.yml`
//! (with `${VAR}` substitution), then `FLIGHTSCAN_*` environment variables.
//! The API key falls back to `ANTHROPIC_API_KEY` when no layer sets it.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use flightscan::extract::{BatchOptions, DEFAULT_MODEL};
use flightscan::providers::ai::anthropic::{DEFAULT_API_URL, DEFAULT_API_VERSION};
use flightscan::providers::factory::ProviderConfig;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// The file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "flightscan.yml";

/// Shortest allowed pause between status polls.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The resolved configuration of one CLI run.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub anthropic_version: String,
    pub model: String,
    pub max_tokens: u32,
    /// Seconds between status polls. Values below 1 are raised to 1.
    pub poll_interval_secs: u64,
    /// Upper bound on polling. `0` waits indefinitely.
    pub max_wait_secs: u64,
    pub prime_json: bool,
}

impl AppConfig {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_url: Some(self.api_url.clone()),
            api_key: self.api_key.clone(),
            api_version: Some(self.anthropic_version.clone()),
            ..Default::default()
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        if self.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            warn!(
                "poll_interval_secs = {} is too short; polling every {MIN_POLL_INTERVAL_SECS}s instead.",
                self.poll_interval_secs
            );
        }
        BatchOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS)),
            max_wait: (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs)),
            prime_json: self.prime_json,
            ..Default::default()
        }
    }
}

fn env_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").expect("env var pattern is valid"))
}

// Reads a file and substitutes `${VAR}` references with environment values.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &Path) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| {
        ConfigError::General(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })?;

    let expanded = env_var_regex().replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });
    Ok(Some(expanded.into_owned()))
}

/// Loads the configuration.
///
/// `config_path_override` must point at an existing file. Without it,
/// `flightscan.yml` in the working directory is used if present.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    // Layer 1: Built-in defaults.
    let mut builder = ConfigBuilder::builder()
        .set_default("api_url", DEFAULT_API_URL)?
        .set_default("anthropic_version", DEFAULT_API_VERSION)?
        .set_default("model", DEFAULT_MODEL)?
        .set_default("max_tokens", 1024)?
        .set_default("poll_interval_secs", 5)?
        .set_default("max_wait_secs", 24 * 60 * 60)?
        .set_default("prime_json", true)?;

    // Layer 2: YAML file.
    let file_content = match config_path_override {
        Some(path) => Some(read_and_substitute(Path::new(path))?.ok_or_else(|| {
            ConfigError::NotFound(format!("Config file not found at '{path}'."))
        })?),
        None => read_and_substitute(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    if let Some(content) = file_content {
        info!(
            "Loading configuration from '{}'.",
            config_path_override.unwrap_or(DEFAULT_CONFIG_FILE)
        );
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    // Layer 3: Prefixed environment overrides, e.g. FLIGHTSCAN_MODEL.
    let settings = builder
        .add_source(
            Environment::with_prefix("FLIGHTSCAN")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    if config.api_key.as_deref().map_or(true, str::is_empty) {
        config.api_key = env::var("ANTHROPIC_API_KEY").ok().filter(|key| !key.is_empty());
    }

    Ok(config)
}

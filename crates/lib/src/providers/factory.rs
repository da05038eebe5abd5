//! # Batch Provider Factory
//!
//! Centralizes the creation of batch inference providers from configuration so
//! every consumer (cli, server, tests) builds them the same way.

use crate::{
    errors::ExtractError,
    providers::ai::{
        anthropic::{AnthropicBatchProvider, DEFAULT_API_URL, DEFAULT_API_VERSION},
        BatchProvider,
    },
};
use serde::Deserialize;
use tracing::info;

/// A reusable configuration for a batch provider instance.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider. Only "anthropic" is supported.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

fn default_provider() -> String {
    "anthropic".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_url: None,
            api_key: None,
            api_version: None,
        }
    }
}

/// Creates a boxed batch provider from its configuration.
pub fn create_batch_provider(
    config: &ProviderConfig,
) -> Result<Box<dyn BatchProvider>, ExtractError> {
    match config.provider.as_str() {
        "anthropic" => {
            let api_key = config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or(ExtractError::MissingApiKey)?;
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string());
            let api_version = config
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

            info!("Configuring Anthropic batch provider with URL: {}", api_url);
            Ok(Box::new(
                AnthropicBatchProvider::new(api_url, api_key)?.with_api_version(api_version),
            ))
        }
        other => Err(ExtractError::AiApi(format!(
            "Unsupported batch provider: {other}"
        ))),
    }
}

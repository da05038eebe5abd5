//! # Server Configuration
//!
//! The health server only needs a port. It is read from `PORT`, falling back
//! to 9090.

use config::{Config as ConfigBuilder, Environment};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    pub port: u16,
}

/// The port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 9090;

/// Loads the server configuration from defaults and environment variables.
pub fn get_config() -> Result<Config, config::ConfigError> {
    ConfigBuilder::builder()
        .set_default("port", i64::from(DEFAULT_PORT))?
        .add_source(Environment::default().try_parsing(true))
        .build()?
        .try_deserialize()
}

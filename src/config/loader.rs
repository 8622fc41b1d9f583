//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources:
//! 1. Built-in defaults (Serialized)
//! 2. Config file (contribmap.toml, or a path given on the CLI)
//! 3. Environment variables (CONTRIBMAP_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::Path;
use tracing::debug;

use super::types::Config;
use crate::types::{ContribError, Result};

/// Default config file name in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "contribmap.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain:
    /// defaults → file → env vars
    pub fn load(config_path: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if path.exists() {
            debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // CONTRIBMAP_SERVER_PORT -> server.port, etc.
        figment = figment.merge(Env::prefixed("CONTRIBMAP_").split("_").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| ContribError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}

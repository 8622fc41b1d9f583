//! Configuration Types
//!
//! All configuration structures with sensible defaults. Every value can
//! be overridden from `contribmap.toml` or `CONTRIBMAP_*` environment
//! variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ai::ProviderConfig;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP surface settings
    pub server: ServerConfig,

    /// GitHub API settings
    pub github: GithubConfig,

    /// LLM provider settings
    pub llm: ProviderConfig,

    /// Persistence settings
    pub storage: StorageConfig,

    /// Job queue retry settings
    pub queue: QueueConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            github: GithubConfig::default(),
            llm: ProviderConfig::default(),
            storage: StorageConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> crate::types::Result<()> {
        if self.server.port == 0 {
            return Err(crate::types::ContribError::Config(
                "server.port must be nonzero".to_string(),
            ));
        }
        if self.github.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(crate::types::ContribError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.queue.max_attempts == 0 {
            return Err(crate::types::ContribError::Config(
                "queue.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Personal access token; optional for public repositories.
    /// Never serialized back out.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// API base override (test servers, GitHub Enterprise)
    pub api_base: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("contribmap.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: crate::constants::queue::MAX_ATTEMPTS,
            base_delay_ms: crate::constants::queue::BASE_DELAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_never_serialized() {
        let mut config = Config::default();
        config.github.token = Some("ghp_secret".into());
        let out = toml::to_string(&config).unwrap();
        assert!(!out.contains("ghp_secret"));
        let debug = format!("{:?}", config.github);
        assert!(!debug.contains("ghp_secret"));
    }
}

//! Configuration management for GasChain

use crate::error::ChainError;
use crate::miner::MAX_DIFFICULTY;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Put the sentinel transaction into the genesis block.
    #[serde(default = "default_true")]
    pub genesis_transaction: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            genesis_transaction: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_token")]
    pub token: String,
    /// Seal a block right after every accepted transaction.
    #[serde(default = "default_true")]
    pub auto_seal: bool,
    /// Reject transactions whose signature does not verify.
    #[serde(default)]
    pub require_signatures: bool,
    /// Upper bound on a single seal; 0 disables the limit.
    #[serde(default)]
    pub mining_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            token: default_token(),
            auto_seal: true,
            require_signatures: false,
            mining_timeout_secs: 0,
        }
    }
}

impl ApiConfig {
    pub fn mining_timeout(&self) -> Option<Duration> {
        (self.mining_timeout_secs > 0).then(|| Duration::from_secs(self.mining_timeout_secs))
    }
}

impl Config {
    pub fn from_toml(config_str: &str) -> Result<Self, ChainError> {
        Ok(toml::from_str(config_str)?)
    }

    /// Applies `API_TOKEN` and `PORT` from the environment, when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("API_TOKEN") {
            self.api.token = token;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.api.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.database.path.is_empty() {
            return Err(ChainError::ConfigError(
                "database.path must be set in config.toml".to_string(),
            ));
        }
        if self.api.token.is_empty() {
            return Err(ChainError::ConfigError("api.token must not be empty".to_string()));
        }
        if self.chain.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "chain.difficulty must be at most {}, got {}",
                MAX_DIFFICULTY, self.chain.difficulty
            )));
        }
        Ok(())
    }
}

/// Loads `path` (normally [`DEFAULT_CONFIG_PATH`]), falling back to defaults when the file is absent.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let mut config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        Config::from_toml(&config_str)?
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn default_difficulty() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

fn default_db_path() -> String {
    "./data/gaschain.db".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_token() -> String {
    "securetoken".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.chain.difficulty, 4);
        assert!(config.chain.genesis_transaction);
        assert_eq!(config.api.port, 8000);
        assert_eq!(config.api.token, "securetoken");
        assert!(config.api.auto_seal);
        assert!(config.api.mining_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            "[chain]\ndifficulty = 2\n\n[api]\nmining_timeout_secs = 30\n",
        )
        .unwrap();
        assert_eq!(config.chain.difficulty, 2);
        assert_eq!(config.database.path, "./data/gaschain.db");
        assert_eq!(config.api.mining_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.chain.difficulty = MAX_DIFFICULTY + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.token.clear();
        assert!(config.validate().is_err());

        assert!(matches!(
            Config::from_toml("[chain]\ndifficulty = \"high\""),
            Err(ChainError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[database]\npath = \"/tmp/chain.db\"\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.database.path, "/tmp/chain.db");
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub verifier: VerifierConfig,
    pub api: ApiConfig,
    #[serde(default = "default_whitelist_config")]
    pub whitelist: WhitelistConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// PEM bundle of root certificates trusted for Bot API calls.
    /// When unset the platform's root store is used.
    #[serde(default)]
    pub ca_bundle: Option<PathBuf>,
}

/// Remote IMEI verification service.
#[derive(Debug, Deserialize, Clone)]
pub struct VerifierConfig {
    pub api_url: String,
    pub api_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Shared secret callers of `/api/check-imei` must present
    pub auth_token: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WhitelistConfig {
    #[serde(default = "default_whitelist_path")]
    pub path: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_whitelist_path() -> PathBuf {
    PathBuf::from("whitelist.json")
}

fn default_whitelist_config() -> WhitelistConfig {
    WhitelistConfig {
        path: default_whitelist_path(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;

        let required = [
            ("telegram.bot_token", &config.telegram.bot_token),
            ("verifier.api_url", &config.verifier.api_url),
            ("verifier.api_token", &config.verifier.api_token),
            ("api.auth_token", &config.api.auth_token),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("Config value '{}' must not be empty", key);
            }
        }

        Ok(config)
    }
}

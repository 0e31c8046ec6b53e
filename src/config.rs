use std::fs;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use url::Url;
use crate::core::{FailurePolicy, QueueError, Result};

pub const ACCESS_TOKEN_ENV: &str = "MEDIA_QUEUE_ACCESS_TOKEN";
pub const AD_ACCOUNT_ID_ENV: &str = "MEDIA_QUEUE_AD_ACCOUNT_ID";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub platform: PlatformConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PlatformConfig {
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub ad_account_id: String,
    #[serde(default)]
    pub access_token: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct QueueConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct HttpConfig {
    /// Whole-request timeout, unset means none
    pub timeout_secs: Option<u64>,
}

fn default_graph_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v20.0".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("media-queue.db")
}

impl Config {
    /// Reads a TOML file, applies environment overrides and validates the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| QueueError::config(format!("cannot read {}: {}", path.display(), e)))?;

        let mut config = Self::parse(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates without looking at the environment.
    pub fn from_toml_str(content: &str) -> Result<Config> {
        let mut config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|e| QueueError::config(e.to_string()))
    }

    /// Non-empty values from `lookup` replace the credentials from the file.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(ACCESS_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.platform.access_token = token;
        }
        if let Some(account) = lookup(AD_ACCOUNT_ID_ENV).filter(|v| !v.trim().is_empty()) {
            self.platform.ad_account_id = account;
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        let platform = &mut self.platform;

        platform.access_token = platform.access_token.trim().to_string();
        if platform.access_token.is_empty() {
            return Err(QueueError::config("platform.access_token is required"));
        }

        let account = platform.ad_account_id.trim().to_string();
        if account.is_empty() {
            return Err(QueueError::config("platform.ad_account_id is required"));
        }
        platform.ad_account_id = if account.starts_with("act_") {
            account
        } else {
            format!("act_{}", account)
        };

        Url::parse(&platform.graph_url)
            .map_err(|e| QueueError::config(format!("invalid platform.graph_url {:?}: {}", platform.graph_url, e)))?;

        if platform.api_version.trim_matches('/').is_empty() {
            return Err(QueueError::config("platform.api_version must not be empty"));
        }

        Ok(())
    }
}

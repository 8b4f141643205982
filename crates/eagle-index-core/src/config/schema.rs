//! Configuration schema for eagle-index.toml
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! configuration that talks to api.github.com and writes into `./index`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration structure for eagle-index.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding alldex.json, candidate.json and primary.json
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Repository host settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Publishing requirements for plugin repositories
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Defaults for the update-index pass
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            github: GitHubConfig::default(),
            policy: PolicyConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Environment variable holding an optional bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Minimum delay between successive requests during a refresh
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            token_env: default_token_env(),
            request_delay_ms: default_request_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GitHubConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the bearer token from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Login that must have published the latest release
    #[serde(default = "default_trusted_publisher")]
    pub trusted_publisher: String,

    /// Substring that at least one release asset URL must contain
    #[serde(default = "default_package_marker")]
    pub package_marker: String,

    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    #[serde(default = "default_locale_path")]
    pub locale_path: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            trusted_publisher: default_trusted_publisher(),
            package_marker: default_package_marker(),
            manifest_path: default_manifest_path(),
            locale_path: default_locale_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Only entries modified within this many days are re-fetched
    #[serde(default = "default_days")]
    pub days: u32,

    /// Maximum entries examined per run, across both type files
    #[serde(default = "default_max_updates")]
    pub max_updates: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            max_updates: default_max_updates(),
        }
    }
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("index")
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    concat!("eagle-index/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_trusted_publisher() -> String {
    "github-actions[bot]".to_string()
}

fn default_package_marker() -> String {
    ".eagleplugin".to_string()
}

fn default_manifest_path() -> String {
    "manifest.json".to_string()
}

fn default_locale_path() -> String {
    "_locales/en.json".to_string()
}

fn default_days() -> u32 {
    3
}

fn default_max_updates() -> usize {
    200
}

impl IndexConfig {
    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.github.api_url)
            .with_context(|| format!("Invalid github.api_url: '{}'", self.github.api_url))?;

        if self.github.user_agent.trim().is_empty() {
            anyhow::bail!("github.user_agent cannot be empty");
        }
        if self.policy.trusted_publisher.trim().is_empty() {
            anyhow::bail!("policy.trusted_publisher cannot be empty");
        }
        if self.policy.package_marker.trim().is_empty() {
            anyhow::bail!("policy.package_marker cannot be empty");
        }
        if self.policy.manifest_path.trim().is_empty() {
            anyhow::bail!("policy.manifest_path cannot be empty");
        }
        if self.policy.locale_path.trim().is_empty() {
            anyhow::bail!("policy.locale_path cannot be empty");
        }
        Ok(())
    }
}

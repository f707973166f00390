//! Configuration parsing and validation.
//!
//! The service is configured from a TOML file (default `./config/ltx.toml`):
//!
//! ```toml
//! [db]
//! path = "./data/ltx.sqlite"
//!
//! [feed]
//! base_url = "http://video.google.com/timedtext"
//! default_language = "en"
//! timeout_secs = 30
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! ```
//!
//! `[feed]` may be omitted entirely; every field in it has a default.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::fetch::{is_language_code, parse_base_url};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Timed-text endpoint; `lang`/`v` or `type`/`v` are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Whole-request timeout applied by the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://video.google.com/timedtext".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    parse_base_url(&config.feed.base_url)
        .map_err(|e| anyhow::anyhow!("feed.base_url is invalid: {}", e))?;

    if !is_language_code(&config.feed.default_language) {
        bail!(
            "feed.default_language '{}' is not a language code",
            config.feed.default_language
        );
    }

    if config.feed.timeout_secs == 0 {
        bail!("feed.timeout_secs must be > 0");
    }

    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    Ok(())
}

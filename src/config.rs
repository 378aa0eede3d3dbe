use anyhow::{bail, Context, Result};
use reqwest::header::HeaderValue;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Origin name -> list locations feeding it.
    #[serde(default = "default_sources")]
    pub sources: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Caps in-flight fetches per refresh. Unset means one task per location.
    #[serde(default)]
    pub concurrent_downloads: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_period_secs")]
    pub period_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Longest accepted cache period: one year.
pub const MAX_CACHE_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

// Defaults
fn default_fetch_timeout_ms() -> u64 {
    3000
}
fn default_user_agent() -> String {
    concat!("vpn-check/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_cache_period_secs() -> u64 {
    45 * 60
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_sources() -> HashMap<String, Vec<String>> {
    let mut m = HashMap::new();
    // This list merges every provider into one origin.
    m.insert(
        "x4b-merged".to_string(),
        vec!["https://raw.githubusercontent.com/X4BNet/lists_vpn/main/ipv4.txt".to_string()],
    );
    m
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_fetch_timeout_ms(),
            user_agent: default_user_agent(),
            concurrent_downloads: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            period_secs: default_cache_period_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout_ms == 0 {
            bail!("fetch.timeout_ms must be greater than zero");
        }
        if self.cache.period_secs == 0 {
            bail!("cache.period_secs must be greater than zero");
        }
        if self.cache.period_secs > MAX_CACHE_PERIOD_SECS {
            bail!(
                "cache.period_secs must be at most {} (one year)",
                MAX_CACHE_PERIOD_SECS
            );
        }
        if self.fetch.concurrent_downloads == Some(0) {
            bail!("fetch.concurrent_downloads must be greater than zero when set");
        }
        if self.fetch.user_agent.trim().is_empty() {
            bail!("fetch.user_agent must not be empty");
        }
        HeaderValue::from_str(&self.fetch.user_agent)
            .context("fetch.user_agent is not a valid header value")?;
        for (origin, location) in self.sources_sorted() {
            Url::parse(&location).with_context(|| {
                format!("Invalid source location for '{}': {}", origin, location)
            })?;
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch.timeout_ms)
    }

    pub fn cache_period(&self) -> Duration {
        Duration::from_secs(self.cache.period_secs)
    }

    /// Flattened (origin, location) pairs, sorted for stable output.
    pub fn sources_sorted(&self) -> Vec<(String, String)> {
        let mut list: Vec<_> = self
            .sources
            .iter()
            .flat_map(|(origin, locations)| {
                locations
                    .iter()
                    .map(move |location| (origin.clone(), location.clone()))
            })
            .collect();
        list.sort();
        list
    }
}

//! Configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::client::ClientOptions;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// NCBI credentials
    #[serde(default)]
    pub ncbi: NcbiConfig,

    /// Rate limiting settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// NCBI identification. An API key raises the allowed request rate from
/// 3/s to 10/s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NcbiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Contact email passed with each request, as NCBI asks of tools
    #[serde(default)]
    pub email: Option<String>,
}

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("NCBI_API_KEY").ok(),
            email: std::env::var("NCBI_EMAIL").ok(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second against E-utilities. When unset, picked from
    /// whether an API key is configured.
    #[serde(default)]
    pub requests_per_second: Option<f64>,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_size")]
    pub max_entries: usize,

    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_size(),
            ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_cache_size() -> usize {
    512
}

fn default_cache_ttl() -> u64 {
    300
}

impl Config {
    /// Effective request rate: explicit setting wins, otherwise NCBI's
    /// keyed/keyless allowance.
    pub fn effective_rate(&self) -> f64 {
        self.rate_limit.requests_per_second.unwrap_or({
            if self.ncbi.api_key.is_some() {
                10.0
            } else {
                3.0
            }
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            rate_limit: self.effective_rate(),
            cache_size: self.cache.max_entries,
            cache_ttl: Duration::from_secs(self.cache.ttl_seconds),
            api_key: self.ncbi.api_key.clone(),
            email: self.ncbi.email.clone(),
        }
    }
}

/// Load configuration from a file, with `PUBMED_MCP_*` environment
/// variables layered on top.
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(config::Environment::with_prefix("PUBMED_MCP").separator("__"))
        .build()?;

    settings.try_deserialize()
}

//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FALLOW_*)
//! 2. TOML config file (if FALLOW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::{ConfigError, MAX_EVICTION_AGE_SECS, PATTERN_KINDS};

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FALLOW_*)
/// 2. TOML config file (if FALLOW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding every cache partition.
    ///
    /// Set via FALLOW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Version tag of the current partition set (`static-<v>`, `api-<v>`, `runtime-<v>`).
    ///
    /// Bumping it retires every partition from the previous deployment on activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Base URL of the application shell.
    ///
    /// Pre-cache manifest paths and the root document resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Shell assets fetched into the static partition at install time.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Patterns routed to the network-first strategy, in evaluation order.
    #[serde(default = "default_network_first_patterns")]
    pub network_first_patterns: Vec<String>,

    /// Patterns routed to the cache-first strategy, in evaluation order.
    #[serde(default = "default_cache_first_patterns")]
    pub cache_first_patterns: Vec<String>,

    /// Network budget for API requests, in milliseconds.
    #[serde(default = "default_api_timeout_ms")]
    pub api_timeout_ms: u64,

    /// Network budget for navigation requests, in milliseconds.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Network budget for static assets and revalidation, in milliseconds.
    #[serde(default = "default_asset_timeout_ms")]
    pub asset_timeout_ms: u64,

    /// Maximum entry age applied by the eviction sweep, in seconds.
    #[serde(default = "default_eviction_max_age_secs")]
    pub eviction_max_age_secs: u64,

    /// User-Agent string for outbound requests.
    ///
    /// Set via FALLOW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size buffered per request.
    ///
    /// Set via FALLOW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Localized message carried by the offline JSON fallback.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./fallow-cache.sqlite")
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:3000/".into()
}

fn default_precache_manifest() -> Vec<String> {
    ["/", "/manifest.json", "/favicon.ico", "/icons/icon-192x192.png", "/icons/icon-512x512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_network_first_patterns() -> Vec<String> {
    ["contains:/api/", "host:api.coingecko.com", "host:min-api.cryptocompare.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cache_first_patterns() -> Vec<String> {
    [
        "ext:js",
        "ext:css",
        "ext:woff",
        "ext:woff2",
        "ext:ttf",
        "ext:png",
        "ext:jpg",
        "ext:jpeg",
        "ext:gif",
        "ext:svg",
        "ext:webp",
        "ext:ico",
        "prefix:/assets/",
        "prefix:/icons/",
        "prefix:/images/",
        "host:fonts.googleapis.com",
        "host:fonts.gstatic.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_timeout_ms() -> u64 {
    10_000
}

fn default_navigation_timeout_ms() -> u64 {
    15_000
}

fn default_asset_timeout_ms() -> u64 {
    8_000
}

fn default_eviction_max_age_secs() -> u64 {
    3_600
}

fn default_user_agent() -> String {
    "fallow/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_offline_message() -> String {
    "Cached data unavailable".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            precache_manifest: default_precache_manifest(),
            network_first_patterns: default_network_first_patterns(),
            cache_first_patterns: default_cache_first_patterns(),
            api_timeout_ms: default_api_timeout_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            asset_timeout_ms: default_asset_timeout_ms(),
            eviction_max_age_secs: default_eviction_max_age_secs(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            offline_message: default_offline_message(),
        }
    }
}

impl AppConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn asset_timeout(&self) -> Duration {
        Duration::from_millis(self.asset_timeout_ms)
    }

    /// Eviction threshold as a chrono duration for timestamp arithmetic.
    ///
    /// Saturates at [`MAX_EVICTION_AGE_SECS`].
    pub fn eviction_max_age(&self) -> chrono::Duration {
        let secs = self.eviction_max_age_secs.min(MAX_EVICTION_AGE_SECS);
        i64::try_from(secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or_else(|| chrono::TimeDelta::days(365))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FALLOW_`
    /// 2. TOML file from `FALLOW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FALLOW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FALLOW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Resolve the origin into a URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: format!("unsupported scheme: {scheme}"),
            }),
        }
    }
}

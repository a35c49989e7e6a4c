//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Prefixes accepted in routing pattern strings.
pub const PATTERN_KINDS: &[&str] = &["host:", "prefix:", "contains:", "ext:", "url:", "re:"];

/// Upper bound for `eviction_max_age_secs`: one year.
pub const MAX_EVICTION_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value < 100 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
    }
    if value > 300_000 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must not exceed 5 minutes (300000ms)".into() });
    }
    Ok(())
}

fn validate_patterns(field: &str, patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        let Some(kind) = PATTERN_KINDS.iter().find(|kind| pattern.starts_with(*kind)) else {
            return Err(ConfigError::Invalid {
                field: field.into(),
                reason: format!("unknown pattern kind in {pattern:?} (expected one of {PATTERN_KINDS:?})"),
            });
        };
        if pattern.len() == kind.len() {
            return Err(ConfigError::Invalid { field: field.into(), reason: format!("empty pattern {pattern:?}") });
        }
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_version` or `user_agent` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - any timeout is below 100ms or exceeds 5 minutes
    /// - `eviction_max_age_secs` is 0 or exceeds one year
    /// - a routing pattern has an unknown kind or an empty body
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        self.origin_url()?;

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        validate_timeout("api_timeout_ms", self.api_timeout_ms)?;
        validate_timeout("navigation_timeout_ms", self.navigation_timeout_ms)?;
        validate_timeout("asset_timeout_ms", self.asset_timeout_ms)?;

        if self.eviction_max_age_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "eviction_max_age_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.eviction_max_age_secs > MAX_EVICTION_AGE_SECS {
            return Err(ConfigError::Invalid {
                field: "eviction_max_age_secs".into(),
                reason: format!("must not exceed one year ({MAX_EVICTION_AGE_SECS}s)"),
            });
        }

        validate_patterns("network_first_patterns", &self.network_first_patterns)?;
        validate_patterns("cache_first_patterns", &self.cache_first_patterns)?;

        if self.precache_manifest.is_empty() {
            tracing::warn!("precache_manifest is empty; offline navigation will only serve previously visited pages");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { cache_version: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_max_bytes_exceeds_limit() {
        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { api_timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { navigation_timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "navigation_timeout_ms"));
    }

    #[test]
    fn test_validate_zero_max_age() {
        let config = AppConfig { eviction_max_age_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "eviction_max_age_secs"));
    }

    #[test]
    fn test_validate_max_age_exceeds_limit() {
        let config = AppConfig { eviction_max_age_secs: u64::MAX / 2, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "eviction_max_age_secs"));

        let one_year = AppConfig { eviction_max_age_secs: MAX_EVICTION_AGE_SECS, ..Default::default() };
        assert!(one_year.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_pattern_kind() {
        let config = AppConfig { cache_first_patterns: vec!["glob:*.js".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_first_patterns"));
    }

    #[test]
    fn test_validate_regex_pattern_kind_accepted() {
        let config = AppConfig { network_first_patterns: vec![r"re:^https://[^/]+/v\d+/".into()], ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_pattern() {
        let config = AppConfig { network_first_patterns: vec!["host:".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "network_first_patterns"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            api_timeout_ms: 100,
            navigation_timeout_ms: 300_000,
            eviction_max_age_secs: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}

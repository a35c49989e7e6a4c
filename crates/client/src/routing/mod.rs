//! Request classification.
//!
//! ### Evaluation order
//! 1. Non-GET or non-HTTP(S) requests are passed through untouched.
//! 2. Network-first patterns (data APIs) are checked first, so a broad
//!    static-asset rule can never shadow an API path.
//! 3. Cache-first patterns, or a declared script/style/image/font destination.
//! 4. Navigations get network-first with the offline document fallback.
//! 5. Everything else is stale-while-revalidate.

pub mod pattern;

pub use pattern::Pattern;

use crate::request::{Request, RequestMode};
use fallow_core::{AppConfig, Error};
use serde::Serialize;
use std::fmt;

/// The closed set of caching strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    NetworkFirstOffline,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::NetworkFirstOffline => "network-first-offline",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "route", content = "strategy")]
pub enum Route {
    /// Not intercepted; forwarded to the network as-is and never cached.
    Passthrough,
    Intercept(Strategy),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Passthrough => f.write_str("passthrough"),
            Route::Intercept(strategy) => fmt::Display::fmt(strategy, f),
        }
    }
}

/// A pattern tagged with the strategy it selects.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Pattern,
    pub strategy: Strategy,
}

/// Two ordered rule lists: network-first, then cache-first.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    network_first: Vec<Rule>,
    cache_first: Vec<Rule>,
}

fn compile(patterns: &[String], strategy: Strategy) -> Result<Vec<Rule>, Error> {
    patterns
        .iter()
        .map(|p| Pattern::parse(p).map(|pattern| Rule { pattern, strategy }))
        .collect()
}

impl RoutingTable {
    /// Build a table from pattern strings (`host:`, `prefix:`, `contains:`, `ext:`, `url:`, `re:`).
    pub fn new(network_first: &[String], cache_first: &[String]) -> Result<Self, Error> {
        Ok(Self {
            network_first: compile(network_first, Strategy::NetworkFirst)?,
            cache_first: compile(cache_first, Strategy::CacheFirst)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.network_first_patterns, &config.cache_first_patterns)
    }

    /// Select the route for a request. First match wins.
    pub fn classify(&self, request: &Request) -> Route {
        if !request.is_get() || !request.is_http() {
            return Route::Passthrough;
        }

        let strategy = self
            .network_first
            .iter()
            .chain(self.cache_first.iter())
            .find(|rule| rule.pattern.matches(&request.url))
            .map(|rule| rule.strategy)
            .or_else(|| request.destination.is_static_asset().then_some(Strategy::CacheFirst))
            .or_else(|| (request.mode == RequestMode::Navigate).then_some(Strategy::NetworkFirstOffline))
            .unwrap_or(Strategy::StaleWhileRevalidate);

        tracing::debug!(request = %request, %strategy, "classified request");
        Route::Intercept(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Destination;
    use reqwest::Method;
    use url::Url;

    fn table() -> RoutingTable {
        RoutingTable::from_config(&AppConfig::default()).unwrap()
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_get_passthrough() {
        let request = Request::new(Method::POST, Url::parse("https://example.com/api/orders").unwrap());
        assert_eq!(table().classify(&request), Route::Passthrough);
    }

    #[test]
    fn test_non_http_passthrough() {
        assert_eq!(table().classify(&get("chrome-extension://abcdef/app.js")), Route::Passthrough);
    }

    #[test]
    fn test_api_path_network_first() {
        assert_eq!(
            table().classify(&get("https://example.com/api/subscription")),
            Route::Intercept(Strategy::NetworkFirst)
        );
        assert_eq!(
            table().classify(&get("https://api.coingecko.com/api/v3/simple/price")),
            Route::Intercept(Strategy::NetworkFirst)
        );
    }

    #[test]
    fn test_api_beats_static_extension() {
        let request = get("https://example.com/api/charts/btc.png").with_destination(Destination::Image);
        assert_eq!(table().classify(&request), Route::Intercept(Strategy::NetworkFirst));
    }

    #[test]
    fn test_static_assets_cache_first() {
        for url in [
            "https://example.com/static/js/main.3f2a.js",
            "https://example.com/styles/site.css",
            "https://example.com/icons/badge",
            "https://fonts.gstatic.com/s/inter/v12/a.woff2",
        ] {
            assert_eq!(table().classify(&get(url)), Route::Intercept(Strategy::CacheFirst), "{url}");
        }
    }

    #[test]
    fn test_declared_destination_cache_first() {
        let request = get("https://cdn.example.com/render?id=7").with_destination(Destination::Image);
        assert_eq!(table().classify(&request), Route::Intercept(Strategy::CacheFirst));
    }

    #[test]
    fn test_navigation_offline_fallback() {
        let request = Request::navigate(Url::parse("https://example.com/pricing").unwrap());
        assert_eq!(table().classify(&request), Route::Intercept(Strategy::NetworkFirstOffline));
    }

    #[test]
    fn test_default_stale_while_revalidate() {
        assert_eq!(
            table().classify(&get("https://example.com/manifest.webmanifest")),
            Route::Intercept(Strategy::StaleWhileRevalidate)
        );
    }

    #[test]
    fn test_first_rule_wins_in_order() {
        let table = RoutingTable::new(&["prefix:/assets/data/".into()], &["prefix:/assets/".into()]).unwrap();
        assert_eq!(table.classify(&get("https://example.com/assets/data/x")), Route::Intercept(Strategy::NetworkFirst));
        assert_eq!(table.classify(&get("https://example.com/assets/logo")), Route::Intercept(Strategy::CacheFirst));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(RoutingTable::new(&["bogus".into()], &[]).is_err());
    }

    #[test]
    fn test_route_display() {
        assert_eq!(Route::Passthrough.to_string(), "passthrough");
        assert_eq!(Route::Intercept(Strategy::StaleWhileRevalidate).to_string(), "stale-while-revalidate");
    }
}

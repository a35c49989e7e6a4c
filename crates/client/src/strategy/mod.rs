//! Strategy executors.
//!
//! One function per [`Strategy`] variant. Every executor works against the
//! same [`StrategyContext`]: the current partition set, the network
//! primitive, and the worker-owned set of background writes.
//!
//! Storage failures never change a computed response: reads that fail are
//! treated as misses and writes that fail are logged and dropped.

pub mod background;
pub mod cache_first;
pub mod navigation;
pub mod network_first;
pub mod stale_while_revalidate;

pub use background::BackgroundWrites;

use crate::fetch::Fetcher;
use crate::request::Request;
use crate::routing::Strategy;
use fallow_core::{AppConfig, Error, PartitionKind, Partitions, ResponseSnapshot};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Network budgets per strategy family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Network-first API requests.
    pub api: Duration,
    /// Navigations and pre-cache fetches.
    pub navigation: Duration,
    /// Cache-first misses and stale-while-revalidate refreshes.
    pub asset: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { api: Duration::from_secs(10), navigation: Duration::from_secs(15), asset: Duration::from_secs(8) }
    }
}

impl Timeouts {
    pub fn for_strategy(&self, strategy: Strategy) -> Duration {
        match strategy {
            Strategy::NetworkFirst => self.api,
            Strategy::NetworkFirstOffline => self.navigation,
            Strategy::CacheFirst | Strategy::StaleWhileRevalidate => self.asset,
        }
    }
}

/// Everything an executor needs, shared by reference across requests.
#[derive(Clone)]
pub struct StrategyContext {
    pub(crate) partitions: Partitions,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) writes: BackgroundWrites,
    pub(crate) timeouts: Timeouts,
    pub(crate) root_document: Url,
    pub(crate) offline_message: String,
}

impl StrategyContext {
    pub fn new(partitions: Partitions, fetcher: Arc<dyn Fetcher>, root_document: Url) -> Self {
        Self {
            partitions,
            fetcher,
            writes: BackgroundWrites::new(),
            timeouts: Timeouts::default(),
            root_document,
            offline_message: "Cached data unavailable".to_string(),
        }
    }

    pub fn from_config(config: &AppConfig, partitions: Partitions, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let root_document = origin
            .join("/")
            .map_err(|e| Error::InvalidUrl(format!("{origin}: {e}")))?;

        Ok(Self::new(partitions, fetcher, root_document)
            .with_timeouts(Timeouts {
                api: config.api_timeout(),
                navigation: config.navigation_timeout(),
                asset: config.asset_timeout(),
            })
            .with_offline_message(config.offline_message.clone()))
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_offline_message(mut self, message: impl Into<String>) -> Self {
        self.offline_message = message.into();
        self
    }

    pub fn partitions(&self) -> &Partitions {
        &self.partitions
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn writes(&self) -> &BackgroundWrites {
        &self.writes
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn root_document(&self) -> &Url {
        &self.root_document
    }

    /// Cached response for a GET of `url`, or `None` on a miss or storage failure.
    pub(crate) async fn lookup(&self, kind: PartitionKind, url: &Url) -> Option<ResponseSnapshot> {
        match self.partitions.lookup(kind, "GET", url.as_str()).await {
            Ok(entry) => entry.map(|entry| entry.response),
            Err(e) => {
                tracing::warn!(partition = %kind, %url, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Store a response, logging and dropping any storage failure.
    pub(crate) async fn store(&self, kind: PartitionKind, url: &Url, response: &ResponseSnapshot) {
        if let Err(e) = self.partitions.store(kind, "GET", url.as_str(), response).await {
            tracing::warn!(partition = %kind, %url, error = %e, "cache write failed");
        }
    }

    /// Store a cacheable response on a detached task.
    pub(crate) fn store_detached(&self, kind: PartitionKind, url: &Url, response: &ResponseSnapshot) {
        if !response.is_cacheable() {
            return;
        }
        let ctx = self.clone();
        let url = url.clone();
        let response = response.clone();
        self.writes.spawn(async move { ctx.store(kind, &url, &response).await });
    }
}

/// Run the executor for `strategy`.
///
/// Only stale-while-revalidate can fail: with nothing cached, its network
/// failure is the answer.
pub async fn execute(ctx: &StrategyContext, strategy: Strategy, request: &Request) -> Result<ResponseSnapshot, Error> {
    match strategy {
        Strategy::CacheFirst => Ok(cache_first::run(ctx, request).await),
        Strategy::NetworkFirst => Ok(network_first::run(ctx, request).await),
        Strategy::NetworkFirstOffline => Ok(navigation::run(ctx, request).await),
        Strategy::StaleWhileRevalidate => stale_while_revalidate::run(ctx, request).await,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedFetcher, ok};

    #[test]
    fn test_timeouts_per_strategy() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.for_strategy(Strategy::NetworkFirst), Duration::from_secs(10));
        assert_eq!(timeouts.for_strategy(Strategy::NetworkFirstOffline), Duration::from_secs(15));
        assert_eq!(timeouts.for_strategy(Strategy::CacheFirst), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_from_config_uses_origin_root() {
        let db = fallow_core::CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig { origin: "https://shell.example.com/app/index.html".into(), ..Default::default() };
        let ctx = StrategyContext::from_config(&config, Partitions::new(db, "v1"), ScriptedFetcher::new()).unwrap();
        assert_eq!(ctx.root_document().as_str(), "https://shell.example.com/");
        assert_eq!(ctx.timeouts().api, config.api_timeout());
    }

    #[tokio::test]
    async fn test_store_detached_skips_non_200() {
        let ctx = test_support::context(ScriptedFetcher::new()).await;
        let url = Url::parse("https://app.example.com/a.js").unwrap();
        ctx.store_detached(PartitionKind::Runtime, &url, &crate::testing::status(404, "missing"));
        assert_eq!(ctx.writes().pending(), 0);

        ctx.store_detached(PartitionKind::Runtime, &url, &ok("js"));
        ctx.writes().settle().await;
        assert!(ctx.lookup(PartitionKind::Runtime, &url).await.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_executions_racing_deletion_degrade_to_misses() {
        use fallow_core::cache::hash::compute_cache_key;

        let ctx = test_support::context(ScriptedFetcher::new()).await;
        let db = ctx.partitions().db().clone();
        let assets: Vec<Url> =
            (0..20).map(|i| Url::parse(&format!("https://app.example.com/app-{i}.js")).unwrap()).collect();
        let apis: Vec<Url> =
            (0..20).map(|i| Url::parse(&format!("https://app.example.com/api/{i}")).unwrap()).collect();
        for url in &assets {
            ctx.store(PartitionKind::Runtime, url, &ok(url.as_str())).await;
        }
        for url in &apis {
            ctx.store(PartitionKind::Api, url, &ok(url.as_str())).await;
        }

        let mut executions = Vec::new();
        for (strategy, urls) in [(Strategy::CacheFirst, &assets), (Strategy::NetworkFirst, &apis)] {
            for url in urls {
                let ctx = ctx.clone();
                let request = Request::get(url.clone());
                executions.push(tokio::spawn(async move { (request.url.clone(), execute(&ctx, strategy, &request).await) }));
            }
        }
        let deleters: Vec<_> = assets
            .iter()
            .map(|url| {
                let db = db.clone();
                let key = compute_cache_key("GET", url.as_str());
                tokio::spawn(async move { db.delete_entry("runtime-v1", &key).await })
            })
            .collect();

        let sweep = Partitions::new(db.clone(), "v2").sweep_stale().await;
        assert!(sweep.is_ok());

        for deleter in deleters {
            assert!(deleter.await.unwrap().is_ok());
        }
        for execution in executions {
            let (url, result) = execution.await.unwrap();
            let response = result.unwrap();
            match response.status {
                200 => assert_eq!(response.body, url.as_str().as_bytes()),
                503 => {}
                other => panic!("unexpected status {other} for {url}"),
            }
        }
        ctx.writes().settle().await;
    }
}

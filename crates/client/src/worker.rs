//! The interception entry point.
//!
//! Every outbound request goes through [`Worker::handle`]: classify, then
//! either pass it straight to the network or run the selected strategy.

use crate::fetch::Fetcher;
use crate::request::Request;
use crate::routing::{Route, RoutingTable};
use crate::strategy::{self, StrategyContext};
use fallow_core::{AppConfig, Error, Partitions, ResponseSnapshot};
use std::sync::Arc;

/// Request interceptor shared by every in-flight request.
#[derive(Clone)]
pub struct Worker {
    routes: Arc<RoutingTable>,
    ctx: StrategyContext,
}

impl Worker {
    pub fn new(routes: RoutingTable, ctx: StrategyContext) -> Self {
        Self { routes: Arc::new(routes), ctx }
    }

    pub fn from_config(config: &AppConfig, partitions: Partitions, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let routes = RoutingTable::from_config(config)?;
        let ctx = StrategyContext::from_config(config, partitions, fetcher)?;
        Ok(Self::new(routes, ctx))
    }

    pub fn route(&self, request: &Request) -> Route {
        self.routes.classify(request)
    }

    /// Answer a request.
    ///
    /// Passed-through requests are fetched once and never cached; their
    /// transport errors reach the caller unchanged.
    pub async fn handle(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        match self.route(request) {
            Route::Passthrough => {
                tracing::debug!(%request, "passing request through");
                self.ctx.fetcher.fetch(request, self.ctx.timeouts.navigation).await
            }
            Route::Intercept(strategy) => strategy::execute(&self.ctx, strategy, request).await,
        }
    }

    /// Wait for every background cache write spawned so far.
    pub async fn settle(&self) {
        self.ctx.writes.settle().await;
    }

    pub fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    pub fn partitions(&self) -> &Partitions {
        &self.ctx.partitions
    }
}

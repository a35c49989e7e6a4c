//! Cache-first: a populated entry is served as-is and never revalidated.

use super::StrategyContext;
use crate::offline;
use crate::request::Request;
use fallow_core::{PartitionKind, ResponseSnapshot};

pub async fn run(ctx: &StrategyContext, request: &Request) -> ResponseSnapshot {
    if let Some(cached) = ctx.lookup(PartitionKind::Runtime, &request.url).await {
        tracing::debug!(%request, "cache-first hit");
        return cached;
    }

    match ctx.fetcher.fetch(request, ctx.timeouts.asset).await {
        Ok(response) => {
            ctx.store_detached(PartitionKind::Runtime, &request.url, &response);
            response
        }
        Err(e) => {
            tracing::debug!(%request, error = %e, "cache-first miss with network down");
            offline::offline_text()
        }
    }
}

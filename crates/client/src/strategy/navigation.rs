//! Network-first for navigations, backed by the static partition.
//!
//! Fallback order when the network fails:
//! 1. the cached copy of the requested page
//! 2. the cached application root document
//! 3. a synthesized offline page
//!
//! A navigation therefore always gets an answer.

use super::StrategyContext;
use crate::offline;
use crate::request::Request;
use fallow_core::{PartitionKind, ResponseSnapshot};

pub async fn run(ctx: &StrategyContext, request: &Request) -> ResponseSnapshot {
    let err = match ctx.fetcher.fetch(request, ctx.timeouts.navigation).await {
        Ok(response) => {
            if response.is_cacheable() {
                ctx.store(PartitionKind::Static, &request.url, &response).await;
            }
            return response;
        }
        Err(e) => e,
    };

    tracing::debug!(%request, error = %err, "navigation falling back to cache");

    if let Some(cached) = ctx.lookup(PartitionKind::Static, &request.url).await {
        return cached;
    }

    if request.url != ctx.root_document
        && let Some(root) = ctx.lookup(PartitionKind::Static, &ctx.root_document).await
    {
        tracing::debug!(%request, root = %ctx.root_document, "serving cached root document");
        return root;
    }

    offline::offline_document()
}

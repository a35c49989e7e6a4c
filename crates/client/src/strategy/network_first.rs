//! Network-first for data APIs.
//!
//! The network answer wins whenever there is one, whatever its status. Only a
//! transport failure (timeout included) falls back to the API partition, and
//! then to a synthesized JSON error.

use super::StrategyContext;
use crate::offline;
use crate::request::Request;
use fallow_core::{PartitionKind, ResponseSnapshot};

pub async fn run(ctx: &StrategyContext, request: &Request) -> ResponseSnapshot {
    match ctx.fetcher.fetch(request, ctx.timeouts.api).await {
        Ok(response) => {
            if response.is_cacheable() {
                ctx.store(PartitionKind::Api, &request.url, &response).await;
            }
            response
        }
        Err(e) => {
            tracing::debug!(%request, error = %e, "network-first falling back to cache");
            match ctx.lookup(PartitionKind::Api, &request.url).await {
                Some(cached) => cached,
                None => offline::offline_json(&ctx.offline_message),
            }
        }
    }
}

//! Stale-while-revalidate.
//!
//! The network fetch starts before the cache lookup and runs on a detached
//! task. A cached entry is returned immediately; the refresh only affects
//! later requests. With nothing cached, the caller waits for the network and
//! a network failure is the answer.

use super::StrategyContext;
use crate::request::Request;
use fallow_core::{Error, PartitionKind, ResponseSnapshot};
use tokio::sync::oneshot;

pub async fn run(ctx: &StrategyContext, request: &Request) -> Result<ResponseSnapshot, Error> {
    let (tx, rx) = oneshot::channel();

    let revalidate = {
        let ctx = ctx.clone();
        let request = request.clone();
        async move {
            let result = ctx.fetcher.fetch(&request, ctx.timeouts.asset).await;
            let fresh = result.as_ref().ok().filter(|r| r.is_cacheable()).cloned();
            if let Err(e) = &result {
                tracing::debug!(%request, error = %e, "revalidation failed");
            }
            // The receiver is gone when the caller was served from cache.
            let _ = tx.send(result);
            if let Some(response) = fresh {
                ctx.store(PartitionKind::Runtime, &request.url, &response).await;
            }
        }
    };
    ctx.writes.spawn(revalidate);

    if let Some(cached) = ctx.lookup(PartitionKind::Runtime, &request.url).await {
        tracing::debug!(%request, "serving stale entry while revalidating");
        return Ok(cached);
    }

    rx.await
        .unwrap_or_else(|_| Err(Error::HttpError(format!("{}: revalidation task ended early", request.url))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::context;
    use crate::testing::{ScriptedFetcher, ok, status};
    use std::time::Duration;
    use url::Url;

    const URL: &str = "https://app.example.com/site.webmanifest";

    fn request() -> Request {
        Request::get(Url::parse(URL).unwrap())
    }

    #[tokio::test]
    async fn test_cached_entry_survives_network_failure_then_refreshes() {
        let fetcher = ScriptedFetcher::new();
        fetcher.fail(URL);
        let ctx = context(fetcher.clone()).await;
        ctx.store(PartitionKind::Runtime, &request().url, &ok("v1")).await;

        let first = run(&ctx, &request()).await.unwrap();
        assert_eq!(first.body, b"v1");
        ctx.writes().settle().await;

        fetcher.reply(URL, ok("v2"));
        let second = run(&ctx, &request()).await.unwrap();
        assert_eq!(second.body, b"v1");
        ctx.writes().settle().await;

        let third = run(&ctx, &request()).await.unwrap();
        assert_eq!(third.body, b"v2");
        ctx.writes().settle().await;
        assert_eq!(fetcher.calls_for(URL), 3);
    }

    #[tokio::test]
    async fn test_cached_entry_returned_without_waiting_for_network() {
        let fetcher = ScriptedFetcher::new();
        fetcher.reply_after(URL, Duration::from_millis(150), ok("slow"));
        let ctx = context(fetcher).await;
        ctx.store(PartitionKind::Runtime, &request().url, &ok("cached")).await;

        let response = tokio::time::timeout(Duration::from_millis(100), run(&ctx, &request()))
            .await
            .expect("cached response must not wait for the network")
            .unwrap();
        assert_eq!(response.body, b"cached");
        ctx.writes().settle().await;
    }

    #[tokio::test]
    async fn test_miss_waits_for_network_and_stores() {
        let fetcher = ScriptedFetcher::new();
        fetcher.reply(URL, ok("{}"));
        let ctx = context(fetcher).await;

        let response = run(&ctx, &request()).await.unwrap();
        assert_eq!(response.body, b"{}");

        ctx.writes().settle().await;
        assert!(ctx.lookup(PartitionKind::Runtime, &request().url).await.is_some());
    }

    #[tokio::test]
    async fn test_miss_with_network_failure_is_error() {
        let fetcher = ScriptedFetcher::new();
        fetcher.fail(URL);
        let ctx = context(fetcher).await;

        let err = run(&ctx, &request()).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_non_200_refresh_does_not_overwrite() {
        let fetcher = ScriptedFetcher::new();
        fetcher.reply(URL, status(502, "bad gateway"));
        let ctx = context(fetcher).await;
        ctx.store(PartitionKind::Runtime, &request().url, &ok("good")).await;

        run(&ctx, &request()).await.unwrap();
        ctx.writes().settle().await;

        let stored = ctx.lookup(PartitionKind::Runtime, &request().url).await.unwrap();
        assert_eq!(stored.body, b"good");
    }
}

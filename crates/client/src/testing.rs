//! Scripted network double for strategy and lifecycle tests.

use crate::fetch::Fetcher;
use crate::request::Request;
use async_trait::async_trait;
use fallow_core::{Error, ResponseSnapshot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
struct Reply {
    delay: Duration,
    response: Option<ResponseSnapshot>,
}

/// Answers each URL from a script and counts every call.
///
/// URLs without a script fail like an unreachable host.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    total: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reply(&self, url: &str, response: ResponseSnapshot) {
        self.script(url, Reply { delay: Duration::ZERO, response: Some(response) });
    }

    pub(crate) fn reply_after(&self, url: &str, delay: Duration, response: ResponseSnapshot) {
        self.script(url, Reply { delay, response: Some(response) });
    }

    pub(crate) fn fail(&self, url: &str) {
        self.script(url, Reply { delay: Duration::ZERO, response: None });
    }

    fn script(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub(crate) fn calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request, timeout: Duration) -> Result<ResponseSnapshot, Error> {
        let url = request.url.to_string();
        self.total.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(url.clone());

        let reply = self.replies.lock().unwrap().get(&url).cloned();
        let Some(reply) = reply else {
            return Err(Error::HttpError(format!("{url}: connection refused")));
        };

        if reply.delay >= timeout {
            tokio::time::sleep(timeout).await;
            return Err(Error::FetchTimeout(url));
        }
        tokio::time::sleep(reply.delay).await;

        reply.response.ok_or_else(|| Error::HttpError(format!("{url}: connection reset")))
    }
}

pub(crate) fn ok(body: &str) -> ResponseSnapshot {
    status(200, body)
}

pub(crate) fn status(code: u16, body: &str) -> ResponseSnapshot {
    ResponseSnapshot::new(
        code,
        vec![
            ("content-type".into(), "text/plain".into()),
            ("date".into(), fallow_core::cache::response::format_http_date(chrono::Utc::now())),
        ],
        body,
    )
}

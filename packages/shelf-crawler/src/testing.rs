//! Testing utilities including mock implementations.
//!
//! Useful for exercising the pipeline without network or database access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{CrawlError, CrawlResult, StoreError, StoreResult};
use crate::traits::fetcher::{FetchedPage, Fetcher};
use crate::traits::store::BatchStore;
use crate::types::batch::{Batch, BatchStatus, KeyValueRow};

/// Canned behaviour for one URL.
#[derive(Debug, Clone)]
enum MockResponse {
    Page { status: u16, body: String },
    Timeout,
    Transport(String),
}

/// A mock fetcher with canned responses per URL.
///
/// Unknown URLs answer 404 with an empty body. Every call is recorded, so
/// tests can assert on exactly which URLs were requested.
#[derive(Default, Clone)]
pub struct MockFetcher {
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    calls: Arc<RwLock<Vec<(String, Option<Duration>)>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with 200 and `body`.
    pub fn with_body(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_status(url, 200, body)
    }

    /// Answer `url` with `status` and `body`.
    pub fn with_status(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.set(url, MockResponse::Page { status, body: body.into() });
        self
    }

    /// Make `url` time out.
    pub fn with_timeout(self, url: impl Into<String>) -> Self {
        self.set(url, MockResponse::Timeout);
        self
    }

    /// Make `url` fail with a transport error.
    pub fn with_transport_error(self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.set(url, MockResponse::Transport(message.into()));
        self
    }

    /// Replace the canned response for `url` with a 200 page.
    pub fn set_body(&self, url: impl Into<String>, body: impl Into<String>) {
        self.set(url, MockResponse::Page { status: 200, body: body.into() });
    }

    fn set(&self, url: impl Into<String>, response: MockResponse) {
        self.responses.write().unwrap().insert(url.into(), response);
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    /// Timeouts passed with each call, in order.
    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.calls.read().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get(&self, url: &str, timeout: Option<Duration>) -> CrawlResult<FetchedPage> {
        self.calls.write().unwrap().push((url.to_string(), timeout));

        let response = self.responses.read().unwrap().get(url).cloned();
        match response {
            Some(MockResponse::Page { status, body }) => Ok(FetchedPage::new(url, status, body)),
            Some(MockResponse::Timeout) => Err(CrawlError::Timeout {
                url: url.to_string(),
            }),
            Some(MockResponse::Transport(message)) => Err(CrawlError::Http(message.into())),
            None => Ok(FetchedPage::new(url, 404, "")),
        }
    }
}

/// Render a detail page the way the site does.
pub fn game_page(name: &str, locations: &[(&str, &str)]) -> String {
    let entries: String = locations
        .iter()
        .map(|(store, locale)| format!("<dt>{store}</dt><dd>{locale}</dd>"))
        .collect();

    format!(
        "<!DOCTYPE html><html><head><title>{name}</title></head><body>\
         <header><h1>Shelf</h1></header>\
         <article class=\"game\"><h1> {name} </h1>\
         <table><tr><th>Players</th><td>2-4</td></tr>\
         <tr><th>Location</th><td><dl>{entries}</dl></td></tr></table>\
         </article></body></html>"
    )
}

/// A store wrapper that fails the `n`th chunk write (0-based).
///
/// Everything else is delegated to the inner store.
pub struct FailingStore<S: BatchStore> {
    inner: S,
    fail_at: usize,
    chunk_calls: AtomicUsize,
}

impl<S: BatchStore> FailingStore<S> {
    pub fn new(inner: S, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            chunk_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Chunk writes attempted, including the failed one.
    pub fn chunk_calls(&self) -> usize {
        self.chunk_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: BatchStore> BatchStore for FailingStore<S> {
    async fn ensure_schema(&self) -> StoreResult<()> {
        self.inner.ensure_schema().await
    }

    async fn open_batch(&self, batch_type: &str) -> StoreResult<i64> {
        self.inner.open_batch(batch_type).await
    }

    async fn write_chunk(&self, rows: &[KeyValueRow]) -> StoreResult<()> {
        let call = self.chunk_calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_at {
            return Err(StoreError::Statement(format!("injected failure on chunk {call}")));
        }
        self.inner.write_chunk(rows).await
    }

    async fn set_batch_status(&self, batch_id: i64, status: BatchStatus) -> StoreResult<()> {
        self.inner.set_batch_status(batch_id, status).await
    }

    async fn latest_batch(
        &self,
        batch_type: &str,
        status: BatchStatus,
    ) -> StoreResult<Option<Batch>> {
        self.inner.latest_batch(batch_type, status).await
    }

    async fn batch_values(&self, batch_id: i64) -> StoreResult<Vec<String>> {
        self.inner.batch_values(batch_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetcher_records_calls() {
        let fetcher = MockFetcher::new()
            .with_body("https://site/a", "A")
            .with_timeout("https://site/b");

        let a = fetcher.get("https://site/a", None).await.unwrap();
        assert_eq!(a.body, "A");
        assert!(fetcher.get("https://site/b", None).await.unwrap_err().is_timeout());
        assert_eq!(fetcher.get("https://site/c", None).await.unwrap().status, 404);

        assert_eq!(
            fetcher.calls(),
            vec!["https://site/a", "https://site/b", "https://site/c"]
        );
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let fetcher = MockFetcher::new();
        let clone = fetcher.clone();
        clone.set_body("https://site/a", "A");

        fetcher.get("https://site/a", None).await.unwrap();
        assert_eq!(clone.call_count(), 1);
    }
}

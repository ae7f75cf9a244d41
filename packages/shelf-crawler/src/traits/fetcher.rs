//! Fetcher trait for HTTP GETs.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CrawlResult;

/// A fetched response: final status plus body text.
///
/// Non-200 statuses are returned, not raised, so each caller decides what a
/// bad status means (the sitemap lister ignores it, the extractor does not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// A 200 response.
    pub fn ok(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(url, 200, body)
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Performs HTTP GETs.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`. A request exceeding `timeout` fails with
    /// [`CrawlError::Timeout`](crate::error::CrawlError::Timeout).
    async fn get(&self, url: &str, timeout: Option<Duration>) -> CrawlResult<FetchedPage>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    async fn get(&self, url: &str, timeout: Option<Duration>) -> CrawlResult<FetchedPage> {
        (**self).get(url, timeout).await
    }
}

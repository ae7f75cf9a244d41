//! HTTP fetcher backed by reqwest.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CrawlError, CrawlResult};
use crate::traits::fetcher::{FetchedPage, Fetcher};

/// Fetches pages over HTTP.
///
/// Per-request timeouts override the client default, so detail pages can use
/// a short timeout while sitemap pages use the client's.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher with a 30 second default timeout.
    pub fn new() -> CrawlResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CrawlError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            user_agent: "ShelfCrawler/1.0".to_string(),
        })
    }

    fn map_error(url: &str, err: reqwest::Error) -> CrawlError {
        if err.is_timeout() {
            CrawlError::Timeout {
                url: url.to_string(),
            }
        } else {
            CrawlError::Http(Box::new(err))
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, timeout: Option<Duration>) -> CrawlResult<FetchedPage> {
        debug!(url = %url, "HTTP fetch starting");

        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            Self::map_error(url, e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| Self::map_error(url, e))?;

        Ok(FetchedPage::new(url, status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/games/azul/")
    }

    #[tokio::test]
    async fn test_returns_status_and_body() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\nConnection: close\r\n\r\nnope",
        )
        .await;

        let page = HttpFetcher::new().unwrap().get(&url, None).await.unwrap();
        assert_eq!(page.status, 404);
        assert_eq!(page.body, "nope");
        assert!(!page.is_ok());
    }

    #[tokio::test]
    async fn test_slow_server_is_a_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let url = format!("http://{addr}/games/slow/");
        let err = HttpFetcher::new()
            .unwrap()
            .get(&url, Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }
}

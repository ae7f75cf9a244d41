//! Sitemap pagination.
//!
//! The site publishes its game index as numbered XML pages:
//! `{base}1.xml`, `{base}2.xml`, ... The first page that is not well-formed
//! XML marks the end of the index.

use tracing::info;

use crate::error::{Error, Result};
use crate::traits::fetcher::Fetcher;

/// Walks the numbered sitemap pages and collects detail-page URLs.
pub struct SitemapLister<F: Fetcher> {
    fetcher: F,
    base_url: String,
    start_page: u32,
}

impl<F: Fetcher> SitemapLister<F> {
    /// Create a lister starting at page 1.
    pub fn new(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            start_page: 1,
        }
    }

    /// Start at a different page index.
    pub fn with_start_page(mut self, page: u32) -> Self {
        self.start_page = page;
        self
    }

    /// URL of sitemap page `page`.
    pub fn page_url(&self, page: u32) -> String {
        format!("{}{}.xml", self.base_url, page)
    }

    /// Fetch pages until one fails to parse, returning every URL in order.
    ///
    /// A network failure aborts listing; nothing gathered so far is returned.
    pub async fn list_urls(&self) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        let mut page = self.start_page;

        loop {
            let response = self
                .fetcher
                .get(&self.page_url(page), None)
                .await
                .map_err(|source| Error::Listing { page, source })?;

            let Some(page_urls) = parse_sitemap(&response.body) else {
                info!(page, "Got error on page, probably no more pages");
                break;
            };

            info!(page, count = page_urls.len(), "Got sitemap page");
            urls.extend(page_urls);
            page += 1;
        }

        info!(total = urls.len(), "Listed game URLs");
        Ok(urls)
    }
}

/// Extract URLs from one sitemap page.
///
/// Takes the text of every element nested one level inside each top-level
/// entry (`<urlset><url><loc>..</loc></url></urlset>`). Returns `None` when
/// the document is not well-formed XML.
pub fn parse_sitemap(xml: &str) -> Option<Vec<String>> {
    let doc = roxmltree::Document::parse(xml).ok()?;

    let urls = doc
        .root_element()
        .children()
        .filter(|entry| entry.is_element())
        .flat_map(|entry| entry.children().filter(|node| node.is_element()))
        .filter_map(|node| node.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
        .collect();

    Some(urls)
}

//! Detail page extraction.
//!
//! A game page has one `<article>` holding an `<h1>` with the game name and a
//! table row labelled `Location` whose cell holds a `<dl>` of store / shelf
//! pairs:
//!
//! ```html
//! <article>
//!   <h1> Azul </h1>
//!   <table>
//!     <tr><th>Location</th><td><dl><dt>Vesterbro</dt><dd>B3</dd></dl></td></tr>
//!   </table>
//! </article>
//! ```

use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::error::{CrawlError, CrawlResult};
use crate::traits::fetcher::Fetcher;
use crate::types::game::{GameRecord, Location};

/// Fetches a detail page and turns it into a [`GameRecord`].
pub struct PageExtractor<F: Fetcher> {
    fetcher: F,
    timeout: Duration,
}

impl<F: Fetcher> PageExtractor<F> {
    /// Create an extractor with the default 2 second timeout.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            timeout: Duration::from_secs(2),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch `url` and extract its record.
    pub async fn extract(&self, url: &str) -> CrawlResult<GameRecord> {
        let page = self.fetcher.get(url, Some(self.timeout)).await?;
        if !page.is_ok() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: page.status,
            });
        }
        parse_game_page(url, &page.body)
    }
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

fn missing(url: &str, what: &str) -> CrawlError {
    CrawlError::Extraction {
        url: url.to_string(),
        missing: what.to_string(),
    }
}

/// Next sibling element with the given tag name.
fn next_sibling_named<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == name)
}

/// Parse a detail page body. Pure, so it can run on stored markup too.
pub fn parse_game_page(url: &str, html: &str) -> CrawlResult<GameRecord> {
    let document = Html::parse_document(html);

    let location_header = document
        .select(&selector("th"))
        .find(|th| th.text().collect::<String>().trim() == "Location")
        .ok_or_else(|| missing(url, "Location row"))?;

    let cell = next_sibling_named(location_header, "td")
        .ok_or_else(|| missing(url, "Location cell"))?;

    let list = cell
        .select(&selector("dl"))
        .next()
        .ok_or_else(|| missing(url, "Location list"))?;

    let mut locations = Vec::new();
    for term in list.select(&selector("dt")) {
        let description =
            next_sibling_named(term, "dd").ok_or_else(|| missing(url, "Location locale"))?;
        locations.push(Location::new(
            term.text().collect::<String>(),
            description.text().collect::<String>(),
        ));
    }

    let article = document
        .select(&selector("article"))
        .next()
        .ok_or_else(|| missing(url, "article"))?;

    let name = article
        .select(&selector("h1"))
        .next()
        .ok_or_else(|| missing(url, "article heading"))?
        .text()
        .collect::<String>()
        .trim()
        .to_string();

    let mut game = GameRecord::new(url, name).with_raw(article.html());
    game.locations = locations;
    Ok(game)
}

//! Cursor-following accumulation of every page in the listing.
//!
//! Pages are fetched strictly one after another because each URL is only
//! known once the previous page has been decoded. Results are appended in
//! arrival order with no dedup and no sorting. Any page failure aborts the
//! run and the partial list is dropped.

use tracing::{debug, info, warn};
use url::Url;

use crate::client::PageFetcher;
use crate::error::FetchError;
use crate::http::Transport;
use crate::types::Character;

/// Default cap on the number of pages followed in one run.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Drives a `PageFetcher` across a cursor chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    max_pages: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGES)
    }
}

impl Paginator {
    /// A chain longer than `max_pages` fails with `FetchError::TooManyPages`.
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Fetch `start_url` and every page its cursors lead to.
    pub fn collect<T: Transport>(
        &self,
        fetcher: &PageFetcher<T>,
        start_url: &str,
    ) -> Result<Vec<Character>, FetchError> {
        Url::parse(start_url).map_err(|e| FetchError::InvalidUrl(format!("{start_url}: {e}")))?;

        let mut characters = Vec::new();
        let mut url = start_url.to_string();
        let mut page_number = 0;
        loop {
            if page_number == self.max_pages {
                warn!(limit = self.max_pages, "pagination cap reached, abandoning load");
                return Err(FetchError::TooManyPages {
                    limit: self.max_pages,
                });
            }
            page_number += 1;

            let page = fetcher.fetch(&url, page_number)?;
            debug!(page = page_number, %url, results = page.results.len(), "fetched page");
            let next = page.info.next;
            characters.extend(page.results);

            match next.as_deref().and_then(usable_cursor) {
                Some(cursor) => url = cursor,
                None => {
                    if let Some(raw) = next {
                        warn!(cursor = %raw, "unusable next cursor, stopping pagination");
                    }
                    info!(pages = page_number, characters = characters.len(), "pagination complete");
                    return Ok(characters);
                }
            }
        }
    }
}

/// A cursor is followed only if it is non-empty and parses as an absolute URL.
fn usable_cursor(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Url::parse(trimmed).ok().map(|_| trimmed.to_string())
}

//! Stateless HTTP request builder and response parser for the character API.
//!
//! # Design
//! `CharacterClient` holds only a `base_url` and carries no mutable state
//! between calls. Building a page request and parsing a page response are
//! separate steps; `PageFetcher` joins them around a `Transport`.

use crate::error::FetchError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::Page;

/// Public endpoint root of the character API.
pub const DEFAULT_BASE_URL: &str = "https://rickandmortyapi.com/api";

/// Synchronous, stateless client for the character listing.
#[derive(Debug, Clone)]
pub struct CharacterClient {
    base_url: String,
}

impl CharacterClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the first page of the character listing.
    pub fn first_page_url(&self) -> String {
        format!("{}/character", self.base_url)
    }

    pub fn build_first_page(&self) -> HttpRequest {
        self.build_page(&self.first_page_url())
    }

    /// Build a request for an arbitrary page URL, usually a `next` cursor.
    pub fn build_page(&self, url: &str) -> HttpRequest {
        HttpRequest {
            url: url.to_string(),
            headers: vec![("accept".to_string(), "application/json".to_string())],
        }
    }

    /// Parse one page envelope. `page_number` is 1-based and only used to
    /// label decode failures.
    pub fn parse_page(&self, response: HttpResponse, page_number: usize) -> Result<Page, FetchError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Err(FetchError::NoData);
        }
        serde_json::from_str(&response.body).map_err(|e| FetchError::Decode {
            page: page_number,
            detail: e.to_string(),
        })
    }
}

fn check_status(response: &HttpResponse) -> Result<(), FetchError> {
    if response.status == 200 {
        return Ok(());
    }
    Err(FetchError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Performs one request and decodes one page.
///
/// No retries: a failure here ends the whole pagination run.
#[derive(Debug, Clone)]
pub struct PageFetcher<T> {
    client: CharacterClient,
    transport: T,
}

impl<T: Transport> PageFetcher<T> {
    pub fn new(client: CharacterClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &CharacterClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn fetch(&self, url: &str, page_number: usize) -> Result<Page, FetchError> {
        let request = self.client.build_page(url);
        let response = self.transport.execute(&request)?;
        self.client.parse_page(response, page_number)
    }
}

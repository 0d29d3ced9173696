//! `Transport` implementations.
//!
//! `UreqTransport` talks to the network with a blocking `ureq` agent.
//! `FixtureTransport` serves canned responses keyed by URL, which is what
//! the unit tests, the test vectors and offline demos run against.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::error::FetchError;
use crate::http::{HttpRequest, HttpResponse, Transport};

/// Blocking HTTP transport backed by `ureq`.
///
/// Status codes are returned as data rather than errors, so 4xx/5xx
/// responses reach `CharacterClient::parse_page` intact.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Build a transport. `timeout` of `None` keeps ureq's own defaults.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self.agent.get(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        let mut response = builder.call().map_err(map_ureq_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(map_ureq_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_ureq_error(err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::BadUri(detail) => FetchError::InvalidUrl(detail),
        other => FetchError::Transport(other.to_string()),
    }
}

/// Serves canned responses keyed by exact URL and records every request.
///
/// URLs without a fixture get the same 404 body the live API sends past the
/// last page.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    routes: HashMap<String, Result<HttpResponse, FetchError>>,
    requested: Mutex<Vec<String>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response`.
    pub fn respond(mut self, url: impl Into<String>, response: HttpResponse) -> Self {
        self.routes.insert(url.into(), Ok(response));
        self
    }

    /// Fail `url` at the transport level with `error`.
    pub fn fail(mut self, url: impl Into<String>, error: FetchError) -> Self {
        self.routes.insert(url.into(), Err(error));
        self
    }

    /// URLs requested so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transport for FixtureTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.url.clone());
        match self.routes.get(&request.url) {
            Some(outcome) => outcome.clone(),
            None => Ok(HttpResponse::with_status(
                404,
                r#"{"error":"There is nothing here"}"#,
            )),
        }
    }
}

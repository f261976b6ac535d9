//! Tempo REST API collaborator.
//!
//! [`WorklogSource`] is the seam the pipeline pulls raw records through;
//! [`TempoClient`] implements it against the Tempo v4 `GET /worklogs`
//! endpoint with bearer auth and offset/limit pagination. Pages are
//! fetched lazily: each pull on the returned iterator may trigger the
//! next page request. Transient-failure retry policy is deliberately not
//! handled here; a failed request fails the run.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use log::debug;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::{error::ExtractError, window::SyncWindow};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_LIMIT: usize = 200;

/// Lazy, fallible raw record sequence produced by a fetch.
pub type RawRecordStream = Box<dyn Iterator<Item = Result<Value>>>;

pub trait WorklogSource {
    fn fetch_worklogs(&self, window: &SyncWindow) -> Result<RawRecordStream>;
}

#[derive(Debug, Clone)]
pub struct TempoClient {
    http: Client,
    base_url: String,
    token: String,
}

impl TempoClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Building HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn fetch_page(&self, url: &str, query: &[(String, String)]) -> Result<Page> {
        debug!("GET {url} with {} query parameter(s)", query.len());
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .map_err(|err| ExtractError::upstream(format!("API request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractError::upstream(format!(
                "API call returned status {status}: {}",
                body.chars().take(200).collect::<String>()
            ))
            .into());
        }

        let body: Value = response
            .json()
            .map_err(|err| ExtractError::upstream(format!("API response is not JSON: {err}")))?;
        parse_page(body)
    }
}

impl WorklogSource for TempoClient {
    fn fetch_worklogs(&self, window: &SyncWindow) -> Result<RawRecordStream> {
        let request = PageRequest::Initial {
            url: format!("{}/worklogs", self.base_url),
            query: window_query(window),
        };
        Ok(Box::new(WorklogPages {
            client: self.clone(),
            next: Some(request),
            current: Vec::new().into_iter(),
        }))
    }
}

#[derive(Debug)]
struct Page {
    results: Vec<Value>,
    next: Option<String>,
}

enum PageRequest {
    Initial { url: String, query: Vec<(String, String)> },
    Follow(String),
}

struct WorklogPages {
    client: TempoClient,
    next: Option<PageRequest>,
    current: std::vec::IntoIter<Value>,
}

impl Iterator for WorklogPages {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.current.next() {
                return Some(Ok(record));
            }
            let request = self.next.take()?;
            let page = match request {
                PageRequest::Initial { url, query } => self.client.fetch_page(&url, &query),
                PageRequest::Follow(url) => self.client.fetch_page(&url, &[]),
            };
            match page {
                Ok(page) => {
                    self.current = page.results.into_iter();
                    self.next = page.next.map(PageRequest::Follow);
                }
                // The request slot is already cleared, so the stream ends
                // after yielding the failure.
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Split a response body into its record page and pagination link.
///
/// Anything without a `results` array is an upstream contract violation
/// and is never silently coerced.
fn parse_page(body: Value) -> Result<Page> {
    let Some(results) = body.get("results") else {
        return Err(ExtractError::upstream(format!(
            "API call returned unexpected response: {body}"
        ))
        .into());
    };
    let Value::Array(results) = results.clone() else {
        return Err(ExtractError::upstream(format!(
            "API call returned a non-sequence 'results' member: {results}"
        ))
        .into());
    };
    let next = body
        .get("metadata")
        .and_then(|meta| meta.get("next"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(Page { results, next })
}

fn window_query(window: &SyncWindow) -> Vec<(String, String)> {
    let mut query = vec![("limit".to_string(), PAGE_LIMIT.to_string())];
    if let Some(from) = window.date_from {
        query.push(("from".to_string(), from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = window.date_to {
        query.push(("to".to_string(), to.format("%Y-%m-%d").to_string()));
    }
    if let Some(updated) = window.updated_from {
        query.push((
            "updatedFrom".to_string(),
            updated.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }
    query
}

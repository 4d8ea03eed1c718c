//! HTTP fetcher for the order and inventory endpoints.
//!
//! Each endpoint returns a JSON array of objects. Requests are retried with a
//! fixed delay on network errors, timeouts and non-2xx statuses; a 2xx body
//! that does not decode is reported immediately.

use reqwest::blocking::Client;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::retry::{AttemptError, RetryPolicy};

/// One untyped API item: field name to raw JSON value.
pub type RawRecord = Map<String, Value>;

/// Anything that can produce raw records for an endpoint.
pub trait RecordSource {
    fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawRecord>>;
}

/// Blocking HTTP fetcher with bounded retries.
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client, policy })
    }

    fn attempt(&self, endpoint: &str) -> std::result::Result<Vec<RawRecord>, AttemptError> {
        let resp = self
            .client
            .get(endpoint)
            .send()
            .map_err(|e| AttemptError::Transient(describe_request_error(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AttemptError::Transient(format!("HTTP status {}", status)));
        }

        let body = resp
            .text()
            .map_err(|e| AttemptError::Transient(format!("failed to read body: {}", e)))?;
        decode_records(&body).map_err(AttemptError::Fatal)
    }
}

impl RecordSource for HttpFetcher {
    fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawRecord>> {
        let records = self
            .policy
            .run(endpoint, |_| self.attempt(endpoint))
            .map_err(|exhausted| SyncError::Fetch {
                endpoint: endpoint.to_string(),
                attempts: exhausted.attempts,
                last_error: exhausted.last_error.to_string(),
            })?;
        tracing::info!("Fetched {} records from {}", records.len(), endpoint);
        Ok(records)
    }
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Decode a response body into raw records.
///
/// The body must be a JSON array. Elements that are not objects become empty
/// records so the result keeps one entry per array element.
pub fn decode_records(body: &str) -> std::result::Result<Vec<RawRecord>, String> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("failed to parse JSON response: {}", e))?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(format!(
                "expected a JSON array of records, got {}",
                json_kind(&other)
            ))
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => map,
            other => {
                tracing::warn!(
                    "Record {} is {} rather than an object; treating it as empty",
                    index,
                    json_kind(&other)
                );
                Map::new()
            }
        })
        .collect())
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

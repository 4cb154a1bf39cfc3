//! Blocking HTTP client for *arr-style service APIs.
//!
//! Speaks JSON against `/api/v1/...` endpoints with `X-Api-Key`
//! authentication. Raw `serde_json::Value` in and out; decoding into
//! domain types is the caller's concern.

use crate::error::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one *arr instance.
pub struct ArrClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl ArrClient {
    /// Create a client for the instance at `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Base URL of the instance this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for an API path like `api/v1/tag`.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a JSON document.
    pub fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.url(path);
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .call()
            .map_err(|e| Error::Network {
                message: e.to_string(),
            })?;
        Self::read_json(path, response)
    }

    /// POST a JSON document, returning the created representation.
    pub fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path);
        log::debug!("POST {url}");
        let response = self
            .agent
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .send_json(body)
            .map_err(|e| Error::Network {
                message: e.to_string(),
            })?;
        Self::read_json(path, response)
    }

    /// PUT a JSON document, returning the updated representation.
    pub fn put_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path);
        log::debug!("PUT {url}");
        let response = self
            .agent
            .put(&url)
            .header("X-Api-Key", &self.api_key)
            .send_json(body)
            .map_err(|e| Error::Network {
                message: e.to_string(),
            })?;
        Self::read_json(path, response)
    }

    /// DELETE a resource.
    pub fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        log::debug!("DELETE {url}");
        let mut response = self
            .agent
            .delete(&url)
            .header("X-Api-Key", &self.api_key)
            .call()
            .map_err(|e| Error::Network {
                message: e.to_string(),
            })?;
        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            Ok(())
        } else {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            Err(Error::from_status(status, path, &body))
        }
    }

    /// Read a response body as JSON, mapping non-success statuses to
    /// categorized errors. Empty success bodies read as `null`.
    fn read_json(path: &str, mut response: ureq::http::Response<ureq::Body>) -> Result<Value> {
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::Network {
                message: e.to_string(),
            })?;
        if !(200..300).contains(&status) {
            return Err(Error::from_status(status, path, &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| Error::InvalidResponse {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

//! API key discovery via the instance bootstrap script.
//!
//! *arr web UIs bootstrap from an `initialize.js` resource of the form
//! `window.Prowlarr = { ... "apiKey": "...", ... };`. When a
//! configuration document carries no API key, the key is extracted from
//! that script instead.

use crate::error::{Error, Result};
use regex::Regex;
use std::time::Duration;

/// Pattern matching the bootstrap assignment and capturing its object.
const INITIALIZE_JS_PATTERN: &str = r"(?s)window\.\w+\s*=\s*(\{.*\});";

/// Pattern capturing the API key inside the bootstrap object. Keys are
/// 32 hex characters; the surrounding script may quote names with
/// either quote style, or not at all.
const API_KEY_PATTERN: &str = r#"["']?apiKey["']?\s*:\s*["']([0-9a-fA-F]{32})["']"#;

/// Fetch `initialize.js` from an instance and extract the API key.
pub fn probe_api_key(host_url: &str, timeout: Duration) -> Result<String> {
    let url = format!("{}/initialize.js", host_url.trim_end_matches('/'));
    log::debug!("GET {url}");

    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    let agent = ureq::Agent::new_with_config(config);

    let mut response = agent.get(&url).call().map_err(|e| Error::Network {
        message: e.to_string(),
    })?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| Error::Network {
            message: e.to_string(),
        })?;
    if !(200..300).contains(&status) {
        return Err(Error::from_status(status, "initialize.js", &body));
    }

    extract_api_key(&body)
}

/// Extract the API key from an `initialize.js` body.
pub fn extract_api_key(body: &str) -> Result<String> {
    let object_re = Regex::new(INITIALIZE_JS_PATTERN).expect("valid pattern");
    let object = object_re
        .captures(body)
        .and_then(|caps| caps.get(1))
        .ok_or(Error::ApiKeyNotFound)?;

    let key_re = Regex::new(API_KEY_PATTERN).expect("valid pattern");
    key_re
        .captures(object.as_str())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(Error::ApiKeyNotFound)
}

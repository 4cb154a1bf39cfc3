//! Error types for *arr API operations.
//!
//! Errors are categorized so callers can tell transient transport
//! failures (worth an external retry) from structural rejections the
//! remote returned deliberately (surfaced to the user verbatim).

use thiserror::Error;

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection-level failure: DNS, refused, timeout, TLS.
    Network,
    /// Server-side failure (HTTP 5xx).
    Server,
    /// Authentication failure (HTTP 401/403).
    Auth,
    /// Resource or endpoint not found (HTTP 404).
    NotFound,
    /// The remote rejected the request body (HTTP 400/422).
    Rejected,
    /// Anything else.
    Other,
}

impl ErrorCategory {
    /// Whether this category is typically transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }
}

/// Errors that can occur talking to an *arr instance.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection-level error (DNS, refused, timeout, TLS)
    #[error("network error: {message}")]
    Network { message: String },

    /// The instance rejected the API key
    #[error("authentication failed (HTTP {status}): check the API key")]
    Auth { status: u16 },

    /// Endpoint or resource does not exist
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Validation failure returned by the remote
    #[error("rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Server-side failure
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Response body could not be parsed
    #[error("invalid response from {path}: {message}")]
    InvalidResponse { path: String, message: String },

    /// initialize.js did not contain an API key
    #[error("no API key found in initialize.js response")]
    ApiKeyNotFound,
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::Auth { .. } => ErrorCategory::Auth,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Rejected { .. } => ErrorCategory::Rejected,
            Error::Server { .. } => ErrorCategory::Server,
            Error::InvalidResponse { .. } | Error::ApiKeyNotFound => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }

    /// Build an error from a non-success HTTP status and response body.
    ///
    /// The *arr family returns validation failures as a JSON array of
    /// `{propertyName, errorMessage}` objects; those are flattened into
    /// a readable message.
    pub fn from_status(status: u16, path: &str, body: &str) -> Self {
        match status {
            401 | 403 => Error::Auth { status },
            404 => Error::NotFound {
                path: path.to_string(),
            },
            400 | 409 | 422 => Error::Rejected {
                status,
                message: extract_message(body),
            },
            500..=599 => Error::Server {
                status,
                message: extract_message(body),
            },
            _ => Error::Rejected {
                status,
                message: extract_message(body),
            },
        }
    }
}

/// Pull a human-readable message out of an error response body.
fn extract_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "(no response body)".to_string();
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let message = item.get("errorMessage")?.as_str()?;
                    match item.get("propertyName").and_then(|p| p.as_str()) {
                        Some(property) => Some(format!("{property}: {message}")),
                        None => Some(message.to_string()),
                    }
                })
                .collect();
            if messages.is_empty() {
                trimmed.to_string()
            } else {
                messages.join("; ")
            }
        }
        Ok(serde_json::Value::Object(obj)) => obj
            .get("message")
            .or_else(|| obj.get("error"))
            .and_then(|m| m.as_str())
            .map(ToString::to_string)
            .unwrap_or_else(|| trimmed.to_string()),
        _ => trimmed.to_string(),
    }
}

/// Result type for *arr API operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_transience() {
        assert!(ErrorCategory::Network.is_transient());
        assert!(ErrorCategory::Server.is_transient());
        assert!(!ErrorCategory::Rejected.is_transient());
        assert!(!ErrorCategory::Auth.is_transient());
    }

    #[test]
    fn test_from_status_auth() {
        let err = Error::from_status(401, "api/v1/tag", "");
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_from_status_server_is_transient() {
        let err = Error::from_status(503, "api/v1/indexer", "");
        assert!(err.is_transient());
    }

    #[test]
    fn test_extract_validation_messages() {
        let body = r#"[{"propertyName":"Name","errorMessage":"Should be unique"}]"#;
        let err = Error::from_status(400, "api/v1/appprofile", body);
        match err {
            Error::Rejected { message, .. } => {
                assert_eq!(message, "Name: Should be unique");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_message_object() {
        let body = r#"{"message":"API key required"}"#;
        assert_eq!(extract_message(body), "API key required");
    }

    #[test]
    fn test_extract_message_plain() {
        assert_eq!(extract_message("boom"), "boom");
        assert_eq!(extract_message(""), "(no response body)");
    }
}

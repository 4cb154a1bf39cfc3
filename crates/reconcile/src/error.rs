//! Error types for the reconciliation engine.
//!
//! Field-level failures (`TypeMismatch`) are collected into the plan
//! report rather than aborting a whole plan; resource-level failures
//! (`SchemaMismatch`) abort only that resource. Remote failures carry
//! their own taxonomy in [`RemoteError`] so callers can distinguish
//! transient transport problems from structural rejections.

use thiserror::Error;

/// Errors raised by the remote API client boundary.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Transient, connection-level failure. Eligible for caller-level
    /// retry; never retried inside the engine.
    #[error("remote unavailable: {message}")]
    Unavailable { message: String },

    /// Structural failure: the remote rejected the request with a
    /// validation error. Surfaced verbatim, not retried.
    #[error("remote rejected request: {message}")]
    Rejected {
        message: String,
        status: Option<u16>,
    },
}

impl RemoteError {
    /// Whether this failure is transient and worth an external retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Errors raised by the reconciliation engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Two resources of different shapes were diffed.
    #[error("schema mismatch: cannot diff '{local}' against '{remote}'")]
    SchemaMismatch { local: String, remote: String },

    /// A local and remote value could not be coerced to the same
    /// comparable type.
    #[error("type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A collection already contains an entry under this key.
    #[error("duplicate entry '{key}'")]
    DuplicateKey { key: String },

    /// A section name not present in the schema registry.
    #[error("unknown section '{0}'")]
    UnknownSection(String),

    /// Error from the remote API client.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Post-apply verification found residual changes. Never retried
    /// automatically.
    #[error("remote did not converge: {remaining} operation(s) still pending after apply")]
    ConvergenceFailure { remaining: usize },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

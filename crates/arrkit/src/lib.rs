//! # arrkit
//!
//! Minimal blocking HTTP client for *arr-style service APIs
//! (Prowlarr and compatible indexer managers).
//!
//! The client deals in raw JSON: callers get `serde_json::Value`
//! documents back and decide how to decode them. What this crate does
//! own is transport (timeouts, authentication headers) and the error
//! taxonomy separating transient failures from deliberate rejections.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::probe_api_key;
pub use client::{ArrClient, DEFAULT_TIMEOUT};
pub use error::{Error, ErrorCategory, Result};

//! Upstream abstraction for the OpenAI-compatible API being fronted
//!
//! The router only talks to the upstream through the [`Upstream`] trait so the
//! HTTP client can be replaced in tests.

use async_trait::async_trait;
use axum::body::Bytes;
use futures::stream::Stream;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Error types for upstream operations
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Request timeout")]
    Timeout,

    #[error("Upstream stream idle for {}s", .0.as_secs())]
    IdleTimeout(Duration),

    #[error("{0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {body}")]
    Parse { body: String },
}

impl UpstreamError {
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Transport(error.to_string())
        }
    }
}

/// Live byte-chunk source from a streaming upstream response
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamError>> + Send>>;

/// A successful buffered upstream response
#[derive(Debug, Clone)]
pub struct JsonReply {
    /// Parsed body
    pub value: Value,
    /// Body exactly as upstream sent it
    pub raw: Bytes,
}

/// A streaming upstream response whose headers have arrived
pub struct StreamingReply {
    /// Upstream status, always in the 2xx range
    pub status: StatusCode,
    pub body: ByteStream,
}

/// Trait for the upstream API
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Perform a buffered call to `path` below the base URL and parse the JSON body
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Bytes>,
    ) -> Result<JsonReply, UpstreamError>;

    /// POST `body` to `path` and return as soon as upstream headers arrive
    async fn open_stream(&self, path: &str, body: Bytes) -> Result<StreamingReply, UpstreamError>;
}

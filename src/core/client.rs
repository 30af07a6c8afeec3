//! HTTP client for the OpenAI-compatible upstream
//!
//! Every call carries `Authorization: Bearer <key>` and a JSON content type.
//! Buffered calls are bounded by the configured request timeout; streaming
//! calls are only bounded by the idle timeout while waiting for headers, the
//! body is policed chunk by chunk by the caller.

use crate::core::config::ServerConfig;
use crate::core::upstream::{JsonReply, StreamingReply, Upstream, UpstreamError};
use async_trait::async_trait;
use axum::body::Bytes;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Upstream client bound to one base URL and API key
pub struct UpstreamClient {
    client: Client,
    api_key: String,
    base_url: Url,
    request_timeout: Duration,
    stream_idle_timeout: Option<Duration>,
}

impl UpstreamClient {
    /// Create a new upstream client from the server configuration
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] if the TLS backend cannot be initialised.
    pub fn new(config: &ServerConfig) -> Result<Self, UpstreamError> {
        // No client-wide timeout: streams may legitimately outlive any fixed bound.
        let client = Client::builder()
            .build()
            .map_err(|e| UpstreamError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            request_timeout: config.request_timeout,
            stream_idle_timeout: config.stream_idle_timeout,
        })
    }

    /// Full URL for an endpoint below the base URL
    pub fn endpoint_url(&self, path: &str) -> Url {
        join_endpoint(&self.base_url, path)
    }

    fn build(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.endpoint_url(path))
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
    }

    /// Read a failed response into a [`UpstreamError::Status`]
    async fn status_error(response: Response, limit: Duration) -> UpstreamError {
        let status = response.status().as_u16();
        let body = match tokio::time::timeout(limit, response.text()).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Failed to read upstream error body: {}", e);
                String::new()
            }
            Err(_) => String::new(),
        };
        UpstreamError::Status { status, body }
    }
}

/// Append `endpoint` to the path of `base` with exactly one separating slash
///
/// The query string of `base`, if any, is kept.
pub fn join_endpoint(base: &Url, endpoint: &str) -> Url {
    let prefix = base.path().trim_end_matches('/');
    let suffix = endpoint.trim_start_matches('/');
    let mut url = base.clone();
    url.set_path(&format!("{prefix}/{suffix}"));
    url
}

#[async_trait]
impl Upstream for UpstreamClient {
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Bytes>,
    ) -> Result<JsonReply, UpstreamError> {
        debug!("Upstream request: {} {}", method, self.endpoint_url(path));

        let mut builder = self.build(method, path).timeout(self.request_timeout);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(UpstreamError::from_reqwest)?;
        let status = response.status();
        let raw = response.bytes().await.map_err(UpstreamError::from_reqwest)?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&raw).into_owned(),
            });
        }

        let value = serde_json::from_slice(&raw).map_err(|_| UpstreamError::Parse {
            body: String::from_utf8_lossy(&raw).into_owned(),
        })?;

        Ok(JsonReply { value, raw })
    }

    async fn open_stream(&self, path: &str, body: Bytes) -> Result<StreamingReply, UpstreamError> {
        debug!("Upstream stream: POST {}", self.endpoint_url(path));

        let send = self.build(Method::POST, path).body(body).send();
        let response = match self.stream_idle_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| UpstreamError::IdleTimeout(limit))?,
            None => send.await,
        }
        .map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(response, self.request_timeout).await);
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(UpstreamError::from_reqwest));

        Ok(StreamingReply {
            status,
            body: Box::pin(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(base: &str, endpoint: &str) -> String {
        join_endpoint(&Url::parse(base).unwrap(), endpoint).to_string()
    }

    #[test]
    fn test_join_without_trailing_slash() {
        assert_eq!(
            joined("http://host:1234/v1", "chat/completions"),
            "http://host:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_join_with_trailing_slash() {
        assert_eq!(
            joined("http://host:1234/v1/", "chat/completions"),
            "http://host:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_join_with_leading_slash_endpoint() {
        assert_eq!(
            joined("http://host:1234/v1/", "/models"),
            "http://host:1234/v1/models"
        );
    }

    #[test]
    fn test_join_on_bare_host() {
        assert_eq!(
            joined("https://api.example.com", "models"),
            "https://api.example.com/models"
        );
    }

    #[test]
    fn test_join_keeps_query() {
        assert_eq!(
            joined("https://gw.example.com/openai?tenant=a", "models"),
            "https://gw.example.com/openai/models?tenant=a"
        );
    }

    #[test]
    fn test_status_error_mentions_code() {
        let err = UpstreamError::Status {
            status: 401,
            body: "invalid key".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 401: invalid key");
    }
}

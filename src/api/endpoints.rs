//! API endpoint handlers
//!
//! This module implements the five fixed routes of the proxy: the Ollama-style
//! `/api/*` family answered locally or from the upstream model list, and the
//! OpenAI-style `/v1/*` family forwarded to the upstream.

use crate::api::error::ApiError;
use crate::api::middleware::{cors, handle_panic, log_request};
use crate::conversion::chat::{requested_model, wants_stream};
use crate::conversion::model_list::{merge_model_tags, show_response, version_response};
use crate::core::config::ServerConfig;
use crate::core::constants::{route, stream, upstream};
use crate::core::upstream::{ByteStream, Upstream, UpstreamError};
use crate::models::ollama::{ShowResponse, TagsResponse, VersionResponse};
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{
        HeaderValue, Method,
        header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
    },
    middleware,
    response::Response,
    routing::{get, post},
};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub upstream: Arc<dyn Upstream>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>, upstream: Arc<dyn Upstream>) -> Self {
        Self { config, upstream }
    }
}

/// Create the API router with all endpoints
///
/// A known path hit with the wrong method falls through to the same 404 as an
/// unknown path.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(route::API_TAGS, get(list_tags).fallback(not_found))
        .route(route::API_SHOW, post(show_model).fallback(not_found))
        .route(route::API_VERSION, get(version).fallback(not_found))
        .route(route::V1_MODELS, get(list_models).fallback(not_found))
        .route(
            route::V1_CHAT_COMPLETIONS,
            post(chat_completions).fallback(not_found),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(log_request))
        .layer(middleware::from_fn(cors))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Response carrying an already-serialized JSON body unchanged
fn raw_json(body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// GET /api/tags - Upstream models plus configured extras, Ollama format
async fn list_tags(State(state): State<AppState>) -> Result<Json<TagsResponse>, ApiError> {
    let reply = state
        .upstream
        .request(upstream::MODELS, Method::GET, None)
        .await?;

    let tags = merge_model_tags(&reply.value, &state.config.extra_models);
    debug!("Listing {} models", tags.models.len());
    Ok(Json(tags))
}

/// POST /api/show - Static capability descriptor, request body ignored
async fn show_model(State(state): State<AppState>) -> Json<ShowResponse> {
    Json(show_response(&state.config.capabilities))
}

/// GET /api/version
async fn version() -> Json<VersionResponse> {
    Json(version_response())
}

/// GET /v1/models - Upstream model list, byte-for-byte
async fn list_models(State(state): State<AppState>) -> Result<Response, ApiError> {
    let reply = state
        .upstream
        .request(upstream::MODELS, Method::GET, None)
        .await?;
    Ok(raw_json(reply.raw))
}

/// POST /v1/chat/completions - Forward to upstream, buffered or streamed
async fn chat_completions(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| ApiError::BodyRead(e.to_string()))?;

    let payload: Value = serde_json::from_slice(&body)?;
    let stream = wants_stream(&payload);

    info!(
        "Chat completion: model={}, stream={}",
        requested_model(&payload).unwrap_or("<unset>"),
        stream
    );

    if stream {
        stream_completion(&state, body).await
    } else {
        let reply = state
            .upstream
            .request(upstream::CHAT_COMPLETIONS, Method::POST, Some(body))
            .await?;
        Ok(raw_json(reply.raw))
    }
}

/// Open the upstream stream and hand its chunks to the caller through a channel
///
/// Nothing is written to the caller until upstream headers have arrived with a
/// 2xx status, so every failure up to that point still gets the JSON envelope.
async fn stream_completion(state: &AppState, body: Bytes) -> Result<Response, ApiError> {
    let stream_id = Uuid::new_v4();
    let reply = state
        .upstream
        .open_stream(upstream::CHAT_COMPLETIONS, body)
        .await?;

    debug!(
        "Stream {} opened with upstream status {}",
        stream_id,
        reply.status.as_u16()
    );

    let (tx, rx) = mpsc::channel(stream::CHANNEL_CAPACITY);
    tokio::spawn(pump_stream(
        reply.body,
        tx,
        state.config.stream_idle_timeout,
        stream_id,
    ));

    let mut response = Response::new(Body::from_stream(ReceiverStream::new(rx)));
    *response.status_mut() = reply.status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(stream::CONTENT_TYPE));
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static(stream::CACHE_CONTROL),
    );
    headers.insert(CONNECTION, HeaderValue::from_static(stream::CONNECTION));
    Ok(response)
}

/// Next upstream chunk, or an idle-timeout error if upstream goes quiet
async fn next_chunk(
    upstream: &mut ByteStream,
    idle: Option<Duration>,
) -> Option<Result<Bytes, UpstreamError>> {
    match idle {
        Some(limit) => match tokio::time::timeout(limit, upstream.next()).await {
            Ok(item) => item,
            Err(_) => Some(Err(UpstreamError::IdleTimeout(limit))),
        },
        None => upstream.next().await,
    }
}

/// Copy upstream chunks into the response channel in order
///
/// Returns when upstream ends, fails, or the caller goes away. An error is
/// forwarded as the last item so the response body aborts instead of ending
/// cleanly. Dropping `upstream` on return closes the upstream connection.
async fn pump_stream(
    mut upstream: ByteStream,
    tx: mpsc::Sender<Result<Bytes, UpstreamError>>,
    idle: Option<Duration>,
    stream_id: Uuid,
) {
    let mut forwarded = 0usize;

    loop {
        let item = tokio::select! {
            _ = tx.closed() => {
                debug!("Stream {}: client disconnected after {} bytes", stream_id, forwarded);
                return;
            }
            item = next_chunk(&mut upstream, idle) => item,
        };

        match item {
            Some(Ok(chunk)) => {
                forwarded += chunk.len();
                if tx.send(Ok(chunk)).await.is_err() {
                    debug!("Stream {}: client disconnected after {} bytes", stream_id, forwarded);
                    return;
                }
            }
            Some(Err(e)) => {
                match &e {
                    UpstreamError::IdleTimeout(_) => warn!("Stream {}: {}", stream_id, e),
                    _ => error!("Stream {}: upstream failed mid-stream: {}", stream_id, e),
                }
                let _ = tx.send(Err(e)).await;
                return;
            }
            None => {
                debug!("Stream {} finished after {} bytes", stream_id, forwarded);
                return;
            }
        }
    }
}

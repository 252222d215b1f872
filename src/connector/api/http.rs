//! HTTP surface: `POST /api/chatbot` streams an answer as server-sent events.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::application::{CompletionGateway, FragmentStream};
use crate::connector::adapter::sse::{encode_content_event, DONE_EVENT};
use crate::connector::adapter::CHAT_PATH;
use crate::domain::{ChatRequest, DomainError, ErrorBody, MAX_FILES, MAX_FILE_SIZE};

pub const HEALTH_PATH: &str = "/health";

/// Room for the message text and history on top of the attachments.
const REQUEST_HEADROOM_BYTES: usize = 8 * 1024 * 1024;

/// Largest accepted chat request: a full upload list, base64-encoded, plus headroom.
pub const MAX_REQUEST_BODY_BYTES: usize =
    (MAX_FILES * MAX_FILE_SIZE as usize + 2) / 3 * 4 + REQUEST_HEADROOM_BYTES;

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<CompletionGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<CompletionGateway>) -> Self {
        Self { gateway }
    }
}

/// Failure surfaced before the event stream starts.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    PayloadTooLarge(String),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::Domain(DomainError::invalid_input(rejection.body_text()))
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Domain(DomainError::Provider(failure)) => failure
                .status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Domain(DomainError::InvalidInput(_) | DomainError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Domain(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::PayloadTooLarge(details) => ErrorBody::new(ErrorBody::PAYLOAD_TOO_LARGE)
                .with_details(serde_json::Value::String(details.clone())),
            Self::Domain(e) => ErrorBody::from_error(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Domain(e) => error!(status = status.as_u16(), "Chat request failed: {}", e),
            Self::PayloadTooLarge(details) => {
                warn!(status = status.as_u16(), "Chat request rejected: {}", details)
            }
        }
        (status, Json(self.body())).into_response()
    }
}

pub fn routes(gateway: Arc<CompletionGateway>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(CHAT_PATH, post(chat))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .with_state(AppState::new(gateway))
}

/// Binds `addr` and serves until ctrl-c.
pub async fn serve(addr: SocketAddr, gateway: Arc<CompletionGateway>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Chat endpoint listening on http://{}{}", listener.local_addr()?, CHAT_PATH);

    axum::serve(listener, routes(gateway))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let fragments = state.gateway.exchange(request).await?;
    Ok(sse_response(event_stream(fragments)))
}

/// Frames every fragment as a content event and finishes with `[DONE]`.
///
/// A failing fragment ends the body with an error so the connection is
/// aborted instead of completing normally.
fn event_stream(
    mut fragments: FragmentStream,
) -> impl Stream<Item = Result<Bytes, DomainError>> + Send + 'static {
    async_stream::stream! {
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => yield encode_content_event(&fragment),
                Err(e) => {
                    warn!("Aborting event stream: {}", e);
                    yield Err(e);
                    return;
                }
            }
        }
        yield Ok(Bytes::from_static(DONE_EVENT.as_bytes()));
    }
}

fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, DomainError>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(stream)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderFailure, UploadRejection};

    #[test]
    fn provider_status_is_forwarded() {
        let err = ApiError::from(DomainError::provider(
            ProviderFailure::new("rate limited").with_status(429),
        ));
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn provider_without_status_is_internal() {
        let err = ApiError::from(DomainError::provider(ProviderFailure::new("boom")));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_input_is_bad_request() {
        assert_eq!(
            ApiError::from(DomainError::invalid_input("empty")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DomainError::from(UploadRejection::TooManyFiles { max: 5 })).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn body_limit_fits_a_full_upload_list() {
        let encoded = (MAX_FILES as u64 * MAX_FILE_SIZE).div_ceil(3) * 4;
        assert!(MAX_REQUEST_BODY_BYTES as u64 > encoded);
    }

    #[test]
    fn configuration_is_internal() {
        let err = ApiError::from(DomainError::configuration("missing"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

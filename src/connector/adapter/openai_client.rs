use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sse::{decode_event_stream, SseFrame, DONE_SENTINEL};
use crate::application::{CompletionProvider, CompletionRequest, FragmentStream};
use crate::domain::{DomainError, PromptMessage, ProviderFailure, MISSING_API_KEY_MESSAGE};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
    max_tokens: u32,
    presence_penalty: f32,
    frequency_penalty: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl ApiErrorDetail {
    fn into_failure(self, status: Option<u16>) -> ProviderFailure {
        let code = match self.code {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        ProviderFailure {
            status,
            code,
            kind: self.kind,
            message: self.message,
        }
    }
}

/// Streaming client for the OpenAI chat completions API.
///
/// Configured from the environment:
///
/// | Variable          | Default                  |
/// |-------------------|--------------------------|
/// | `OPENAI_API_KEY`  | none, required per call  |
/// | `OPENAI_BASE_URL` | `https://api.openai.com` |
/// | `OPENAI_MODEL`    | `gpt-4`                  |
///
/// A missing key does not prevent construction; each request fails with a
/// configuration error instead.
pub struct OpenAiCompletionProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    /// Full endpoint URL (base + COMPLETIONS_PATH).
    url: String,
}

impl OpenAiCompletionProvider {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let base: String = base_url.into();
        let url = format!("{}{COMPLETIONS_PATH}", base.trim_end_matches('/'));
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| DomainError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            url,
        })
    }

    pub fn from_env() -> Result<Self, DomainError> {
        let base =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(std::env::var("OPENAI_API_KEY").ok(), model, base)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<FragmentStream, DomainError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DomainError::configuration(MISSING_API_KEY_MESSAGE))?;

        let sampling = &request.sampling;
        let body = ApiRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            presence_penalty: sampling.presence_penalty,
            frequency_penalty: sampling.frequency_penalty,
            stream: true,
        };

        debug!(
            "Requesting completion from {} ({} messages)",
            self.url,
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::transport(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("OpenAI returned {}: {}", status, text);
            return Err(DomainError::provider(error_from_body(status.as_u16(), &text)));
        }

        Ok(decode_event_stream(
            response.bytes_stream(),
            parse_chunk,
            false,
        ))
    }
}

fn error_from_body(status: u16, body: &str) -> ProviderFailure {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.into_failure(Some(status)),
        Err(_) if body.trim().is_empty() => {
            ProviderFailure::new(format!("request failed with status {status}")).with_status(status)
        }
        Err(_) => ProviderFailure::new(body.trim()).with_status(status),
    }
}

/// Interprets one upstream `data:` payload.
fn parse_chunk(payload: &str) -> Result<SseFrame, DomainError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(SseFrame::Skip);
    }
    if payload == DONE_SENTINEL {
        return Ok(SseFrame::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| DomainError::parse(format!("invalid completion chunk: {e}")))?;
    if let Some(error) = chunk.error {
        return Err(DomainError::provider(error.into_failure(None)));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .map_or(SseFrame::Skip, SseFrame::Fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PromptMessage;

    #[test]
    fn parses_delta_content() {
        let frame =
            parse_chunk(r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Hel"}}]}"#)
                .unwrap();
        assert_eq!(frame, SseFrame::Fragment("Hel".to_string()));
    }

    #[test]
    fn role_only_and_finish_chunks_are_skipped() {
        let role = parse_chunk(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        let finish = parse_chunk(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(role, SseFrame::Skip);
        assert_eq!(finish, SseFrame::Skip);
    }

    #[test]
    fn done_sentinel_ends_stream() {
        assert_eq!(parse_chunk("[DONE]").unwrap(), SseFrame::Done);
    }

    #[test]
    fn malformed_chunk_is_parse_error() {
        assert!(matches!(parse_chunk("{oops"), Err(DomainError::ParseError(_))));
    }

    #[test]
    fn inline_error_chunk_is_provider_error() {
        let err = parse_chunk(r#"{"error":{"message":"overloaded","type":"server_error"}}"#)
            .unwrap_err();
        match err {
            DomainError::Provider(failure) => {
                assert_eq!(failure.message, "overloaded");
                assert_eq!(failure.kind.as_deref(), Some("server_error"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn error_body_keeps_status_code_and_type() {
        let failure = error_from_body(
            401,
            r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error","code":"invalid_api_key"}}"#,
        );
        assert_eq!(failure.status, Some(401));
        assert_eq!(failure.code.as_deref(), Some("invalid_api_key"));
        assert_eq!(failure.kind.as_deref(), Some("invalid_request_error"));
        assert_eq!(failure.message, "Incorrect API key");
    }

    #[test]
    fn non_json_error_body_is_kept_verbatim() {
        let failure = error_from_body(502, "Bad Gateway");
        assert_eq!(failure.status, Some(502));
        assert_eq!(failure.message, "Bad Gateway");
    }

    #[test]
    fn request_body_carries_sampling_and_stream_flag() {
        let messages = vec![PromptMessage::user("hi")];
        let body = ApiRequest {
            model: "gpt-4",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 2000,
            presence_penalty: 0.6,
            frequency_penalty: 0.5,
            stream: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let provider = OpenAiCompletionProvider::new(Some("  ".into()), "gpt-4", DEFAULT_BASE_URL)
            .expect("client builds");
        assert!(!provider.has_api_key());

        let result = provider
            .stream_completion(CompletionRequest::new(vec![PromptMessage::user("hi")]))
            .await;
        match result {
            Err(DomainError::Configuration(msg)) => assert_eq!(msg, MISSING_API_KEY_MESSAGE),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("expected configuration error"),
        }
    }

    #[test]
    fn construction_keeps_key_and_model() {
        let provider =
            OpenAiCompletionProvider::new(Some("sk-test".into()), "gpt-4o", DEFAULT_BASE_URL)
                .expect("client with connect timeout builds");
        assert!(provider.has_api_key());
        assert_eq!(provider.model(), "gpt-4o");
        assert_eq!(provider.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn endpoint_joins_base_without_double_slash() {
        let provider = OpenAiCompletionProvider::new(None, "m", "http://localhost:8080/")
            .expect("client builds");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}

use async_trait::async_trait;
use tracing::{debug, warn};

use super::sse::{decode_event_stream, parse_content_event};
use crate::application::{ChatTransport, FragmentStream};
use crate::domain::{ChatRequest, DomainError, ErrorBody};

pub const CHAT_PATH: &str = "/api/chatbot";

/// Sends chat requests to a running `chatbot serve` instance and decodes its
/// event stream.
pub struct HttpChatTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpChatTransport {
    pub fn new(server: impl AsRef<str>) -> Self {
        let url = format!("{}{CHAT_PATH}", server.as_ref().trim_end_matches('/'));
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, request: ChatRequest) -> Result<FragmentStream, DomainError> {
        debug!("POST {} ({} history entries)", self.url, request.history.len());

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::transport(format!("failed to reach {}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Chat server returned {}: {}", status, text);
            return Err(match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => body.into_error(status.as_u16()),
                Err(_) => DomainError::transport(format!(
                    "chat server returned {status}: {}",
                    text.trim()
                )),
            });
        }

        Ok(decode_event_stream(
            response.bytes_stream(),
            parse_content_event,
            true,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_appends_chat_path() {
        assert_eq!(
            HttpChatTransport::new("http://127.0.0.1:3000/").url(),
            "http://127.0.0.1:3000/api/chatbot"
        );
    }
}

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Attachment, Message, Role};
use crate::domain::{DomainError, ProviderFailure, MISSING_API_KEY_MESSAGE};

/// Body of `POST /api/chatbot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn attachment_types(&self) -> Vec<&str> {
        self.attachments.iter().map(|a| a.mime_type()).collect()
    }
}

/// A prior conversation turn as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self::new(message.role(), message.content())
    }
}

/// Payload of one `data:` line of the chat event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEvent {
    pub content: String,
}

/// JSON body returned when a request fails before streaming starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub const PROVIDER_ERROR: &'static str = "OpenAI API Error";
    pub const PROCESSING_ERROR: &'static str = "Failed to process message";
    pub const INVALID_REQUEST: &'static str = "Invalid request";
    pub const UNEXPECTED_ERROR: &'static str = "An unexpected error occurred";
    pub const PAYLOAD_TOO_LARGE: &'static str = "Request too large";

    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Builds the body reported to HTTP clients for `error`.
    pub fn from_error(error: &DomainError) -> Self {
        match error {
            DomainError::Configuration(msg) => Self::new(msg.clone()),
            DomainError::Provider(failure) => Self::new(Self::PROVIDER_ERROR).with_details(json!({
                "message": failure.message,
                "type": failure.kind,
                "code": failure.code,
            })),
            DomainError::InvalidInput(msg) => {
                Self::new(Self::INVALID_REQUEST).with_details(json!(msg))
            }
            DomainError::Validation(rejection) => {
                Self::new(Self::INVALID_REQUEST).with_details(json!(rejection.to_string()))
            }
            DomainError::Transport(_) | DomainError::ParseError(_) | DomainError::IoError(_) => {
                Self::new(Self::PROCESSING_ERROR).with_details(json!(error.to_string()))
            }
            DomainError::ExchangeInFlight | DomainError::Internal(_) => {
                Self::new(Self::UNEXPECTED_ERROR).with_details(json!("Internal server error"))
            }
        }
    }

    /// Reverses [`ErrorBody::from_error`] on the client side of the wire.
    pub fn into_error(self, status: u16) -> DomainError {
        let details = self.details_text();
        match self.error.as_str() {
            Self::PROVIDER_ERROR => {
                let details = self.details.unwrap_or_default();
                let text = |key: &str| match &details[key] {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                };
                DomainError::Provider(ProviderFailure {
                    status: Some(status),
                    code: text("code"),
                    kind: text("type"),
                    message: text("message").unwrap_or_else(|| self.error.clone()),
                })
            }
            Self::INVALID_REQUEST | Self::PAYLOAD_TOO_LARGE => DomainError::invalid_input(details),
            Self::PROCESSING_ERROR => DomainError::transport(details),
            Self::UNEXPECTED_ERROR => DomainError::internal(details),
            MISSING_API_KEY_MESSAGE => DomainError::configuration(self.error),
            _ => DomainError::transport(format!("server returned {status}: {}", self.error)),
        }
    }

    fn details_text(&self) -> String {
        match &self.details {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachments_default_to_empty() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","history":[{"role":"user","content":"a"}]}"#)
                .unwrap();
        assert!(request.attachments.is_empty());
        assert_eq!(request.history[0].role, Role::User);
    }

    #[test]
    fn provider_error_round_trips_through_body() {
        let failure = ProviderFailure::new("quota exceeded")
            .with_status(429)
            .with_code("insufficient_quota")
            .with_kind("requests");
        let body = ErrorBody::from_error(&DomainError::provider(failure));
        assert_eq!(body.error, ErrorBody::PROVIDER_ERROR);

        match body.into_error(429) {
            DomainError::Provider(failure) => {
                assert_eq!(failure.status, Some(429));
                assert_eq!(failure.code.as_deref(), Some("insufficient_quota"));
                assert_eq!(failure.kind.as_deref(), Some("requests"));
                assert_eq!(failure.message, "quota exceeded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn configuration_error_is_recognised_by_message() {
        let body = ErrorBody::from_error(&DomainError::configuration(MISSING_API_KEY_MESSAGE));
        assert!(body.details.is_none());
        assert!(body.into_error(500).is_configuration());
    }

    #[test]
    fn unknown_body_becomes_transport_error() {
        let err = ErrorBody::new("teapot").into_error(418);
        assert!(matches!(err, DomainError::Transport(msg) if msg.contains("418")));
    }

    #[test]
    fn history_entry_from_message_keeps_role_and_content() {
        let message = Message::assistant("sure");
        let entry = HistoryEntry::from(&message);
        assert_eq!(entry.role, Role::Assistant);
        assert_eq!(entry.content, "sure");
    }
}

use std::fmt;

use thiserror::Error;

/// Reported when the completion provider credential is absent.
pub const MISSING_API_KEY_MESSAGE: &str =
    "OpenAI API key not configured. Please add OPENAI_API_KEY to your environment";

/// Status, code and message reported by the completion provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderFailure {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub kind: Option<String>,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Reasons an upload batch is refused before anything is read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("Maximum {max} files allowed")]
    TooManyFiles { max: usize },

    #[error("{name} exceeds maximum size of {}MB", .max_bytes / (1024 * 1024))]
    FileTooLarge { name: String, max_bytes: u64 },

    #[error("{name} is not a supported file type")]
    UnsupportedType { name: String },
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error: {0}")]
    Provider(ProviderFailure),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Upload rejected: {0}")]
    Validation(#[from] UploadRejection),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Another message is still being answered")]
    ExchangeInFlight,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn provider(failure: ProviderFailure) -> Self {
        Self::Provider(failure)
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// One-line text suitable for an inline notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(msg) => msg.clone(),
            Self::Provider(failure) => format!("Provider error: {}", failure.message),
            Self::Transport(_) | Self::ParseError(_) | Self::IoError(_) => {
                "Failed to process message".to_string()
            }
            Self::Validation(rejection) => rejection.to_string(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::ExchangeInFlight => self.to_string(),
            Self::Internal(_) => "An unexpected error occurred".to_string(),
        }
    }
}

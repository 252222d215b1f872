use async_trait::async_trait;

use crate::application::FragmentStream;
use crate::domain::{ChatRequest, DomainError};

/// Carries a chat request to whatever relays it to the completion provider.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: ChatRequest) -> Result<FragmentStream, DomainError>;
}

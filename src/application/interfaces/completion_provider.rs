use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::{DomainError, PromptMessage};

/// Lazy, finite sequence of assistant text fragments in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String, DomainError>>;

/// Sampling parameters forwarded to the provider with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
            presence_penalty: 0.6,
            frequency_penalty: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<PromptMessage>,
    pub sampling: SamplingSettings,
}

impl CompletionRequest {
    pub fn new(messages: Vec<PromptMessage>) -> Self {
        Self {
            messages,
            sampling: SamplingSettings::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingSettings) -> Self {
        self.sampling = sampling;
        self
    }
}

/// A hosted chat-completion service that answers with a token stream.
///
/// Errors raised before the first fragment (missing credentials, provider
/// rejections) come back as `Err`; failures after streaming started are
/// yielded as the stream's last item.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<FragmentStream, DomainError>;
}

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tracing::debug;

use crate::application::{CompletionProvider, CompletionRequest, FragmentStream};
use crate::domain::{DomainError, Role};

type ErrorFactory = Arc<dyn Fn() -> DomainError + Send + Sync>;

/// Offline provider used by tests and `--mock-provider`.
///
/// By default it echoes the latest user turn back one word at a time, so
/// streaming behaviour can be observed without network access.
pub struct MockCompletionProvider {
    script: Option<Vec<String>>,
    setup_error: Option<ErrorFactory>,
    stream_error: Option<(usize, ErrorFactory)>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockCompletionProvider {
    pub fn new() -> Self {
        Self {
            script: None,
            setup_error: None,
            stream_error: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replies with exactly these fragments, in order.
    pub fn scripted<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Some(fragments.into_iter().map(Into::into).collect()),
            ..Self::new()
        }
    }

    /// Fails every request before any fragment is produced.
    pub fn failing_with<F>(mut self, error: F) -> Self
    where
        F: Fn() -> DomainError + Send + Sync + 'static,
    {
        self.setup_error = Some(Arc::new(error));
        self
    }

    /// Emits `after` fragments and then terminates the stream with an error.
    pub fn with_stream_error_after<F>(mut self, after: usize, error: F) -> Self
    where
        F: Fn() -> DomainError + Send + Sync + 'static,
    {
        self.stream_error = Some((after, Arc::new(error)));
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn echo(request: &CompletionRequest) -> Vec<String> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let mut fragments = vec!["You said:".to_string()];
        fragments.extend(last_user.split_whitespace().map(|word| format!(" {word}")));
        fragments
    }
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-completion"
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<FragmentStream, DomainError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(error) = &self.setup_error {
            return Err(error());
        }

        let fragments = match &self.script {
            Some(script) => script.clone(),
            None => Self::echo(&request),
        };
        debug!("Mock provider streaming {} fragments", fragments.len());

        let mut items: Vec<Result<String, DomainError>> = Vec::new();
        match &self.stream_error {
            Some((after, error)) => {
                items.extend(fragments.into_iter().take(*after).map(Ok));
                items.push(Err(error()));
            }
            None => items.extend(fragments.into_iter().map(Ok)),
        }

        Ok(stream::iter(items).boxed())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{future, StreamExt, TryStreamExt};
use tracing::{error, info};

use crate::application::use_cases::prompt::{
    compose_content, truncate_history, MAX_CONTENT_LENGTH, MAX_HISTORY_MESSAGES,
};
use crate::application::{
    ChatTransport, CompletionProvider, CompletionRequest, FragmentStream, SamplingSettings,
};
use crate::domain::{ChatRequest, DomainError, PromptMessage};

/// Instructions sent ahead of every conversation.
pub const SYSTEM_PROMPT: &str = "\
You are a general answering assistant that must use clean, structured markdown formatting.

Markdown guidelines:
1. Headers: a single # for the main title only at the start, ## for major sections, \
### for subsections. Headers are unique and never contain markdown symbols.
2. Lists: - for unordered lists, 1. 2. 3. for ordered lists, consistent indentation, \
no blank lines between items, flat lists with introductory text instead of nesting.
3. Code: `inline code` for short technical terms, fenced blocks with a language for code.
4. Tables: a header row, a complete separator row, aligned columns, no empty cells.
5. Emphasis: **bold** for key terms, *italic* for emphasis.
6. Structure: one blank line between sections, a clear hierarchy, every piece of \
information stated exactly once.

When analyzing files:
1. Start with a clear description of the file type and content.
2. Note key details systematically and describe relevant context.
3. Be objective, precise and professional, following the markdown guidelines above.

Never repeat headers, paragraphs or sections, and never produce malformed markdown.";

/// Relays a chat request to the completion provider and hands back its fragments.
///
/// The gateway owns request shaping: the system prompt, the history window,
/// attachment rendering and the byte budget.
pub struct CompletionGateway {
    provider: Arc<dyn CompletionProvider>,
    system_prompt: String,
    sampling: SamplingSettings,
    max_history: usize,
    max_content_length: usize,
}

impl CompletionGateway {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            system_prompt: SYSTEM_PROMPT.to_string(),
            sampling: SamplingSettings::default(),
            max_history: MAX_HISTORY_MESSAGES,
            max_content_length: MAX_CONTENT_LENGTH,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_content_budget(mut self, max_bytes: usize) -> Self {
        self.max_content_length = max_bytes;
        self
    }

    /// Provider messages for `request`: system prompt, recent history, then the new turn.
    pub fn build_messages(&self, request: &ChatRequest) -> Vec<PromptMessage> {
        let window_start = request.history.len().saturating_sub(self.max_history);

        let mut messages = Vec::with_capacity(self.max_history + 2);
        messages.push(PromptMessage::system(self.system_prompt.clone()));
        messages.extend(request.history[window_start..].iter().map(|entry| {
            PromptMessage::new(entry.role, compose_content(&entry.content, &entry.attachments))
        }));
        messages.push(PromptMessage::user(compose_content(
            &request.message,
            &request.attachments,
        )));

        truncate_history(messages, self.max_content_length)
    }

    pub async fn exchange(&self, request: ChatRequest) -> Result<FragmentStream, DomainError> {
        if request.message.trim().is_empty() {
            return Err(DomainError::invalid_input("message must not be empty"));
        }

        let messages = self.build_messages(&request);
        let context = ExchangeContext::new(&request, self.provider.model());

        info!(
            message_length = context.message_length,
            attachments = context.attachment_types.len(),
            history = request.history.len(),
            prompt_messages = messages.len(),
            model = %context.model,
            "Relaying chat exchange"
        );

        let completion = CompletionRequest::new(messages).with_sampling(self.sampling.clone());
        let stream = match self.provider.stream_completion(completion).await {
            Ok(stream) => stream,
            Err(e) => {
                context.log_failure(&e);
                return Err(e);
            }
        };

        Ok(stream
            .try_filter(|fragment| future::ready(!fragment.is_empty()))
            .inspect_err(move |e| context.log_failure(e))
            .boxed())
    }
}

#[async_trait]
impl ChatTransport for CompletionGateway {
    async fn send(&self, request: ChatRequest) -> Result<FragmentStream, DomainError> {
        self.exchange(request).await
    }
}

/// Request facts attached to every failure log line.
struct ExchangeContext {
    message_length: usize,
    attachment_types: Vec<String>,
    model: String,
}

impl ExchangeContext {
    fn new(request: &ChatRequest, model: &str) -> Self {
        Self {
            message_length: request.message.chars().count(),
            attachment_types: request
                .attachment_types()
                .into_iter()
                .map(String::from)
                .collect(),
            model: model.to_string(),
        }
    }

    fn log_failure(&self, e: &DomainError) {
        error!(
            message_length = self.message_length,
            attachments_count = self.attachment_types.len(),
            attachment_types = ?self.attachment_types,
            model = %self.model,
            error = %e,
            "Chat exchange failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::prompt::format_attachment;
    use crate::connector::adapter::MockCompletionProvider;
    use crate::domain::{Attachment, HistoryEntry, Role};

    fn gateway(provider: MockCompletionProvider) -> CompletionGateway {
        CompletionGateway::new(Arc::new(provider))
    }

    #[test]
    fn build_messages_keeps_ten_most_recent_turns() {
        let history: Vec<HistoryEntry> = (0..15)
            .map(|i| HistoryEntry::new(Role::User, format!("turn {i}")))
            .collect();
        let request = ChatRequest::new("latest").with_history(history);

        let messages = gateway(MockCompletionProvider::new()).build_messages(&request);

        assert_eq!(messages.len(), 12);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "turn 5");
        assert_eq!(messages[10].content, "turn 14");
        assert_eq!(messages[11], PromptMessage::user("latest"));
    }

    #[test]
    fn build_messages_renders_attachments_into_user_turn() {
        let attachment = Attachment::from_bytes("todo.txt", "text/plain", b"ship it");
        let request = ChatRequest::new("summarize").with_attachments(vec![attachment.clone()]);

        let messages = gateway(MockCompletionProvider::new()).build_messages(&request);

        assert_eq!(
            messages.last().unwrap().content,
            format!("summarize\n\n{}", format_attachment(&attachment))
        );
    }

    #[test]
    fn build_messages_applies_byte_budget() {
        let history: Vec<HistoryEntry> = (0..10)
            .map(|i| HistoryEntry::new(Role::Assistant, format!("{i}{}", "z".repeat(400))))
            .collect();
        let request = ChatRequest::new("now").with_history(history);
        let gw = gateway(MockCompletionProvider::new())
            .with_system_prompt("sys")
            .with_content_budget(1_000);

        let messages = gw.build_messages(&request);
        let total: usize = messages.iter().map(PromptMessage::serialized_len).sum();

        assert!(total <= 1_000);
        assert_eq!(messages[0], PromptMessage::system("sys"));
        assert_eq!(messages.last().unwrap(), &PromptMessage::user("now"));
    }

    #[tokio::test]
    async fn exchange_relays_fragments_in_order() {
        let gw = gateway(MockCompletionProvider::scripted(["Hel", "", "lo", " world"]));

        let fragments: Vec<String> = gw
            .exchange(ChatRequest::new("hi"))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(fragments, vec!["Hel", "lo", " world"]);
    }

    #[tokio::test]
    async fn exchange_rejects_blank_message() {
        let result = gateway(MockCompletionProvider::new())
            .exchange(ChatRequest::new("   "))
            .await;
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn exchange_surfaces_provider_setup_errors() {
        let provider = MockCompletionProvider::new()
            .failing_with(|| DomainError::configuration("missing key"));
        let result = gateway(provider).exchange(ChatRequest::new("hi")).await;
        assert!(matches!(result, Err(DomainError::Configuration(_))));
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::application::{ChatTransport, ConversationStore};
use crate::domain::{Attachment, ChatRequest, DomainError, Message};

/// Drives one exchange at a time between the conversation and a transport.
pub struct ChatOrchestrator {
    store: ConversationStore,
    transport: Arc<dyn ChatTransport>,
    pending: AtomicBool,
}

impl ChatOrchestrator {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self::with_store(transport, ConversationStore::with_greeting())
    }

    pub fn with_store(transport: Arc<dyn ChatTransport>, store: ConversationStore) -> Self {
        Self {
            store,
            transport,
            pending: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Sends `text` with `attachments` and streams the answer into the store.
    ///
    /// Returns the finished assistant message. On any failure both messages
    /// added for this exchange are removed again before the error is returned.
    pub async fn send(
        &self,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<Message, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::invalid_input("message must not be empty"));
        }

        let _guard = PendingGuard::acquire(&self.pending).ok_or(DomainError::ExchangeInFlight)?;

        let history = self.store.history();
        let user = Message::user(text);
        let placeholder = Message::placeholder();
        let user_id = user.id().to_string();
        let reply_id = placeholder.id().to_string();

        self.store.push(user);
        self.store.push(placeholder);
        let rollback = RollbackGuard::new(&self.store, [user_id, reply_id.clone()]);

        info!(
            message_length = text.chars().count(),
            attachments = attachments.len(),
            history = history.len(),
            "Sending message"
        );

        let request = ChatRequest::new(text)
            .with_history(history)
            .with_attachments(attachments);

        if let Err(e) = self.stream_reply(request, &reply_id).await {
            warn!("Exchange failed, rolling back: {}", e);
            return Err(e);
        }

        let reply = self
            .store
            .get(&reply_id)
            .ok_or_else(|| DomainError::internal("assistant message vanished mid-exchange"))?;
        rollback.disarm();
        Ok(reply)
    }

    async fn stream_reply(&self, request: ChatRequest, reply_id: &str) -> Result<(), DomainError> {
        let mut fragments = self.transport.send(request).await?;
        let mut received = 0usize;

        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            if !self.store.append_to(reply_id, &fragment) {
                return Err(DomainError::internal("assistant message vanished mid-exchange"));
            }
            received += 1;
        }

        debug!("Exchange complete after {} fragments", received);
        Ok(())
    }
}

/// Holds the one-exchange flag for the lifetime of a `send`.
struct PendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Removes the messages of an unfinished exchange when dropped armed,
/// including when the `send` future itself is dropped mid-stream.
struct RollbackGuard<'a> {
    store: &'a ConversationStore,
    ids: [String; 2],
    armed: bool,
}

impl<'a> RollbackGuard<'a> {
    fn new(store: &'a ConversationStore, ids: [String; 2]) -> Self {
        Self {
            store,
            ids,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.remove_all(&[&self.ids[0], &self.ids[1]]);
        }
    }
}

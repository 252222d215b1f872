use tokio::sync::watch;
use tracing::debug;

use crate::domain::{HistoryEntry, Message};

/// Ordered, in-process list of conversation messages.
///
/// Every mutation republishes the whole list; renderers hold a
/// [`watch::Receiver`] from [`ConversationStore::subscribe`] and redraw from
/// its latest value.
pub struct ConversationStore {
    messages: watch::Sender<Vec<Message>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_messages(Vec::new())
    }

    /// A store seeded with the assistant greeting.
    pub fn with_greeting() -> Self {
        Self::with_messages(vec![Message::greeting()])
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        let (messages, _) = watch::channel(messages);
        Self { messages }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.subscribe()
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Message> {
        self.messages.borrow().iter().find(|m| m.id() == id).cloned()
    }

    /// Role and content of every message, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages.borrow().iter().map(HistoryEntry::from).collect()
    }

    pub(crate) fn push(&self, message: Message) {
        self.messages.send_modify(|messages| messages.push(message));
    }

    /// Appends `fragment` to the message with `id`. Returns `false` when no such message exists.
    pub(crate) fn append_to(&self, id: &str, fragment: &str) -> bool {
        self.messages.send_if_modified(|messages| {
            match messages.iter_mut().find(|m| m.id() == id) {
                Some(message) => {
                    message.append_content(fragment);
                    true
                }
                None => false,
            }
        })
    }

    /// Removes every message whose id is listed; other entries keep their order.
    pub(crate) fn remove_all(&self, ids: &[&str]) -> usize {
        let mut removed = 0;
        self.messages.send_if_modified(|messages| {
            let before = messages.len();
            messages.retain(|m| !ids.contains(&m.id()));
            removed = before - messages.len();
            removed > 0
        });
        debug!("Removed {} messages from conversation", removed);
        removed
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::HashMap;
use std::io::{self, Write};

use crate::application::ChatOrchestrator;
use crate::domain::{Attachment, DomainError, Message, Role};

/// Writes assistant text to `out` as it grows, printing only what is new
/// since the previous render.
pub struct AssistantRenderer<W: Write> {
    out: W,
    printed: HashMap<String, usize>,
}

impl<W: Write> AssistantRenderer<W> {
    /// Messages already present in `seen` are treated as printed.
    pub fn new(out: W, seen: &[Message]) -> Self {
        let printed = seen
            .iter()
            .map(|m| (m.id().to_string(), m.content().len()))
            .collect();
        Self { out, printed }
    }

    pub fn render(&mut self, messages: &[Message]) -> io::Result<()> {
        for message in messages.iter().filter(|m| m.role() == Role::Assistant) {
            let done = self.printed.entry(message.id().to_string()).or_insert(0);
            if let Some(fresh) = message.content().get(*done..) {
                if !fresh.is_empty() {
                    self.out.write_all(fresh.as_bytes())?;
                    *done = message.content().len();
                }
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Sends one message and echoes the streamed answer to stdout.
pub async fn send_and_render(
    orchestrator: &ChatOrchestrator,
    text: &str,
    attachments: Vec<Attachment>,
) -> Result<Message, DomainError> {
    let mut updates = orchestrator.store().subscribe();
    let mut renderer = AssistantRenderer::new(io::stdout(), &updates.borrow_and_update());

    let send = orchestrator.send(text, attachments);
    tokio::pin!(send);

    loop {
        tokio::select! {
            result = &mut send => {
                if result.is_ok() {
                    renderer.render(&orchestrator.store().snapshot())?;
                }
                println!();
                return result;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    let result = (&mut send).await;
                    println!();
                    return result;
                }
                let messages = updates.borrow_and_update().clone();
                renderer.render(&messages)?;
            }
        }
    }
}

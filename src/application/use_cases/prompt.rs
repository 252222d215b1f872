//! Turning a chat request into provider messages.
//!
//! Two passes bound the request: every attachment preview is cut to
//! [`MAX_PREVIEW_LENGTH`] characters, and the assembled message list is cut to
//! [`MAX_CONTENT_LENGTH`] bytes of serialized JSON.

use crate::domain::{Attachment, AttachmentKind, PromptMessage};

/// Byte budget for the serialized message list sent to the provider.
pub const MAX_CONTENT_LENGTH: usize = 50_000;
/// Character budget for a single attachment preview.
pub const MAX_PREVIEW_LENGTH: usize = 1_000;
/// Number of prior turns forwarded with each request.
pub const MAX_HISTORY_MESSAGES: usize = 10;
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated due to length...]\n\n";

/// Keeps the head and tail of `content` when it exceeds `max_chars`.
///
/// The result holds exactly `max_chars` original characters (the head gets the
/// extra one when the limit is odd) with [`TRUNCATION_MARKER`] between them.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    let total = content.chars().count();
    if total <= max_chars {
        return content.to_string();
    }

    let head_len = max_chars - max_chars / 2;
    let tail_len = max_chars / 2;

    let head: String = content.chars().take(head_len).collect();
    let tail: String = content.chars().skip(total - tail_len).collect();

    format!("{head}{TRUNCATION_MARKER}{tail}")
}

/// Renders one attachment as a text block appended to its message.
pub fn format_attachment(attachment: &Attachment) -> String {
    match attachment.kind() {
        AttachmentKind::Pdf { extracted_text } => {
            let preview = truncate_content(extracted_text, MAX_PREVIEW_LENGTH);
            format!(
                "[PDF Analysis: {}]\n\nExtracted Text Content:\n{}\n\n",
                attachment.name(),
                preview
            )
        }
        AttachmentKind::Generic {
            raw_bytes,
            mime_type,
        } => {
            let decoded = String::from_utf8_lossy(&raw_bytes);
            let original_len = decoded.chars().count();
            let truncated = truncate_content(&decoded, MAX_PREVIEW_LENGTH);

            let preview = if original_len > MAX_PREVIEW_LENGTH {
                format!(
                    "{truncated}\n\n[Note: File content has been truncated for analysis. Original size: {original_len} characters]"
                )
            } else {
                truncated
            };

            format!(
                "[File Analysis: {} ({})]\n\nContent Preview:\n{}\n\n",
                attachment.name(),
                mime_type,
                preview
            )
        }
    }
}

/// Message text followed by its rendered attachments, if any.
pub fn compose_content(text: &str, attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return text.to_string();
    }

    let blocks: Vec<String> = attachments.iter().map(format_attachment).collect();
    format!("{}\n\n{}", text, blocks.join("\n"))
}

/// Bounds the serialized size of `messages`, whose first element is the system prompt.
///
/// The system prompt always survives. Remaining messages are admitted newest
/// first until the next one would exceed `max_bytes`; the survivors keep
/// their chronological order behind the system prompt.
pub fn truncate_history(messages: Vec<PromptMessage>, max_bytes: usize) -> Vec<PromptMessage> {
    let mut iter = messages.into_iter();
    let Some(system) = iter.next() else {
        return Vec::new();
    };
    let rest: Vec<PromptMessage> = iter.collect();

    let mut total = system.serialized_len();
    let mut kept = Vec::new();

    for message in rest.into_iter().rev() {
        let len = message.serialized_len();
        if total + len > max_bytes {
            break;
        }
        total += len;
        kept.push(message);
    }

    kept.reverse();

    let mut result = Vec::with_capacity(kept.len() + 1);
    result.push(system);
    result.extend(kept);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, PDF_MIME_TYPE};

    #[test]
    fn short_content_is_untouched() {
        assert_eq!(truncate_content("hello", 10), "hello");
        assert_eq!(truncate_content("hello", 5), "hello");
    }

    #[test]
    fn long_content_keeps_head_and_tail() {
        let content: String = (0..3000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let truncated = truncate_content(&content, MAX_PREVIEW_LENGTH);

        assert_eq!(
            truncated.chars().count(),
            MAX_PREVIEW_LENGTH + TRUNCATION_MARKER.chars().count()
        );
        assert!(truncated.starts_with(&content[..500]));
        assert!(truncated.ends_with(&content[content.len() - 500..]));
        assert!(truncated.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn odd_limit_still_yields_exact_length() {
        let content = "abcdefghij";
        let truncated = truncate_content(content, 5);
        assert_eq!(truncated, format!("abc{TRUNCATION_MARKER}ij"));
        assert_eq!(truncated.chars().count(), 5 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let content = "é".repeat(20);
        let truncated = truncate_content(&content, 10);
        assert_eq!(truncated, format!("{}{}{}", "é".repeat(5), TRUNCATION_MARKER, "é".repeat(5)));
    }

    #[test]
    fn pdf_attachment_uses_extracted_text() {
        let attachment = Attachment::from_bytes("paper.pdf", PDF_MIME_TYPE, b"%PDF-binary")
            .with_parsed_content("Abstract: streams");
        let block = format_attachment(&attachment);
        assert_eq!(
            block,
            "[PDF Analysis: paper.pdf]\n\nExtracted Text Content:\nAbstract: streams\n\n"
        );
    }

    #[test]
    fn generic_attachment_decodes_base64() {
        let attachment = Attachment::from_bytes("notes.txt", "text/plain", b"buy milk");
        let block = format_attachment(&attachment);
        assert_eq!(
            block,
            "[File Analysis: notes.txt (text/plain)]\n\nContent Preview:\nbuy milk\n\n"
        );
    }

    #[test]
    fn large_generic_attachment_notes_original_size() {
        let body = "x".repeat(2500);
        let attachment = Attachment::from_bytes("big.csv", "text/csv", body.as_bytes());
        let block = format_attachment(&attachment);
        assert!(block.contains(TRUNCATION_MARKER));
        assert!(block.contains("Original size: 2500 characters]"));
    }

    #[test]
    fn note_follows_any_truncation_even_just_past_the_limit() {
        let body = "y".repeat(MAX_PREVIEW_LENGTH + 1);
        let attachment = Attachment::from_bytes("edge.txt", "text/plain", body.as_bytes());
        let block = format_attachment(&attachment);
        assert!(block.contains(TRUNCATION_MARKER));
        assert!(block.contains("Original size: 1001 characters]"));

        let exact = "z".repeat(MAX_PREVIEW_LENGTH);
        let attachment = Attachment::from_bytes("exact.txt", "text/plain", exact.as_bytes());
        assert!(!format_attachment(&attachment).contains("[Note:"));
    }

    #[test]
    fn compose_content_joins_blocks() {
        let a = Attachment::from_bytes("a.txt", "text/plain", b"A");
        let b = Attachment::from_bytes("b.txt", "text/plain", b"B");
        let content = compose_content("look", &[a.clone(), b.clone()]);
        assert_eq!(
            content,
            format!("look\n\n{}\n{}", format_attachment(&a), format_attachment(&b))
        );
        assert_eq!(compose_content("plain", &[]), "plain");
    }

    fn conversation(turns: usize, size: usize) -> Vec<PromptMessage> {
        let mut messages = vec![PromptMessage::system("be helpful")];
        for i in 0..turns {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            messages.push(PromptMessage::new(role, format!("{i}:{}", "w".repeat(size))));
        }
        messages
    }

    fn total_len(messages: &[PromptMessage]) -> usize {
        messages.iter().map(PromptMessage::serialized_len).sum()
    }

    #[test]
    fn history_within_budget_is_kept_whole() {
        let messages = conversation(4, 10);
        let truncated = truncate_history(messages.clone(), MAX_CONTENT_LENGTH);
        assert_eq!(truncated, messages);
    }

    #[test]
    fn history_over_budget_keeps_system_and_newest() {
        let messages = conversation(40, 100);
        let budget = 1_000;
        let truncated = truncate_history(messages.clone(), budget);

        assert_eq!(truncated[0], messages[0]);
        assert!(total_len(&truncated) <= budget);
        assert!(truncated.len() > 1);
        assert_eq!(truncated.last(), messages.last());

        // Survivors are a chronological suffix of the original conversation.
        let suffix = &messages[messages.len() - (truncated.len() - 1)..];
        assert_eq!(&truncated[1..], suffix);
    }

    #[test]
    fn history_budget_holds_for_many_shapes() {
        for turns in [0usize, 1, 7, 25] {
            for size in [0usize, 13, 240] {
                let messages = conversation(turns, size);
                let floor = messages[0].serialized_len();
                for budget in [floor, floor + 50, floor + 700, 5_000] {
                    let truncated = truncate_history(messages.clone(), budget);
                    assert_eq!(truncated[0].role, Role::System);
                    assert_eq!(truncated[0], messages[0]);
                    assert!(total_len(&truncated) <= budget);
                }
            }
        }
    }

    #[test]
    fn admission_stops_at_first_oversized_message() {
        let mut messages = vec![PromptMessage::system("s")];
        messages.push(PromptMessage::user("old"));
        messages.push(PromptMessage::user("x".repeat(500)));
        messages.push(PromptMessage::user("new"));

        let budget = messages[0].serialized_len() + messages[3].serialized_len() + messages[1].serialized_len();
        let truncated = truncate_history(messages.clone(), budget);

        assert_eq!(truncated, vec![messages[0].clone(), messages[3].clone()]);
    }
}

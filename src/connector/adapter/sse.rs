//! Server-sent event framing shared by the HTTP endpoint, the HTTP chat
//! transport and the upstream completion client.

use std::fmt::Display;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::application::FragmentStream;
use crate::domain::{ContentEvent, DomainError};

pub const DONE_SENTINEL: &str = "[DONE]";
pub const DONE_EVENT: &str = "data: [DONE]\n\n";

/// Encodes one fragment as `data: {"content":...}\n\n`.
pub fn encode_content_event(fragment: &str) -> Result<Bytes, DomainError> {
    let payload = serde_json::to_string(&ContentEvent {
        content: fragment.to_string(),
    })
    .map_err(|e| DomainError::internal(format!("failed to encode event: {e}")))?;
    Ok(Bytes::from(format!("data: {payload}\n\n")))
}

/// Outcome of interpreting one `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Fragment(String),
    Skip,
    Done,
}

/// Line-buffered decoder that yields the payload of every `data:` line.
///
/// Chunks may split lines (and multi-byte characters) anywhere; bytes are
/// held until the terminating newline arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line).into_iter().collect()
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data).to_string())
}

/// Turns a raw event-stream body into a fragment stream.
///
/// `parse` interprets each payload. When `require_done` is set, a body that
/// ends without a [`SseFrame::Done`] yields a transport error.
pub fn decode_event_stream<S, B, E, F>(body: S, parse: F, require_done: bool) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
    F: Fn(&str) -> Result<SseFrame, DomainError> + Send + 'static,
{
    async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = SseDecoder::new();
        let mut finished = false;

        loop {
            let payloads = match body.next().await {
                Some(Ok(chunk)) => decoder.push(chunk.as_ref()),
                Some(Err(e)) => {
                    yield Err(DomainError::transport(format!("stream read failed: {e}")));
                    return;
                }
                None => {
                    finished = true;
                    decoder.finish()
                }
            };

            for payload in payloads {
                match parse(&payload) {
                    Ok(SseFrame::Fragment(text)) => yield Ok(text),
                    Ok(SseFrame::Skip) => {}
                    Ok(SseFrame::Done) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if finished {
                break;
            }
        }

        if require_done {
            yield Err(DomainError::transport("event stream ended before [DONE]"));
        }
    }
    .boxed()
}

/// Parses a payload written by [`encode_content_event`].
pub fn parse_content_event(payload: &str) -> Result<SseFrame, DomainError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(SseFrame::Skip);
    }
    if payload == DONE_SENTINEL {
        return Ok(SseFrame::Done);
    }
    let event: ContentEvent = serde_json::from_str(payload)
        .map_err(|e| DomainError::parse(format!("invalid event payload: {e}")))?;
    Ok(SseFrame::Fragment(event.content))
}

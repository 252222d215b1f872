//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Completion providers (OpenAI streaming client, offline mock)
//! - Chat transport over HTTP and the SSE framing it shares with the server
//! - PDF text extraction
//! - CLI and HTTP entry points (`api`)

pub mod adapter;
pub mod api;

pub use adapter::*;

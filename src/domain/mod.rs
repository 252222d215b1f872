//! # Domain Layer
//!
//! Conversation messages, attachments, wire DTOs and the error taxonomy.
//! This layer is independent of transports, providers and the runtime.

pub mod error;
pub mod models;

pub use error::*;
pub use models::*;

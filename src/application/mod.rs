//! # Application Layer
//!
//! Interfaces for the outside world and the use cases that drive a chat
//! exchange: shaping the prompt, relaying the provider stream and keeping the
//! conversation in sync.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;

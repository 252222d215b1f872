mod chat_transport;
mod completion_provider;
mod pdf_text_extractor;

pub use chat_transport::*;
pub use completion_provider::*;
pub use pdf_text_extractor::*;

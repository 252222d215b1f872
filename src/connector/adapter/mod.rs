mod hayro_pdf_extractor;
mod http_chat_transport;
mod mock_completion;
mod openai_client;
pub mod sse;

pub use hayro_pdf_extractor::*;
pub use http_chat_transport::*;
pub use mock_completion::*;
pub use openai_client::*;

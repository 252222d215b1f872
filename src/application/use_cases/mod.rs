mod chat_orchestrator;
mod completion_gateway;
mod conversation_store;
mod file_upload;
pub mod prompt;

pub use chat_orchestrator::*;
pub use completion_gateway::*;
pub use conversation_store::*;
pub use file_upload::*;
